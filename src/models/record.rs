//! Normalized listing records derived from validated details.
//!
//! A [`ListingRecord`] flattens a [`ListingDetails`] into analysis-ready
//! columns: price per square metre, zone, and one boolean per amenity found
//! in the free-text feature list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    ContractType, CurrentAvailability, EnergyClass, Garden, ListingDetails, ListingId,
    OwnershipType, PropertyClass, PropertyCondition, PropertyType, Source,
};

/// Amenities recognized in a listing's feature labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Amenities {
    pub has_balcony: bool,
    pub has_terrace: bool,
    pub has_elevator: bool,
    pub has_cellar: bool,
    pub garden: Option<Garden>,
    pub has_built_in_wardrobe: bool,
    pub has_fireplace: bool,
    pub has_tennis_court: bool,
    pub has_electric_gate: bool,
    pub has_kitchen: bool,
    pub has_fiber_optic: bool,
    pub has_hot_tub: bool,
    pub has_alarm_system: bool,
    pub has_attic: bool,
    pub has_pool: bool,
    pub has_armored_door: bool,
    pub has_reception: bool,
    pub has_tavern: bool,
    pub has_video_intercom: bool,
    /// Exposure text as shown, e.g. `"Esposizione doppia"`.
    pub sun_exposure: Option<String>,
}

impl Amenities {
    /// Collect amenities from feature labels. Unknown labels are ignored.
    pub fn from_features<S: AsRef<str>>(features: &[S]) -> Self {
        let mut amenities = Self::default();
        for feature in features {
            amenities.apply(feature.as_ref());
        }
        amenities
    }

    fn apply(&mut self, feature: &str) {
        let feature = feature.trim();
        let label = feature.to_lowercase();
        match label.as_str() {
            "balcone" | "balconi" => self.has_balcony = true,
            "terrazzo" | "terrazza" => self.has_terrace = true,
            "ascensore" => self.has_elevator = true,
            "cantina" => self.has_cellar = true,
            "armadio a muro" => self.has_built_in_wardrobe = true,
            "caminetto" => self.has_fireplace = true,
            "campo da tennis" => self.has_tennis_court = true,
            "cancello elettrico" => self.has_electric_gate = true,
            "cucina" => self.has_kitchen = true,
            "fibra ottica" => self.has_fiber_optic = true,
            "idromassaggio" => self.has_hot_tub = true,
            "impianto di allarme" => self.has_alarm_system = true,
            "mansarda" => self.has_attic = true,
            "piscina" => self.has_pool = true,
            "porta blindata" => self.has_armored_door = true,
            "reception" => self.has_reception = true,
            "taverna" => self.has_tavern = true,
            "videocitofono" => self.has_video_intercom = true,
            _ => {}
        }
        if let Some(garden) = Garden::ALL
            .iter()
            .find(|g| g.label().to_lowercase() == label)
        {
            self.garden = Some(*garden);
        }
        if label.contains("esposizione") {
            self.sun_exposure = Some(feature.to_string());
        }
    }
}

/// Analysis-ready view of one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: ListingId,
    pub source: Source,
    pub title: String,
    pub url: String,
    pub fetch_date: DateTime<Utc>,
    /// When this record was derived.
    pub etl_date: DateTime<Utc>,

    pub price_eur: f64,
    pub price_sqm: Option<f64>,

    pub property_type: PropertyType,
    pub ownership_type: Option<OwnershipType>,
    pub property_class: Option<PropertyClass>,
    pub contract_type: ContractType,
    pub is_rent_to_own_available: bool,
    pub current_availability: Option<CurrentAvailability>,
    pub condition: Option<PropertyCondition>,
    pub is_luxury: bool,
    pub energy_class: Option<EnergyClass>,

    pub surface_sqm: Option<f64>,
    pub rooms: Option<u32>,
    pub floor: Option<String>,
    pub total_floors: Option<u32>,
    pub bathrooms: Option<u32>,
    pub bedrooms: Option<u32>,
    pub amenities: Amenities,

    pub country: String,
    pub city: String,
    pub zone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub description_title: Option<String>,
    pub description: String,
}

impl ListingRecord {
    /// Derive the record for `listing`, stamped with `etl_date`.
    pub fn from_details(listing: &ListingDetails, etl_date: DateTime<Utc>) -> Self {
        let location = &listing.location;
        Self {
            id: listing.id.clone(),
            source: listing.id.source(),
            title: listing.title.clone(),
            url: listing.url.clone(),
            fetch_date: listing.fetch_date,
            etl_date,
            price_eur: listing.price_eur,
            price_sqm: price_per_sqm(listing.price_eur, listing.surface_sqm),
            property_type: listing.property_type,
            ownership_type: listing.ownership_type,
            property_class: listing.property_class,
            contract_type: listing.contract,
            is_rent_to_own_available: listing.rent_to_own,
            current_availability: listing.availability,
            condition: listing.condition,
            is_luxury: listing.is_luxury,
            energy_class: listing.energy_class,
            surface_sqm: listing.surface_sqm,
            rooms: listing.rooms,
            floor: listing.floor.clone(),
            total_floors: listing.total_floors,
            bathrooms: listing.bathrooms,
            bedrooms: listing.bedrooms,
            amenities: Amenities::from_features(listing.features.as_slice()),
            country: if location.country.trim().is_empty() {
                "IT".to_string()
            } else {
                location.country.clone()
            },
            city: location.city.clone(),
            zone: location
                .microzone
                .clone()
                .or_else(|| location.macrozone.clone()),
            latitude: location.latitude,
            longitude: location.longitude,
            description_title: listing.description_title.clone(),
            description: listing.description.clone(),
        }
    }
}

/// Asking price per square metre, rounded to cents.
fn price_per_sqm(price_eur: f64, surface_sqm: Option<f64>) -> Option<f64> {
    let surface = surface_sqm.filter(|s| *s > 0.0)?;
    Some((price_eur / surface * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_details;

    #[test]
    fn test_record_carries_normalized_columns() {
        let listing = sample_details();
        let etl_date = listing.fetch_date + chrono::Duration::minutes(5);
        let record = ListingRecord::from_details(&listing, etl_date);

        assert_eq!(record.id, listing.id);
        assert_eq!(record.source, Source::Immobiliare);
        assert_eq!(record.etl_date, etl_date);
        assert_eq!(record.price_sqm, Some(5294.12));
        assert_eq!(record.ownership_type, Some(OwnershipType::FullOwnership));
        assert_eq!(record.contract_type, ContractType::Sale);
        assert_eq!(record.current_availability, Some(CurrentAvailability::Available));
        assert!(!record.is_rent_to_own_available);
        assert_eq!(record.zone.as_deref(), Some("Tortona"));
        assert!(record.amenities.has_armored_door);
        assert!(!record.amenities.has_balcony);
    }

    #[test]
    fn test_price_per_sqm_needs_positive_surface() {
        assert_eq!(price_per_sqm(100_000.0, Some(50.0)), Some(2000.0));
        assert_eq!(price_per_sqm(100_000.0, Some(0.0)), None);
        assert_eq!(price_per_sqm(100_000.0, None), None);
    }

    #[test]
    fn test_amenities_from_feature_labels() {
        let amenities = Amenities::from_features(&[
            "Balcone",
            "cantina",
            "Fibra ottica",
            "Giardino privato e comune",
            "Esposizione doppia",
            "Infissi esterni in doppio vetro / PVC",
        ]);
        assert!(amenities.has_balcony);
        assert!(amenities.has_cellar);
        assert!(amenities.has_fiber_optic);
        assert_eq!(amenities.garden, Some(Garden::PrivateAndShared));
        assert_eq!(amenities.sun_exposure.as_deref(), Some("Esposizione doppia"));
        assert!(!amenities.has_pool);
    }

    #[test]
    fn test_zone_falls_back_to_macrozone() {
        let mut listing = sample_details();
        listing.location.microzone = None;
        listing.surface_sqm = None;
        let record = ListingRecord::from_details(&listing, Utc::now());
        assert_eq!(record.zone.as_deref(), Some("Navigli"));
        assert_eq!(record.price_sqm, None);
    }
}
