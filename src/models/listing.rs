//! Listing records: the scraper's raw candidate and the validated details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{
    ContractTerms, ContractType, CurrentAvailability, EnergyClass, ListingId, OwnershipType,
    PropertyClass, PropertyCondition, PropertyType, TypeParts,
};
use crate::utils::url::canonical_listing_url;

/// Candidate listing as extracted from a page, before schema checks.
///
/// Every field is kept as the text the source provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub source: String,
    pub source_id: String,
    pub title: String,
    pub url: String,
    pub formatted_price: String,
    pub price: Option<f64>,
    pub surface: Option<String>,
    pub rooms: Option<String>,
    pub bathrooms: Option<String>,
    pub bedrooms: Option<String>,
    pub floor: Option<String>,
    pub total_floors: Option<String>,
    pub property_type: String,
    pub contract: String,
    pub condition: Option<String>,
    pub energy_class: Option<String>,
    pub is_luxury: bool,
    pub location: Location,
    pub description_title: Option<String>,
    pub description: String,
    pub features: Vec<String>,
}

/// Where a property is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub macrozone: Option<String>,
    #[serde(default)]
    pub microzone: Option<String>,
    pub country: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A validated real-estate listing.
///
/// Values are never mutated in place; the `with_*` helpers return a new record.
/// Fields stay public for reading and for deserializing stored rows, so a
/// value may not satisfy [`validate`](Self::validate).
/// [`persist`](crate::storage::persist) re-validates before any write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub id: ListingId,
    pub title: String,
    pub url: String,
    pub fetch_date: DateTime<Utc>,

    pub price_eur: f64,
    pub formatted_price: String,

    pub property_type: PropertyType,
    #[serde(default)]
    pub ownership_type: Option<OwnershipType>,
    #[serde(default)]
    pub property_class: Option<PropertyClass>,
    pub contract: ContractType,
    #[serde(default)]
    pub rent_to_own: bool,
    #[serde(default)]
    pub availability: Option<CurrentAvailability>,
    #[serde(default)]
    pub condition: Option<PropertyCondition>,
    #[serde(default)]
    pub energy_class: Option<EnergyClass>,
    #[serde(default)]
    pub is_luxury: bool,

    #[serde(default)]
    pub surface_sqm: Option<f64>,
    #[serde(default)]
    pub rooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<u32>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub total_floors: Option<u32>,

    pub location: Location,

    #[serde(default)]
    pub description_title: Option<String>,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Attributes compared for change detection. Excludes `fetch_date`.
#[derive(Serialize)]
struct Attributes<'a> {
    id: &'a ListingId,
    title: &'a str,
    url: &'a str,
    price_eur: f64,
    formatted_price: &'a str,
    property_type: PropertyType,
    ownership_type: Option<OwnershipType>,
    property_class: Option<PropertyClass>,
    contract: ContractType,
    rent_to_own: bool,
    availability: Option<CurrentAvailability>,
    condition: Option<PropertyCondition>,
    energy_class: Option<EnergyClass>,
    is_luxury: bool,
    surface_sqm: Option<f64>,
    rooms: Option<u32>,
    bathrooms: Option<u32>,
    bedrooms: Option<u32>,
    floor: Option<&'a str>,
    total_floors: Option<u32>,
    location: &'a Location,
    description_title: Option<&'a str>,
    description: &'a str,
    features: &'a [String],
}

impl ListingDetails {
    /// Check the record schema.
    pub fn validate(&self) -> Result<()> {
        self.id.validate()?;
        if self.title.trim().is_empty() {
            return Err(AppError::validation(format!("{}: title is empty", self.id)));
        }
        if self.location.city.trim().is_empty() {
            return Err(AppError::validation(format!("{}: city is empty", self.id)));
        }
        if !self.price_eur.is_finite() || self.price_eur < 0.0 {
            return Err(AppError::validation(format!(
                "{}: price {} is not a non-negative amount",
                self.id, self.price_eur
            )));
        }
        if let Some(surface) = self.surface_sqm {
            if !surface.is_finite() || surface < 0.0 {
                return Err(AppError::validation(format!(
                    "{}: surface {} is not a non-negative area",
                    self.id, surface
                )));
            }
        }
        Ok(())
    }

    /// SHA-256 over every attribute except the fetch timestamp.
    pub fn fingerprint(&self) -> String {
        let attributes = Attributes {
            id: &self.id,
            title: &self.title,
            url: &self.url,
            price_eur: self.price_eur,
            formatted_price: &self.formatted_price,
            property_type: self.property_type,
            ownership_type: self.ownership_type,
            property_class: self.property_class,
            contract: self.contract,
            rent_to_own: self.rent_to_own,
            availability: self.availability,
            condition: self.condition,
            energy_class: self.energy_class,
            is_luxury: self.is_luxury,
            surface_sqm: self.surface_sqm,
            rooms: self.rooms,
            bathrooms: self.bathrooms,
            bedrooms: self.bedrooms,
            floor: self.floor.as_deref(),
            total_floors: self.total_floors,
            location: &self.location,
            description_title: self.description_title.as_deref(),
            description: &self.description,
            features: &self.features,
        };
        // Serializing plain data into a Vec cannot fail.
        let bytes = serde_json::to_vec(&attributes).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Whether `other` describes the same listing with identical attributes.
    pub fn same_attributes(&self, other: &ListingDetails) -> bool {
        self.id == other.id && self.fingerprint() == other.fingerprint()
    }

    /// Copy of this record with a new asking price.
    pub fn with_price(self, price_eur: f64, formatted_price: impl Into<String>) -> Self {
        Self {
            price_eur,
            formatted_price: formatted_price.into(),
            ..self
        }
    }

    /// Copy of this record stamped with a new fetch time.
    pub fn with_fetch_date(self, fetch_date: DateTime<Utc>) -> Self {
        Self { fetch_date, ..self }
    }
}

impl TryFrom<RawListing> for ListingDetails {
    type Error = AppError;

    fn try_from(raw: RawListing) -> Result<Self> {
        let id = ListingId::derive(&raw.source, &raw.source_id)?;
        let price_eur = raw
            .price
            .ok_or_else(|| AppError::validation(format!("{id}: price is missing")))?;
        let kind = TypeParts::parse(&raw.property_type)?;
        let terms = ContractTerms::parse(&raw.contract)?;

        let details = ListingDetails {
            title: normalize_text(&raw.title),
            url: canonical_listing_url(&raw.url).unwrap_or_else(|| raw.url.trim().to_string()),
            fetch_date: Utc::now(),
            price_eur,
            formatted_price: normalize_text(&raw.formatted_price),
            property_type: kind.property_type,
            ownership_type: kind.ownership,
            property_class: kind.class,
            contract: terms.contract,
            rent_to_own: terms.rent_to_own,
            availability: terms.availability,
            condition: optional(raw.condition.as_deref())
                .map(PropertyCondition::from_label)
                .transpose()?,
            energy_class: optional(raw.energy_class.as_deref())
                .map(EnergyClass::from_energy_text)
                .transpose()?,
            is_luxury: raw.is_luxury,
            surface_sqm: parse_number(raw.surface.as_deref(), "surface")?,
            rooms: parse_count(raw.rooms.as_deref(), "rooms")?,
            bathrooms: parse_count(raw.bathrooms.as_deref(), "bathrooms")?,
            bedrooms: parse_count(raw.bedrooms.as_deref(), "bedrooms")?,
            floor: optional(raw.floor.as_deref()).map(str::to_string),
            total_floors: parse_count(raw.total_floors.as_deref(), "total_floors")?,
            location: raw.location,
            description_title: optional(raw.description_title.as_deref()).map(normalize_text),
            description: normalize_text(&raw.description),
            features: raw
                .features
                .iter()
                .map(|f| normalize_text(f))
                .filter(|f| !f.is_empty())
                .collect(),
            id,
        };
        details.validate()?;
        Ok(details)
    }
}

/// Collapse whitespace runs and strip control characters.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.chars().filter(|c| !c.is_control()).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse the leading number of a text such as `"85 m²"` or `"1.250,5 m²"`.
fn parse_number(value: Option<&str>, field: &str) -> Result<Option<f64>> {
    let Some(text) = optional(value) else {
        return Ok(None);
    };
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    // Italian formatting: '.' groups thousands, ',' marks decimals.
    let normalized = digits.replace('.', "").replace(',', ".");
    normalized
        .parse::<f64>()
        .map(Some)
        .map_err(|_| AppError::validation(format!("field '{field}' is not numeric: '{text}'")))
}

/// Parse a count such as `"3"` or `"5+"`.
fn parse_count(value: Option<&str>, field: &str) -> Result<Option<u32>> {
    let Some(text) = optional(value) else {
        return Ok(None);
    };
    let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits
        .parse::<u32>()
        .map(Some)
        .map_err(|_| AppError::validation(format!("field '{field}' is not a count: '{text}'")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;

    pub(crate) fn sample_raw() -> RawListing {
        RawListing {
            source: "immobiliare".to_string(),
            source_id: "122361988".to_string(),
            title: "Trilocale via Savona,  Milano".to_string(),
            url: "https://www.immobiliare.it/annunci/122361988/".to_string(),
            formatted_price: "€ 450.000".to_string(),
            price: Some(450_000.0),
            surface: Some("85 m²".to_string()),
            rooms: Some("3".to_string()),
            bathrooms: Some("2".to_string()),
            bedrooms: Some("2".to_string()),
            floor: Some("3".to_string()),
            total_floors: Some("6".to_string()),
            property_type: "Appartamento | Intera proprietà".to_string(),
            contract: "Vendita | libero".to_string(),
            condition: Some("Buono / Abitabile".to_string()),
            energy_class: Some("D".to_string()),
            is_luxury: false,
            location: Location {
                city: "Milano".to_string(),
                province: Some("MI".to_string()),
                region: Some("Lombardia".to_string()),
                macrozone: Some("Navigli".to_string()),
                microzone: Some("Tortona".to_string()),
                country: "IT".to_string(),
                latitude: Some(45.4536),
                longitude: Some(9.1652),
            },
            description_title: Some("Luminoso trilocale".to_string()),
            description: "Ampio  trilocale\n con balcone.".to_string(),
            features: vec!["Porta blindata".to_string(), " ".to_string()],
        }
    }

    pub(crate) fn sample_details() -> ListingDetails {
        ListingDetails::try_from(sample_raw()).unwrap()
    }

    #[test]
    fn test_try_from_maps_fields() {
        let details = sample_details();
        assert_eq!(details.id.key(), "immobiliare:122361988");
        assert_eq!(details.title, "Trilocale via Savona, Milano");
        assert_eq!(details.property_type, PropertyType::Apartment);
        assert_eq!(details.ownership_type, Some(OwnershipType::FullOwnership));
        assert_eq!(details.property_class, None);
        assert_eq!(details.contract, ContractType::Sale);
        assert!(!details.rent_to_own);
        assert_eq!(details.availability, Some(CurrentAvailability::Available));
        assert_eq!(details.condition, Some(PropertyCondition::GoodHabitable));
        assert_eq!(details.energy_class, Some(EnergyClass::D));
        assert_eq!(details.surface_sqm, Some(85.0));
        assert_eq!(details.rooms, Some(3));
        assert_eq!(details.description, "Ampio trilocale con balcone.");
        assert_eq!(details.features, vec!["Porta blindata".to_string()]);
    }

    #[test]
    fn test_unknown_property_type_fails_validation() {
        let raw = RawListing {
            property_type: "Castello".to_string(),
            ..sample_raw()
        };
        let err = ListingDetails::try_from(raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_missing_price_fails_validation() {
        let raw = RawListing {
            price: None,
            ..sample_raw()
        };
        assert!(ListingDetails::try_from(raw).is_err());
    }

    #[test]
    fn test_empty_key_fails_validation() {
        let raw = RawListing {
            source_id: String::new(),
            ..sample_raw()
        };
        let err = ListingDetails::try_from(raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_fingerprint_ignores_fetch_date() {
        let a = sample_details();
        let b = a
            .clone()
            .with_fetch_date(a.fetch_date + chrono::Duration::days(1));
        assert!(a.same_attributes(&b));

        let c = a.clone().with_price(430_000.0, "€ 430.000");
        assert!(!a.same_attributes(&c));
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_url_variants_share_one_canonical_form() {
        let canonical = sample_details();
        for url in [
            "https://www.immobiliare.it/annunci/122361988",
            "https://www.immobiliare.it/annunci/122361988/?foto=2#gallery",
            "  https://www.immobiliare.it/annunci/122361988/  ",
        ] {
            let raw = RawListing {
                url: url.to_string(),
                ..sample_raw()
            };
            let details = ListingDetails::try_from(raw).unwrap();
            assert_eq!(details.url, "https://www.immobiliare.it/annunci/122361988/");
            assert!(details.same_attributes(&canonical), "{url}");
        }
    }

    #[test]
    fn test_non_listing_url_is_kept_trimmed() {
        let raw = RawListing {
            url: " https://example.com/page ".to_string(),
            ..sample_raw()
        };
        let details = ListingDetails::try_from(raw).unwrap();
        assert_eq!(details.url, "https://example.com/page");
    }

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number(Some("85 m²"), "s").unwrap(), Some(85.0));
        assert_eq!(parse_number(Some("1.250,5 m²"), "s").unwrap(), Some(1250.5));
        assert_eq!(parse_number(Some("  "), "s").unwrap(), None);
        assert!(parse_number(Some("n/d"), "s").is_err());
    }

    #[test]
    fn test_parse_count_formats() {
        assert_eq!(parse_count(Some("5+"), "rooms").unwrap(), Some(5));
        assert_eq!(parse_count(None, "rooms").unwrap(), None);
        assert!(parse_count(Some("tanti"), "rooms").is_err());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  a \n\t b\u{7}c "), "a bc");
    }
}
