//! Closed-set listing attributes.
//!
//! Each enum is stored as its string value and parsed from the label the
//! source site shows. Unrecognized labels are a validation failure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $($variant:ident => $value:tt, $label:tt;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Stored string value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            /// Label as shown on the source site.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            /// Parse a site label or a stored value.
            pub fn from_label(raw: &str) -> Result<Self> {
                lookup(Self::ALL, raw, $field, |v| [v.label(), v.as_str()])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Exact match first, then case-insensitive.
fn lookup<T: Copy>(
    all: &[T],
    raw: &str,
    field: &str,
    names: impl Fn(&T) -> [&'static str; 2],
) -> Result<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::validation(format!("field '{field}' is empty")));
    }
    if let Some(found) = all.iter().find(|v| names(v).iter().any(|n| *n == raw)) {
        return Ok(*found);
    }
    let lowered = raw.to_lowercase();
    all.iter()
        .find(|v| names(v).iter().any(|n| n.to_lowercase() == lowered))
        .copied()
        .ok_or_else(|| AppError::validation(format!("unknown value '{raw}' for field '{field}'")))
}

labeled_enum! {
    /// Kind of property.
    PropertyType("property_type") {
        Apartment => "apartment", "Appartamento";
        Penthouse => "penthouse", "Attico";
        Loft => "loft", "Loft";
        SemiDetachedVilla => "semi_detached_villa", "Villa bifamiliare";
        Attic => "attic", "Mansarda";
        DetachedVilla => "detached_villa", "Villa unifamiliare";
        OpenSpace => "open_space", "Open space";
        TerracedHouse => "terraced_house", "Terratetto unifamiliare";
        Townhouse => "townhouse", "Villa a schiera";
        VillaApartment => "villa_apartment", "Appartamento in villa";
        MultiFamilyVilla => "multi_family_villa", "Villa plurifamiliare";
        RusticHouse => "rustic_house", "Rustico";
    }
}

labeled_enum! {
    /// Sale or rent.
    ContractType("contract") {
        Sale => "sale", "Vendita";
        Rent => "rent", "Affitto";
    }
}

labeled_enum! {
    /// Maintenance state of the property.
    PropertyCondition("condition") {
        ExcellentRenovated => "excellent_renovated", "Ottimo / Ristrutturato";
        ToRenovate => "to_renovate", "Da ristrutturare";
        NewUnderConstruction => "new_under_construction", "Nuovo / In costruzione";
        GoodHabitable => "good_habitable", "Buono / Abitabile";
    }
}

labeled_enum! {
    /// Energy efficiency class.
    EnergyClass("energy_class") {
        A4 => "A4", "A4";
        A3 => "A3", "A3";
        A2 => "A2", "A2";
        A1 => "A1", "A1";
        APlus => "A+", "A+";
        A => "A", "A";
        B => "B", "B";
        C => "C", "C";
        D => "D", "D";
        E => "E", "E";
        F => "F", "F";
        G => "G", "G";
    }
}

labeled_enum! {
    /// Ownership share being sold.
    OwnershipType("ownership_type") {
        FullOwnership => "full_ownership", "Intera proprietà";
        BareOwnership => "bare_ownership", "Nuda proprietà";
        SurfaceRight => "surface_right", "Diritto di superficie";
    }
}

labeled_enum! {
    /// Building class.
    PropertyClass("property_class") {
        Luxury => "luxury", "Classe immobile signorile";
        Medium => "medium", "Classe immobile media";
        Economic => "economic", "Classe immobile economica";
        HighEndLuxury => "high_end_luxury", "Immobile di lusso";
    }
}

labeled_enum! {
    /// Whether the property is vacant at sale.
    CurrentAvailability("current_availability") {
        Available => "available", "libero";
        Occupied => "occupied", "a reddito";
    }
}

labeled_enum! {
    Garden("garden") {
        Private => "private", "Giardino privato";
        Shared => "shared", "Giardino comune";
        PrivateAndShared => "private_and_shared", "Giardino privato e comune";
        NoGarden => "none", "Nessun giardino";
    }
}

/// Optional attribute: an unknown label is logged and dropped.
fn lenient<T>(parsed: Result<T>) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}

/// Parts of the composite type text, e.g.
/// `"Appartamento | Intera proprietà | Classe immobile media"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeParts {
    pub property_type: PropertyType,
    pub ownership: Option<OwnershipType>,
    pub class: Option<PropertyClass>,
}

impl TypeParts {
    /// The leading part must name a known property type. With two parts the
    /// second is tried as ownership, then as class; with three or more they
    /// are ownership and class in that order.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw
            .split('|')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let Some(first) = parts.first() else {
            return Err(AppError::validation("field 'property_type' is empty"));
        };
        let property_type = PropertyType::from_label(first)?;

        let (ownership, class) = match parts.as_slice() {
            [_] => (None, None),
            [_, second] => match OwnershipType::from_label(second) {
                Ok(ownership) => (Some(ownership), None),
                Err(_) => (None, lenient(PropertyClass::from_label(second))),
            },
            [_, second, third, rest @ ..] => {
                if !rest.is_empty() {
                    log::warn!("ignoring trailing type parts {rest:?} in '{}'", raw.trim());
                }
                (
                    lenient(OwnershipType::from_label(second)),
                    lenient(PropertyClass::from_label(third)),
                )
            }
            [] => (None, None),
        };

        Ok(Self {
            property_type,
            ownership,
            class,
        })
    }
}

/// Terms carried by the composite contract text, e.g.
/// `"Vendita | libero"` or `"Affitto con riscatto | a reddito"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractTerms {
    pub contract: ContractType,
    pub rent_to_own: bool,
    pub availability: Option<CurrentAvailability>,
}

impl ContractTerms {
    pub fn parse(raw: &str) -> Result<Self> {
        let contract = ContractType::from_contract_text(raw)?;
        let lowered = raw.to_lowercase();
        let availability = CurrentAvailability::ALL
            .iter()
            .find(|a| lowered.contains(a.label()))
            .copied();
        Ok(Self {
            contract,
            rent_to_own: lowered.contains("riscatto"),
            availability,
        })
    }
}

impl ContractType {
    /// Parse the composite contract text, e.g. `"Vendita | libero"`.
    pub fn from_contract_text(raw: &str) -> Result<Self> {
        if let Ok(found) = Self::from_label(raw) {
            return Ok(found);
        }
        let lowered = raw.to_lowercase();
        Self::ALL
            .iter()
            .find(|c| lowered.contains(&c.label().to_lowercase()))
            .copied()
            .ok_or_else(|| {
                AppError::validation(format!("unknown value '{}' for field 'contract'", raw.trim()))
            })
    }
}

impl EnergyClass {
    /// Parse the energy text, which may carry a trailing consumption figure
    /// (`"G 175,00 kWh/m² anno"`).
    pub fn from_energy_text(raw: &str) -> Result<Self> {
        let token = raw.split_whitespace().next().unwrap_or("");
        Self::from_label(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_property_type_labels() {
        assert_eq!(
            PropertyType::from_label("Appartamento").unwrap(),
            PropertyType::Apartment
        );
        assert_eq!(
            PropertyType::from_label("villa a schiera").unwrap(),
            PropertyType::Townhouse
        );
        assert_eq!(
            PropertyType::from_label("apartment").unwrap(),
            PropertyType::Apartment
        );
    }

    #[test]
    fn test_unknown_label_is_validation_error() {
        let err = PropertyType::from_label("Castello").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("property_type"));
    }

    #[test]
    fn test_composite_type_text() {
        let parsed =
            TypeParts::parse("Attico | Intera proprietà | Classe immobile signorile").unwrap();
        assert_eq!(parsed.property_type, PropertyType::Penthouse);
        assert_eq!(parsed.ownership, Some(OwnershipType::FullOwnership));
        assert_eq!(parsed.class, Some(PropertyClass::Luxury));
        assert!(TypeParts::parse(" | ").is_err());
    }

    #[test]
    fn test_two_part_type_text_falls_back_to_class() {
        let parsed = TypeParts::parse("Villa unifamiliare | Immobile di lusso").unwrap();
        assert_eq!(parsed.property_type, PropertyType::DetachedVilla);
        assert_eq!(parsed.ownership, None);
        assert_eq!(parsed.class, Some(PropertyClass::HighEndLuxury));

        let parsed = TypeParts::parse("Loft | Nuda proprietà").unwrap();
        assert_eq!(parsed.ownership, Some(OwnershipType::BareOwnership));
        assert_eq!(parsed.class, None);
    }

    #[test]
    fn test_unknown_type_qualifiers_are_dropped() {
        let parsed = TypeParts::parse("Appartamento | Multiproprietà | Classe ignota").unwrap();
        assert_eq!(parsed.property_type, PropertyType::Apartment);
        assert_eq!(parsed.ownership, None);
        assert_eq!(parsed.class, None);

        let err = TypeParts::parse("Castello | Intera proprietà").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_contract_terms() {
        let terms = ContractTerms::parse("Vendita | libero").unwrap();
        assert_eq!(terms.contract, ContractType::Sale);
        assert!(!terms.rent_to_own);
        assert_eq!(terms.availability, Some(CurrentAvailability::Available));

        let terms = ContractTerms::parse("Affitto con riscatto | a reddito").unwrap();
        assert_eq!(terms.contract, ContractType::Rent);
        assert!(terms.rent_to_own);
        assert_eq!(terms.availability, Some(CurrentAvailability::Occupied));

        assert_eq!(ContractTerms::parse("Vendita").unwrap().availability, None);
        assert!(ContractTerms::parse("Asta").is_err());
    }

    #[test]
    fn test_contract_text() {
        assert_eq!(
            ContractType::from_contract_text("Vendita | libero").unwrap(),
            ContractType::Sale
        );
        assert_eq!(
            ContractType::from_contract_text("rent").unwrap(),
            ContractType::Rent
        );
        assert!(ContractType::from_contract_text("Asta").is_err());
    }

    #[test]
    fn test_energy_text() {
        assert_eq!(
            EnergyClass::from_energy_text("G 175,00 kWh/m² anno").unwrap(),
            EnergyClass::G
        );
        assert_eq!(EnergyClass::from_energy_text("A+").unwrap(), EnergyClass::APlus);
    }

    #[test]
    fn test_serialized_as_string_values() {
        let json = serde_json::to_string(&PropertyCondition::GoodHabitable).unwrap();
        assert_eq!(json, "\"good_habitable\"");
        let json = serde_json::to_string(&EnergyClass::APlus).unwrap();
        assert_eq!(json, "\"A+\"");
    }
}
