//! Property-set flattening and quantity accumulation.

use super::engine::PropertySetRecord;
use super::value::{probe, ValueField};
use crate::model::{PropertyEntry, PropertyValue, QuantityTotals};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedProperties {
    pub entries: Vec<PropertyEntry>,
    pub quantities: QuantityTotals,
    /// Unit of the first summed quantity that named one.
    pub quantity_unit: Option<String>,
}

/// Emits one entry per named item, grouped by its set's name.
///
/// Length, area and volume quantities are summed over every set, so the
/// same quantity in two sets counts twice.
#[must_use]
pub fn extract_properties(sets: &[PropertySetRecord]) -> ExtractedProperties {
    let mut extracted = ExtractedProperties::default();

    for set in sets {
        for item in &set.items {
            let Some(name) = item.name.as_deref().filter(|n| !n.is_empty()) else {
                continue;
            };

            let found = probe(&item.fields);
            if let Some(field) = found {
                if let Some(n) = field.value.as_number() {
                    let summed = match field.field {
                        ValueField::LengthValue => {
                            extracted.quantities.add_length(n);
                            true
                        }
                        ValueField::AreaValue => {
                            extracted.quantities.add_area(n);
                            true
                        }
                        ValueField::VolumeValue => {
                            extracted.quantities.add_volume(n);
                            true
                        }
                        _ => false,
                    };
                    if summed && extracted.quantity_unit.is_none() {
                        extracted.quantity_unit.clone_from(&item.unit);
                    }
                }
            }

            extracted.entries.push(PropertyEntry {
                group: set.name.clone(),
                name: name.to_string(),
                value: found.map_or(PropertyValue::Null, |f| f.value.to_property_value()),
                unit: item.unit.clone(),
                raw_value: found.map(|f| f.raw.clone()),
            });
        }
    }

    extracted
}
