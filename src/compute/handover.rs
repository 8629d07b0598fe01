//! Handover register: asset identity plus selected properties.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::model::{NormalizedElement, PropertyValue};
use crate::query::ElementFilters;
use crate::store::{ElementQuery, ElementStore, Pagination, Relations};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoverAsset {
    pub guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    /// Omitted when the asset has none of the requested keys.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoverRegister {
    pub asset_count: usize,
    pub assets: Vec<HandoverAsset>,
}

impl HandoverAsset {
    /// Projects an element. Without `keys` every property is kept; with
    /// them, keys the element lacks or holds as null are left out.
    #[must_use]
    pub fn from_element(element: &NormalizedElement, keys: Option<&[String]>) -> Self {
        let properties = match keys {
            None => element.properties.clone(),
            Some(keys) => keys
                .iter()
                .filter_map(|key| {
                    element
                        .properties
                        .get(key)
                        .filter(|value| !value.is_null())
                        .map(|value| (key.clone(), value.clone()))
                })
                .collect(),
        };

        Self {
            guid: element.guid.clone(),
            name: element.name.clone(),
            category: element.category.clone(),
            system: element.system.clone(),
            level: element.level.clone(),
            element_type: element.element_type.clone(),
            properties,
        }
    }
}

#[must_use]
pub fn handover_register(
    elements: &[NormalizedElement],
    property_keys: Option<&[String]>,
) -> HandoverRegister {
    let assets: Vec<HandoverAsset> = elements
        .iter()
        .map(|element| HandoverAsset::from_element(element, property_keys))
        .collect();
    HandoverRegister {
        asset_count: assets.len(),
        assets,
    }
}

/// Register of every matching element of a version, in row order.
pub async fn compute_handover_register(
    store: &dyn ElementStore,
    version_id: &str,
    filters: &ElementFilters,
    property_keys: Option<&[String]>,
) -> Result<HandoverRegister, StoreError> {
    let query = ElementQuery::new(version_id, filters.clone());
    let relations = Relations {
        properties: true,
        geometry: false,
    };
    let elements = store
        .find_elements(&query, Pagination::all(), relations)
        .await?;
    Ok(handover_register(&elements, property_keys))
}
