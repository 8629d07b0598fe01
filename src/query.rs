//! Filtered, paginated retrieval of persisted elements.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::NormalizedElement;
use crate::store::{ElementQuery, ElementStore, Pagination, Relations};

pub const DEFAULT_LIMIT: usize = 200;

/// Element filters. Each list is an inclusion set; an empty list does not
/// constrain. `search` is a case-insensitive substring over name, guid,
/// category and system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementFilters {
    pub categories: Vec<String>,
    pub systems: Vec<String>,
    pub levels: Vec<String>,
    pub types: Vec<String>,
    pub search: Option<String>,
}

impl ElementFilters {
    #[must_use]
    pub fn matches(&self, element: &NormalizedElement) -> bool {
        included(&self.categories, element.category.as_deref())
            && included(&self.systems, element.system.as_deref())
            && included(&self.levels, element.level.as_deref())
            && included(&self.types, element.element_type.as_deref())
            && self.search_matches(element)
    }

    fn search_matches(&self, element: &NormalizedElement) -> bool {
        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return true;
        };
        let needle = needle.to_lowercase();

        [
            element.name.as_deref(),
            Some(element.guid.as_str()),
            element.category.as_deref(),
            element.system.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
    }
}

fn included(allowed: &[String], value: Option<&str>) -> bool {
    allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub limit: usize,
    pub offset: usize,
    pub include_properties: bool,
    pub include_geometry: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            include_properties: false,
            include_geometry: true,
        }
    }
}

/// One page of results. `total` counts every match, not just this page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementPage {
    pub elements: Vec<NormalizedElement>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

pub async fn query_elements(
    store: &dyn ElementStore,
    version_id: &str,
    filters: &ElementFilters,
    options: QueryOptions,
) -> Result<ElementPage, StoreError> {
    let query = ElementQuery::new(version_id, filters.clone());
    let total = store.count_elements(&query).await?;
    let elements = store
        .find_elements(
            &query,
            Pagination::page(options.limit, options.offset),
            Relations {
                properties: options.include_properties,
                geometry: options.include_geometry,
            },
        )
        .await?;

    Ok(ElementPage {
        elements,
        total,
        limit: options.limit,
        offset: options.offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeometrySummary, PropertyEntry, PropertyValue};
    use crate::store::InMemoryElementStore;
    use pretty_assertions::assert_eq;

    fn element(guid: &str, name: &str, category: &str, system: Option<&str>) -> NormalizedElement {
        let mut element = NormalizedElement::new(guid);
        element.name = Some(name.to_string());
        element.category = Some(category.to_string());
        element.system = system.map(str::to_string);
        element
    }

    #[test]
    fn lists_are_inclusion_sets() {
        let filters = ElementFilters {
            categories: vec!["Walls".into(), "Doors".into()],
            ..ElementFilters::default()
        };
        assert!(filters.matches(&element("a", "W1", "Walls", None)));
        assert!(!filters.matches(&element("b", "S1", "Slabs", None)));

        let by_system = ElementFilters {
            systems: vec!["HVAC".into()],
            ..ElementFilters::default()
        };
        assert!(!by_system.matches(&element("c", "D1", "Ducts", None)));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let filters = ElementFilters {
            search: Some("supply".into()),
            ..ElementFilters::default()
        };
        assert!(filters.matches(&element("a", "Duct", "Ducts", Some("Supply Air"))));
        assert!(!filters.matches(&element("b", "Duct", "Ducts", Some("Return Air"))));

        let by_guid = ElementFilters {
            search: Some("2XQ$".into()),
            ..ElementFilters::default()
        };
        assert!(by_guid.matches(&element("2xq$n5", "Wall", "Walls", None)));
    }

    #[test]
    fn blank_search_matches_everything() {
        let filters = ElementFilters {
            search: Some("  ".into()),
            ..ElementFilters::default()
        };
        assert!(filters.matches(&element("a", "x", "y", None)));
    }

    #[tokio::test]
    async fn total_ignores_the_page_window() {
        let store = InMemoryElementStore::new();
        let mut rows: Vec<_> = (0..5)
            .map(|i| element(&format!("G{i}"), "Beam", "Structural", None))
            .collect();
        rows[0].push_property(PropertyEntry {
            group: None,
            name: "grade".into(),
            value: PropertyValue::Text("S355".into()),
            unit: None,
            raw_value: None,
        });
        rows[0].geometry = Some(GeometrySummary {
            length: Some(4.5),
            ..GeometrySummary::default()
        });
        store.save_elements("v1", &rows).await.unwrap();

        let page = query_elements(
            &store,
            "v1",
            &ElementFilters::default(),
            QueryOptions {
                limit: 2,
                ..QueryOptions::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.elements.len(), 2);
        assert_eq!(page.limit, 2);
        // Properties are opt-in, geometry opt-out.
        assert!(page.elements[0].properties.is_empty());
        assert!(page.elements[0].geometry.is_some());
    }
}
