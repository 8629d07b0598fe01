//! In-memory stores for the CLI and tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{ElementQuery, ElementStore, ObjectStore, Pagination, Relations};
use crate::error::StoreError;
use crate::model::NormalizedElement;

/// Rows per version, in insertion order; the position is the row id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryElementStore {
    versions: Arc<RwLock<HashMap<String, Vec<NormalizedElement>>>>,
}

impl InMemoryElementStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ElementStore for InMemoryElementStore {
    async fn save_elements(
        &self,
        version_id: &str,
        elements: &[NormalizedElement],
    ) -> Result<(), StoreError> {
        self.versions
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(version_id.to_string(), elements.to_vec());
        Ok(())
    }

    async fn find_elements(
        &self,
        query: &ElementQuery,
        pagination: Pagination,
        relations: Relations,
    ) -> Result<Vec<NormalizedElement>, StoreError> {
        let versions = self.versions.read().map_err(|_| StoreError::Poisoned)?;
        let Some(rows) = versions.get(&query.version_id) else {
            return Ok(Vec::new());
        };

        let matching = rows
            .iter()
            .filter(|element| query.filters.matches(element))
            .skip(pagination.offset);
        let page: Vec<&NormalizedElement> = match pagination.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        };

        Ok(page
            .into_iter()
            .map(|element| relations.project(element.clone()))
            .collect())
    }

    async fn count_elements(&self, query: &ElementQuery) -> Result<usize, StoreError> {
        let versions = self.versions.read().map_err(|_| StoreError::Poisoned)?;
        Ok(versions.get(&query.version_id).map_or(0, |rows| {
            rows.iter()
                .filter(|element| query.filters.matches(element))
                .count()
        }))
    }
}

/// Content-addressed blobs: the reference is the SHA-256 of the bytes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload_raw_file(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let object_ref = hex::encode(Sha256::digest(bytes));
        self.objects
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .entry(object_ref.clone())
            .or_insert_with(|| bytes.to_vec());
        Ok(object_ref)
    }

    async fn get_file(&self, object_ref: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .get(object_ref)
            .cloned()
            .ok_or_else(|| StoreError::UnknownObject {
                object_ref: object_ref.to_string(),
            })
    }

    async fn head_file(&self, object_ref: &str) -> Result<bool, StoreError> {
        Ok(self
            .objects
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .contains_key(object_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeometrySummary, PropertyEntry, PropertyValue};
    use crate::query::ElementFilters;
    use pretty_assertions::assert_eq;

    fn element(guid: &str, category: &str) -> NormalizedElement {
        let mut element = NormalizedElement::new(guid);
        element.category = Some(category.to_string());
        element.push_property(PropertyEntry {
            group: None,
            name: "mark".to_string(),
            value: PropertyValue::Text(guid.to_lowercase()),
            unit: None,
            raw_value: None,
        });
        element.geometry = Some(GeometrySummary {
            length: Some(1.0),
            ..GeometrySummary::default()
        });
        element
    }

    async fn seeded() -> InMemoryElementStore {
        let store = InMemoryElementStore::new();
        let rows: Vec<_> = (1..=5)
            .map(|i| element(&format!("G{i}"), if i % 2 == 0 { "Doors" } else { "Walls" }))
            .collect();
        store.save_elements("v1", &rows).await.unwrap();
        store
    }

    #[tokio::test]
    async fn pages_keep_insertion_order() {
        let store = seeded().await;
        let query = ElementQuery::new("v1", ElementFilters::default());
        let page = store
            .find_elements(&query, Pagination::page(2, 1), Relations::all())
            .await
            .unwrap();
        let guids: Vec<_> = page.iter().map(|e| e.guid.as_str()).collect();
        assert_eq!(guids, vec!["G2", "G3"]);
        assert_eq!(store.count_elements(&query).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn relations_strip_unrequested_rows() {
        let store = seeded().await;
        let query = ElementQuery::new("v1", ElementFilters::default());
        let rows = store
            .find_elements(
                &query,
                Pagination::all(),
                Relations {
                    properties: false,
                    geometry: true,
                },
            )
            .await
            .unwrap();
        assert!(rows.iter().all(|e| e.properties.is_empty() && e.geometry.is_some()));
    }

    #[tokio::test]
    async fn saving_a_version_again_replaces_it() {
        let store = seeded().await;
        store.save_elements("v1", &[element("X", "Walls")]).await.unwrap();
        let query = ElementQuery::new("v1", ElementFilters::default());
        assert_eq!(store.count_elements(&query).await.unwrap(), 1);
        let other = ElementQuery::new("v2", ElementFilters::default());
        assert_eq!(store.count_elements(&other).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn object_refs_are_content_hashes() {
        let store = InMemoryObjectStore::new();
        let first = store.upload_raw_file(b"guid,name\nG1,A\n").await.unwrap();
        let second = store.upload_raw_file(b"guid,name\nG1,A\n").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(store.head_file(&first).await.unwrap());
        assert_eq!(store.get_file(&first).await.unwrap(), b"guid,name\nG1,A\n");
        assert!(matches!(
            store.get_file("missing").await,
            Err(StoreError::UnknownObject { .. })
        ));
    }
}
