//! Persistence and object-storage collaborators.
//!
//! Elements are persisted per model version; raw source files are kept in
//! an object store under a content reference. Both are traits so the
//! query and compute layers run against any backend.

mod memory;

use async_trait::async_trait;

pub use memory::{InMemoryElementStore, InMemoryObjectStore};

use crate::error::StoreError;
use crate::model::NormalizedElement;
use crate::query::ElementFilters;

/// Filtered selection of one version's elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementQuery {
    pub version_id: String,
    pub filters: ElementFilters,
}

impl ElementQuery {
    #[must_use]
    pub fn new(version_id: impl Into<String>, filters: ElementFilters) -> Self {
        Self {
            version_id: version_id.into(),
            filters,
        }
    }
}

/// Window over the ordered result. `limit: None` returns everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Pagination {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
        }
    }
}

/// Related rows loaded with each element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relations {
    pub properties: bool,
    pub geometry: bool,
}

impl Relations {
    #[must_use]
    pub fn all() -> Self {
        Self {
            properties: true,
            geometry: true,
        }
    }

    /// Drops whatever was not requested.
    #[must_use]
    pub fn project(self, mut element: NormalizedElement) -> NormalizedElement {
        if !self.properties {
            element.properties.clear();
            element.property_entries.clear();
        }
        if !self.geometry {
            element.geometry = None;
        }
        element
    }
}

/// Element rows keyed by model version, ordered by row identifier.
#[async_trait]
pub trait ElementStore: Send + Sync {
    /// Stores a version's elements, replacing any earlier rows for it.
    async fn save_elements(
        &self,
        version_id: &str,
        elements: &[NormalizedElement],
    ) -> Result<(), StoreError>;

    async fn find_elements(
        &self,
        query: &ElementQuery,
        pagination: Pagination,
        relations: Relations,
    ) -> Result<Vec<NormalizedElement>, StoreError>;

    async fn count_elements(&self, query: &ElementQuery) -> Result<usize, StoreError>;
}

/// Raw source files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores bytes and returns the reference to fetch them by.
    async fn upload_raw_file(&self, bytes: &[u8]) -> Result<String, StoreError>;

    async fn get_file(&self, object_ref: &str) -> Result<Vec<u8>, StoreError>;

    async fn head_file(&self, object_ref: &str) -> Result<bool, StoreError>;
}
