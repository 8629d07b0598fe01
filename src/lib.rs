//! # BIM Ingest
//!
//! Normalizes building-model files into one element model and computes
//! quantity takeoffs and handover registers over it.
//!
//! ## Features
//!
//! - IFC models (IFC2x3 and IFC4 STEP files) with storey levels, property
//!   sets, quantities and placed bounding boxes
//! - Delimited tabular exports (comma, tab or semicolon)
//! - JSON model-exchange object graphs
//! - Filtered, paginated element queries
//! - Grouped takeoff and handover registers, exported to CSV or JSON
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bim_ingest::compute::{compute_takeoff, GroupBy};
//! use bim_ingest::ingest::Ingestor;
//! use bim_ingest::model::SourceFormat;
//! use bim_ingest::parser::ParseContext;
//! use bim_ingest::query::ElementFilters;
//! use bim_ingest::store::{InMemoryElementStore, InMemoryObjectStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let elements = Arc::new(InMemoryElementStore::new());
//! let ingestor = Ingestor::new(elements.clone(), Arc::new(InMemoryObjectStore::new()));
//!
//! let bytes = std::fs::read("model.ifc")?;
//! ingestor
//!     .ingest("v1", &bytes, &ParseContext::new(SourceFormat::Ifc))
//!     .await?;
//!
//! let report = compute_takeoff(
//!     &*elements,
//!     "v1",
//!     &ElementFilters::default(),
//!     Some(GroupBy::Level),
//! )
//! .await?;
//! println!("{} elements", report.summary.element_count);
//! # Ok(())
//! # }
//! ```

pub mod compute;
pub mod error;
pub mod export;
pub mod ingest;
pub mod model;
pub mod parser;
pub mod query;
pub mod store;
