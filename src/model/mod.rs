pub mod element;
pub mod geometry;
pub mod parsed;

pub use element::{NormalizedElement, PropertyEntry, PropertyValue};
pub use geometry::{BoundingBox, GeometrySummary, QuantityTotals, Vec3};
pub use parsed::{ModelMetadata, ParsedModel, SourceFormat};
