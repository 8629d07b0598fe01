//! Format adapters: every supported source format parses into a
//! [`ParsedModel`] through the same [`FormatAdapter`] contract.

pub mod exchange;
pub mod ifc;
pub mod step;
pub mod tabular;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub use crate::error::FormatError;
use crate::model::{ParsedModel, SourceFormat};
pub use exchange::ExchangeAdapter;
pub use ifc::IfcAdapter;
pub use step::{StepEntity, StepFile, StepValue};
pub use tabular::TabularAdapter;

/// How identifiers are made up for elements that have none in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuidStrategy {
    /// A fresh UUID per element and parse.
    #[default]
    Random,
    /// Derived from format, type code and position, so re-parsing the same
    /// file yields the same identifiers.
    ContentHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub include_spatial_structure: bool,
    pub include_properties: bool,
    pub include_geometry: bool,
    pub guid_strategy: GuidStrategy,
    /// Field delimiter for tabular input. `None` detects it from the header.
    pub delimiter: Option<u8>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_spatial_structure: true,
            include_properties: true,
            include_geometry: true,
            guid_strategy: GuidStrategy::Random,
            delimiter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseContext {
    pub source_format: SourceFormat,
    pub model_name: Option<String>,
    pub options: ParseOptions,
}

impl ParseContext {
    #[must_use]
    pub fn new(source_format: SourceFormat) -> Self {
        Self {
            source_format,
            model_name: None,
            options: ParseOptions::default(),
        }
    }

    #[must_use]
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }
}

/// Parses raw input into the canonical element model.
#[async_trait]
pub trait FormatAdapter: Send + Sync {
    fn format(&self) -> SourceFormat;

    async fn parse(&self, input: &[u8], context: &ParseContext)
        -> Result<ParsedModel, FormatError>;
}

/// Returns the adapter registered for a format tag.
#[must_use]
pub fn adapter_for(format: SourceFormat) -> Box<dyn FormatAdapter> {
    match format {
        SourceFormat::Ifc => Box::new(IfcAdapter::new()),
        SourceFormat::Tabular => Box::new(TabularAdapter),
        SourceFormat::Exchange => Box::new(ExchangeAdapter),
    }
}

/// Produces identifiers for elements without a source GUID.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GuidSynthesizer {
    strategy: GuidStrategy,
    format: SourceFormat,
}

impl GuidSynthesizer {
    pub(crate) fn new(strategy: GuidStrategy, format: SourceFormat) -> Self {
        Self { strategy, format }
    }

    /// `kind` is the type code or category, `index` the element's position
    /// in the source.
    pub(crate) fn synthesize(&self, kind: &str, index: u64) -> String {
        match self.strategy {
            GuidStrategy::Random => Uuid::new_v4().to_string(),
            GuidStrategy::ContentHash => {
                let mut hasher = Sha256::new();
                hasher.update(self.format.as_str().as_bytes());
                hasher.update([0]);
                hasher.update(kind.as_bytes());
                hasher.update([0]);
                hasher.update(index.to_le_bytes());
                let digest = hasher.finalize();
                hex::encode(&digest[..16])
            }
        }
    }
}

/// Trims a string and drops it when empty.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
