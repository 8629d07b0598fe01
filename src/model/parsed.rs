use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::NormalizedElement;
use crate::error::ElementResolutionFailure;

/// Source format tag used to pick an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Ifc,
    Tabular,
    Exchange,
}

impl SourceFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ifc => "ifc",
            Self::Tabular => "tabular",
            Self::Exchange => "exchange",
        }
    }

    /// Guesses the format from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ifc" | "ifczip" | "stp" | "step" => Some(Self::Ifc),
            "csv" | "tsv" | "txt" => Some(Self::Tabular),
            "json" => Some(Self::Exchange),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ifc" => Ok(Self::Ifc),
            "tabular" | "csv" => Ok(Self::Tabular),
            "exchange" | "json" => Ok(Self::Exchange),
            other => Err(format!("unknown source format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    pub parsed_at: DateTime<Utc>,
    pub element_count: usize,
    pub storey_count: usize,
    pub source_format: SourceFormat,
}

/// Adapter output. Produced once per parse and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedModel {
    pub elements: Vec<NormalizedElement>,
    pub metadata: ModelMetadata,
    /// Elements that were only partially resolved.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<ElementResolutionFailure>,
}

impl ParsedModel {
    #[must_use]
    pub fn new(
        elements: Vec<NormalizedElement>,
        source_format: SourceFormat,
        schema: Option<String>,
        model_name: Option<String>,
        storey_count: usize,
    ) -> Self {
        let element_count = elements.len();
        Self {
            elements,
            metadata: ModelMetadata {
                schema,
                model_name,
                parsed_at: Utc::now(),
                element_count,
                storey_count,
                source_format,
            },
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Vec<ElementResolutionFailure>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}
