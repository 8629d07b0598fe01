use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::GeometrySummary;

/// A scalar property value after coercion.
///
/// Serializes untagged, so `Null` becomes JSON `null` and the rest map to
/// their natural JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum PropertyValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    /// Coerces raw text: empty is null, `true`/`false` (any case) are
    /// booleans, then numbers, otherwise the text itself.
    #[must_use]
    pub fn coerce(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Null;
        }
        if raw.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Numeric view of the value. Text is parsed when it holds a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Null | Self::Bool(_) => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One named property or quantity, with the property set it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub name: String,
    #[serde(default)]
    pub value: PropertyValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// The source value before coercion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,
}

/// One building element, independent of the format it was read from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedElement {
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub element_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_entries: Vec<PropertyEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometrySummary>,
}

impl NormalizedElement {
    #[must_use]
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            ..Self::default()
        }
    }

    /// Records a property both as an ordered entry and in the flat map.
    /// A later entry with the same name wins in the flat map.
    pub fn push_property(&mut self, entry: PropertyEntry) {
        self.properties
            .insert(entry.name.clone(), entry.value.clone());
        self.property_entries.push(entry);
    }
}
