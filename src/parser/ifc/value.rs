//! Typed property values as the engine hands them over.

use crate::model::PropertyValue;
use crate::parser::step::StepValue;

/// A scalar value read from a property or quantity.
#[derive(Debug, Clone, PartialEq)]
pub enum IfcValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Enum(String),
    Unset,
}

impl IfcValue {
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_property_value(&self) -> PropertyValue {
        match self {
            Self::Number(n) => PropertyValue::Number(*n),
            Self::Text(s) | Self::Enum(s) => PropertyValue::Text(s.clone()),
            Self::Bool(b) => PropertyValue::Bool(*b),
            Self::Unset => PropertyValue::Null,
        }
    }
}

impl From<&StepValue> for IfcValue {
    fn from(value: &StepValue) -> Self {
        match value {
            StepValue::Typed(_, inner) => Self::from(inner.as_ref()),
            StepValue::Real(f) => Self::Number(*f),
            StepValue::Integer(i) => Self::Number(*i as f64),
            StepValue::String(s) => Self::Text(s.clone()),
            StepValue::Boolean(b) => Self::Bool(*b),
            // IfcLogical UNKNOWN stays an enum
            StepValue::Enum(e) => Self::Enum(e.clone()),
            StepValue::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(Self::from)
                    .filter(|v| !v.is_unset())
                    .map(|v| v.to_property_value().to_string())
                    .collect();
                if parts.is_empty() {
                    Self::Unset
                } else {
                    Self::Text(parts.join(", "))
                }
            }
            StepValue::Reference(_) | StepValue::Null | StepValue::Derived => Self::Unset,
        }
    }
}

/// Value-bearing fields of property and quantity items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueField {
    NominalValue,
    LengthValue,
    AreaValue,
    VolumeValue,
    CountValue,
    WeightValue,
    TimeValue,
    Value,
}

impl ValueField {
    /// Probe order: the first field present with a value wins.
    pub const PROBE_ORDER: [ValueField; 8] = [
        Self::NominalValue,
        Self::LengthValue,
        Self::AreaValue,
        Self::VolumeValue,
        Self::CountValue,
        Self::WeightValue,
        Self::TimeValue,
        Self::Value,
    ];
}

/// One field of a property item, with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub field: ValueField,
    pub value: IfcValue,
    pub raw: String,
}

/// Returns the first populated field in probe order.
#[must_use]
pub fn probe(fields: &[FieldValue]) -> Option<&FieldValue> {
    ValueField::PROBE_ORDER.iter().find_map(|wanted| {
        fields
            .iter()
            .find(|f| f.field == *wanted && !f.value.is_unset())
    })
}
