//! Model-exchange adapter: JSON object graphs exported by authoring tools.
//!
//! The graph is walked depth-first through `elements` and `children`
//! arrays. A `level` on any object is inherited by everything below it.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

use super::{non_empty, FormatAdapter, FormatError, GuidSynthesizer, ParseContext};
use crate::model::{
    BoundingBox, GeometrySummary, NormalizedElement, ParsedModel, PropertyEntry, PropertyValue,
    QuantityTotals, SourceFormat,
};

/// Child arrays, in traversal order.
const CHILD_KEYS: &[&str] = &["elements", "children"];

/// Identity members, in resolution order.
const IDENTITY_KEYS: &[&str] = &["guid", "applicationId", "id"];

const PROPERTY_KEYS: &[&str] = &["parameters", "properties"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeAdapter;

#[async_trait]
impl FormatAdapter for ExchangeAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::Exchange
    }

    async fn parse(
        &self,
        input: &[u8],
        context: &ParseContext,
    ) -> Result<ParsedModel, FormatError> {
        parse_exchange(input, context)
    }
}

/// Parses a JSON object graph whose root is an object or an array of
/// objects.
pub fn parse_exchange(input: &[u8], context: &ParseContext) -> Result<ParsedModel, FormatError> {
    let root: Value = serde_json::from_slice(input)?;
    let roots: Vec<&Value> = match &root {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![&root],
        _ => {
            return Err(FormatError::UnsupportedStructure {
                message: "root must be an object or an array of objects".to_string(),
            })
        }
    };

    let guids = GuidSynthesizer::new(context.options.guid_strategy, SourceFormat::Exchange);
    let mut elements = Vec::new();
    let mut levels = BTreeSet::new();
    let mut visited: u64 = 0;

    let mut stack: Vec<(&Value, Option<String>)> =
        roots.into_iter().rev().map(|value| (value, None)).collect();
    while let Some((value, inherited)) = stack.pop() {
        let Value::Object(object) = value else {
            continue;
        };
        let index = visited;
        visited += 1;

        let level = text_field(object, "level").or(inherited);

        if is_element(object) {
            let mut element = to_element(object, &guids, index);
            element.level.clone_from(&level);
            if let Some(level) = &element.level {
                levels.insert(level.clone());
            }
            elements.push(element);
        }

        // Reverse so the first child array, and its first item, pop first.
        for key in CHILD_KEYS.iter().rev() {
            if let Some(Value::Array(children)) = object.get(*key) {
                for child in children.iter().rev() {
                    stack.push((child, level.clone()));
                }
            }
        }
    }

    debug!(
        objects = visited,
        elements = elements.len(),
        levels = levels.len(),
        "parsed exchange graph"
    );

    Ok(ParsedModel::new(
        elements,
        SourceFormat::Exchange,
        None,
        context.model_name.clone(),
        levels.len(),
    ))
}

/// Objects with an identity or a category are elements. Containers only
/// count when they are categorised.
fn is_element(object: &Map<String, Value>) -> bool {
    let container = CHILD_KEYS
        .iter()
        .any(|key| matches!(object.get(*key), Some(Value::Array(_))));
    let categorised = text_field(object, "category").is_some();
    categorised || (!container && identity(object).is_some())
}

fn identity(object: &Map<String, Value>) -> Option<String> {
    IDENTITY_KEYS
        .iter()
        .find_map(|key| match object.get(*key)? {
            Value::String(s) => non_empty(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

/// A string member, or the `name` of an object member.
fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => non_empty(s),
        Value::Object(inner) => match inner.get("name")? {
            Value::String(s) => non_empty(s),
            _ => None,
        },
        _ => None,
    }
}

fn number_field(object: &Map<String, Value>, key: &str) -> Option<f64> {
    object.get(key).and_then(Value::as_f64)
}

fn to_element(
    object: &Map<String, Value>,
    guids: &GuidSynthesizer,
    index: u64,
) -> NormalizedElement {
    let category = text_field(object, "category");
    let guid = identity(object)
        .unwrap_or_else(|| guids.synthesize(category.as_deref().unwrap_or("object"), index));

    let mut element = NormalizedElement::new(guid);
    element.name = text_field(object, "name");
    element.category = category;
    element.element_type = text_field(object, "type");
    element.family = text_field(object, "family");
    element.system = text_field(object, "system");
    element.phase = text_field(object, "phase");
    element.description = text_field(object, "description");

    for key in PROPERTY_KEYS {
        if let Some(Value::Object(members)) = object.get(*key) {
            flatten_properties(members, None, &mut element);
        }
    }

    let mut bbox = BoundingBox::default();
    if let Some(Value::Object(extent)) = object.get("bbox") {
        for corner in ["min", "max"] {
            if let Some(point) = extent.get(corner).and_then(point3) {
                bbox.include(point);
            }
        }
    }
    let quantities = QuantityTotals {
        length: number_field(object, "length"),
        area: number_field(object, "area"),
        volume: number_field(object, "volume"),
    };
    element.geometry = GeometrySummary::from_parts(&bbox, quantities, text_field(object, "units"));

    element
}

/// Scalar members become entries. Nested objects become groups, except
/// parameter records (`{name?, value, units?}`) which are one entry each.
fn flatten_properties(
    members: &Map<String, Value>,
    group: Option<&str>,
    element: &mut NormalizedElement,
) {
    for (key, value) in members {
        match value {
            Value::Object(inner) if is_parameter_record(inner) => {
                let name = text_field(inner, "name").unwrap_or_else(|| key.clone());
                let value = inner.get("value").unwrap_or(&Value::Null);
                element.push_property(PropertyEntry {
                    group: group.map(str::to_string),
                    name,
                    value: scalar(value),
                    unit: text_field(inner, "units"),
                    raw_value: raw_text(value),
                });
            }
            Value::Object(inner) => flatten_properties(inner, Some(key.as_str()), element),
            Value::Array(_) => {}
            scalar_value => element.push_property(PropertyEntry {
                group: group.map(str::to_string),
                name: key.clone(),
                value: scalar(scalar_value),
                unit: None,
                raw_value: raw_text(scalar_value),
            }),
        }
    }
}

fn is_parameter_record(object: &Map<String, Value>) -> bool {
    matches!(
        object.get("value"),
        Some(Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))
    )
}

fn scalar(value: &Value) -> PropertyValue {
    match value {
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(PropertyValue::Null, PropertyValue::Number),
        Value::String(s) if !s.trim().is_empty() => PropertyValue::Text(s.clone()),
        _ => PropertyValue::Null,
    }
}

fn raw_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn point3(value: &Value) -> Option<[f64; 3]> {
    match value.as_array()?.as_slice() {
        [x, y, z] => Some([x.as_f64()?, y.as_f64()?, z.as_f64()?]),
        _ => None,
    }
}
