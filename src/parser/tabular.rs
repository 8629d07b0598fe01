//! Delimited-text adapter: one element per data row.

use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::debug;

use super::{non_empty, FormatAdapter, FormatError, GuidSynthesizer, ParseContext};
use crate::model::{
    BoundingBox, GeometrySummary, NormalizedElement, ParsedModel, PropertyEntry, PropertyValue,
    QuantityTotals, SourceFormat,
};

/// Columns with a dedicated element field. Anything else is a property.
const KNOWN_COLUMNS: &[&str] = &[
    "guid",
    "elementguid",
    "id",
    "name",
    "category",
    "type",
    "family",
    "system",
    "level",
    "phase",
    "description",
    "length",
    "area",
    "volume",
    "units",
];

/// Identifier columns, in resolution order.
const GUID_COLUMNS: &[&str] = &["guid", "elementguid", "id"];

#[derive(Debug, Clone, Copy, Default)]
pub struct TabularAdapter;

#[async_trait]
impl FormatAdapter for TabularAdapter {
    fn format(&self) -> SourceFormat {
        SourceFormat::Tabular
    }

    async fn parse(
        &self,
        input: &[u8],
        context: &ParseContext,
    ) -> Result<ParsedModel, FormatError> {
        parse_tabular(input, context)
    }
}

/// Parses delimited text with a header row.
///
/// Quoted fields may contain the delimiter, and a doubled quote inside a
/// quoted field is a literal quote.
pub fn parse_tabular(input: &[u8], context: &ParseContext) -> Result<ParsedModel, FormatError> {
    let text = std::str::from_utf8(input)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    if lines < 2 {
        return Err(FormatError::TooFewLines { lines });
    }

    let delimiter = context
        .options
        .delimiter
        .unwrap_or_else(|| detect_delimiter(text));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let guids = GuidSynthesizer::new(context.options.guid_strategy, SourceFormat::Tabular);
    let mut elements = Vec::new();
    let mut levels = BTreeSet::new();

    for (index, record) in reader.records().enumerate() {
        let record = record?;

        let cell = |column: &str| -> Option<String> {
            headers
                .iter()
                .position(|h| h == column)
                .and_then(|i| record.get(i))
                .and_then(non_empty)
        };

        let guid = GUID_COLUMNS
            .iter()
            .find_map(|column| cell(*column))
            .unwrap_or_else(|| guids.synthesize("row", index as u64));

        let mut element = NormalizedElement::new(guid);
        element.name = cell("name");
        element.category = cell("category");
        element.element_type = cell("type");
        element.family = cell("family");
        element.system = cell("system");
        element.level = cell("level");
        element.phase = cell("phase");
        element.description = cell("description");

        let number = |column: &str| cell(column).and_then(|v| v.parse::<f64>().ok());
        let quantities = QuantityTotals {
            length: number("length"),
            area: number("area"),
            volume: number("volume"),
        };
        element.geometry =
            GeometrySummary::from_parts(&BoundingBox::default(), quantities, cell("units"));

        for (column, raw) in headers.iter().zip(record.iter()) {
            if column.is_empty() || KNOWN_COLUMNS.contains(&column.as_str()) {
                continue;
            }
            element.push_property(PropertyEntry {
                group: None,
                name: column.clone(),
                value: PropertyValue::coerce(raw.trim()),
                unit: None,
                raw_value: Some(raw.to_string()),
            });
        }

        if let Some(level) = &element.level {
            levels.insert(level.clone());
        }
        elements.push(element);
    }

    debug!(
        rows = elements.len(),
        columns = headers.len(),
        delimiter = %char::from(delimiter),
        "parsed tabular input"
    );

    Ok(ParsedModel::new(
        elements,
        SourceFormat::Tabular,
        None,
        context.model_name.clone(),
        levels.len(),
    ))
}

/// Comma unless the header line only uses tabs or semicolons.
fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.contains(',') {
        b','
    } else if header.contains('\t') {
        b'\t'
    } else if header.contains(';') {
        b';'
    } else {
        b','
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{GuidStrategy, ParseOptions};
    use pretty_assertions::assert_eq;

    fn context() -> ParseContext {
        ParseContext::new(SourceFormat::Tabular)
    }

    #[test]
    fn maps_known_columns_to_fields() {
        let input = "guid,name,category,length\nG1,Beam-A,Structural,4.5\nG2,Beam-B,Structural,3.0\n";
        let model = parse_tabular(input.as_bytes(), &context()).unwrap();

        assert_eq!(model.elements.len(), 2);
        let first = &model.elements[0];
        assert_eq!(first.guid, "G1");
        assert_eq!(first.name.as_deref(), Some("Beam-A"));
        assert_eq!(first.category.as_deref(), Some("Structural"));
        assert!(first.properties.is_empty());
        assert!(first.property_entries.is_empty());
        assert_eq!(first.geometry.as_ref().unwrap().length, Some(4.5));
        assert_eq!(model.metadata.element_count, 2);
    }

    #[test]
    fn unknown_columns_become_coerced_properties() {
        let input = "id,FireRating,LoadBearing,Width,Notes\nA,EI 60,TRUE,0.3,\n";
        let model = parse_tabular(input.as_bytes(), &context()).unwrap();
        let element = &model.elements[0];

        assert_eq!(element.guid, "A");
        assert_eq!(element.geometry, None);
        assert_eq!(
            element.properties.get("firerating"),
            Some(&PropertyValue::Text("EI 60".into()))
        );
        assert_eq!(
            element.properties.get("loadbearing"),
            Some(&PropertyValue::Bool(true))
        );
        assert_eq!(
            element.properties.get("width"),
            Some(&PropertyValue::Number(0.3))
        );
        assert_eq!(element.properties.get("notes"), Some(&PropertyValue::Null));
        assert_eq!(element.property_entries.len(), 4);
        assert_eq!(element.property_entries[0].raw_value.as_deref(), Some("EI 60"));
    }

    #[test]
    fn quoted_fields_keep_delimiters_and_escaped_quotes() {
        let input = "guid,name,comment\nG1,\"Door, \"\"main\"\"\",\"a,b\"\n";
        let model = parse_tabular(input.as_bytes(), &context()).unwrap();
        let element = &model.elements[0];
        assert_eq!(element.name.as_deref(), Some("Door, \"main\""));
        assert_eq!(
            element.properties.get("comment"),
            Some(&PropertyValue::Text("a,b".into()))
        );
    }

    #[test]
    fn guid_falls_back_through_columns_then_synthesizes() {
        let input = "guid,elementguid,name\n,EG-1,first\n,,second\n";
        let ctx = context().with_options(ParseOptions {
            guid_strategy: GuidStrategy::ContentHash,
            ..ParseOptions::default()
        });
        let model = parse_tabular(input.as_bytes(), &ctx).unwrap();
        assert_eq!(model.elements[0].guid, "EG-1");
        assert!(!model.elements[1].guid.is_empty());

        let again = parse_tabular(input.as_bytes(), &ctx).unwrap();
        assert_eq!(model.elements[1].guid, again.elements[1].guid);
    }

    #[test]
    fn units_alone_create_geometry() {
        let input = "guid;units\nG1;m\n";
        let model = parse_tabular(input.as_bytes(), &context()).unwrap();
        let geometry = model.elements[0].geometry.as_ref().unwrap();
        assert_eq!(geometry.units.as_deref(), Some("m"));
        assert_eq!(geometry.length, None);
    }

    #[test]
    fn every_data_row_yields_an_element() {
        let input = "guid,name\n,\nG2,Door\n";
        let model = parse_tabular(input.as_bytes(), &context()).unwrap();
        assert_eq!(model.elements.len(), 2);
        assert_eq!(model.metadata.element_count, 2);

        let blank = &model.elements[0];
        assert!(!blank.guid.is_empty());
        assert_eq!(blank.name, None);
        assert!(blank.properties.is_empty());
        assert_eq!(model.elements[1].guid, "G2");
    }

    #[test]
    fn header_only_input_is_rejected() {
        let err = parse_tabular(b"guid,name\n", &context()).unwrap_err();
        assert!(matches!(err, FormatError::TooFewLines { lines: 1 }));
    }

    #[test]
    fn counts_distinct_levels() {
        let input = "guid,level\nA,L1\nB,L1\nC,L2\n";
        let model = parse_tabular(input.as_bytes(), &context()).unwrap();
        assert_eq!(model.metadata.storey_count, 2);
    }
}
