use std::collections::HashMap;
use std::fmt;

use crate::error::FormatError;

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    /// Typed value like `IFCLENGTHMEASURE(2.5)`.
    Typed(String, Box<StepValue>),
    Null,
    Derived,
}

impl StepValue {
    /// Strips any type wrappers.
    #[must_use]
    pub fn untyped(&self) -> &StepValue {
        match self {
            Self::Typed(_, inner) => inner.untyped(),
            other => other,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.untyped() {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            Self::Reference(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self.untyped() {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_enum(&self) -> Option<&str> {
        match self.untyped() {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self.untyped() {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Derived)
    }
}

/// Writes the value back in STEP syntax.
impl fmt::Display for StepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Real(r) if r.fract() == 0.0 && r.is_finite() => write!(f, "{r:.1}"),
            Self::Real(r) => write!(f, "{r}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Boolean(true) => f.write_str(".T."),
            Self::Boolean(false) => f.write_str(".F."),
            Self::Enum(e) => write!(f, ".{e}."),
            Self::Reference(id) => write!(f, "#{id}"),
            Self::List(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Typed(name, inner) => write!(f, "{name}({inner})"),
            Self::Null => f.write_str("$"),
            Self::Derived => f.write_str("*"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    pub entity_type: String,
    pub values: Vec<StepValue>,
}

impl StepEntity {
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&StepValue> {
        self.values.get(index)
    }

    /// Non-empty string attribute.
    #[must_use]
    pub fn string(&self, index: usize) -> Option<&str> {
        self.get(index)
            .and_then(StepValue::as_str)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn reference(&self, index: usize) -> Option<u64> {
        self.get(index).and_then(StepValue::as_reference)
    }

    /// All references held in a list attribute.
    #[must_use]
    pub fn references(&self, index: usize) -> Vec<u64> {
        self.get(index)
            .and_then(StepValue::as_list)
            .map(|items| items.iter().filter_map(StepValue::as_reference).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn real(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(StepValue::as_f64)
    }
}

#[derive(Debug)]
pub struct StepFile {
    pub entities: HashMap<u64, StepEntity>,
    pub schema: String,
    by_type: HashMap<String, Vec<u64>>,
}

impl StepFile {
    pub fn parse(content: &str) -> Result<Self, FormatError> {
        let mut entities = HashMap::new();
        let mut schema = String::new();
        let mut in_data = false;
        let mut saw_data = false;

        for statement in split_statements(content) {
            let statement = statement.trim();

            if statement.starts_with("FILE_SCHEMA") {
                if let Some(start) = statement.find('\'') {
                    if let Some(end) = statement[start + 1..].find('\'') {
                        schema = statement[start + 1..start + 1 + end].to_string();
                    }
                }
                continue;
            }

            // Section keywords arrive glued to the previous terminator,
            // e.g. "DATA" after "ENDSEC;".
            match statement {
                "DATA" => {
                    in_data = true;
                    saw_data = true;
                    continue;
                }
                "ENDSEC" => {
                    in_data = false;
                    continue;
                }
                _ => {}
            }

            if in_data && statement.starts_with('#') {
                if let Some(entity) = Self::parse_entity(statement) {
                    entities.insert(entity.id, entity);
                }
            }
        }

        if !saw_data {
            return Err(FormatError::InvalidStep {
                message: "no DATA section".to_string(),
            });
        }

        let mut by_type: HashMap<String, Vec<u64>> = HashMap::new();
        for entity in entities.values() {
            by_type
                .entry(entity.entity_type.clone())
                .or_default()
                .push(entity.id);
        }
        for ids in by_type.values_mut() {
            ids.sort_unstable();
        }

        Ok(StepFile {
            entities,
            schema,
            by_type,
        })
    }

    fn parse_entity(statement: &str) -> Option<StepEntity> {
        // Format: #123=IFCWALL('guid',#ref,'name',...)
        let eq_pos = statement.find('=')?;
        let id: u64 = statement[1..eq_pos].trim().parse().ok()?;

        let rest = statement[eq_pos + 1..].trim();
        let paren_pos = rest.find('(')?;
        let entity_type = rest[..paren_pos].trim().to_ascii_uppercase();
        if !rest.ends_with(')') {
            return None;
        }

        let values_str = &rest[paren_pos + 1..rest.len() - 1];
        let values = Self::parse_values(values_str);

        Some(StepEntity {
            id,
            entity_type,
            values,
        })
    }

    fn parse_values(s: &str) -> Vec<StepValue> {
        let mut values = Vec::new();
        let mut current = String::new();
        let mut in_string = false;
        let mut paren_depth = 0_i32;

        for ch in s.chars() {
            match ch {
                '\'' => {
                    in_string = !in_string;
                    current.push(ch);
                }
                '(' if !in_string => {
                    paren_depth += 1;
                    current.push(ch);
                }
                ')' if !in_string => {
                    paren_depth -= 1;
                    current.push(ch);
                }
                ',' if !in_string && paren_depth == 0 => {
                    values.push(Self::parse_single_value(current.trim()));
                    current.clear();
                }
                _ => current.push(ch),
            }
        }

        if !current.trim().is_empty() || !values.is_empty() {
            values.push(Self::parse_single_value(current.trim()));
        }

        values
    }

    fn parse_single_value(s: &str) -> StepValue {
        let s = s.trim();

        if s.is_empty() || s == "$" {
            return StepValue::Null;
        }
        if s == "*" {
            return StepValue::Derived;
        }
        if let Some(stripped) = s.strip_prefix('#') {
            if let Ok(id) = stripped.trim().parse::<u64>() {
                return StepValue::Reference(id);
            }
        }
        if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
            let raw = &s[1..s.len() - 1];
            return StepValue::String(decode_step_string(raw));
        }
        if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
            let inner = &s[1..s.len() - 1];
            if inner == "T" {
                return StepValue::Boolean(true);
            }
            if inner == "F" {
                return StepValue::Boolean(false);
            }
            return StepValue::Enum(inner.to_string());
        }
        if s.starts_with('(') && s.ends_with(')') {
            let inner = &s[1..s.len() - 1];
            return StepValue::List(Self::parse_values(inner));
        }
        if let Ok(i) = s.parse::<i64>() {
            return StepValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return StepValue::Real(f);
        }
        // Typed value like IFCBOOLEAN(.T.)
        if let Some(paren_pos) = s.find('(') {
            let name = &s[..paren_pos];
            if s.ends_with(')') && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                let inner = &s[paren_pos + 1..s.len() - 1];
                return StepValue::Typed(
                    name.to_ascii_uppercase(),
                    Box::new(Self::parse_single_value(inner)),
                );
            }
        }

        StepValue::String(s.to_string())
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    /// Entities of one exact type, ordered by id.
    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        self.ids_by_type(entity_type)
            .iter()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    #[must_use]
    pub fn ids_by_type(&self, entity_type: &str) -> &[u64] {
        self.by_type
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Splits a STEP document into `;`-terminated statements, ignoring
/// terminators inside strings and dropping `/* */` comments.
fn split_statements(content: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '/' if !in_string && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ';' if !in_string => statements.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }

    statements
}

/// Decode STEP/IFC encoded strings with Unicode escape sequences.
/// Supports:
/// - `\X2\XXXX\X0\` - 2-byte Unicode (BMP), can have multiple 4-char hex codes
/// - `\X\XX` - 1-byte ISO 8859-1
/// - `\\` - escaped backslash
/// - `''` - escaped apostrophe
fn decode_step_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('X') => {
                    chars.next();
                    match chars.peek() {
                        Some('2') => {
                            chars.next(); // '2'
                            chars.next(); // '\'

                            let mut hex = String::new();
                            while let Some(&c) = chars.peek() {
                                if c == '\\' {
                                    break;
                                }
                                hex.push(c);
                                chars.next();
                            }
                            // \X0\
                            for _ in 0..4 {
                                chars.next();
                            }
                            for chunk in hex.as_bytes().chunks(4) {
                                let decoded = std::str::from_utf8(chunk)
                                    .ok()
                                    .and_then(|s| u32::from_str_radix(s, 16).ok())
                                    .and_then(char::from_u32);
                                if let Some(c) = decoded {
                                    result.push(c);
                                }
                            }
                        }
                        Some('\\') => {
                            chars.next();
                            let hex: String = chars.by_ref().take(2).collect();
                            if let Ok(code) = u8::from_str_radix(&hex, 16) {
                                result.push(char::from(code));
                            }
                        }
                        _ => {
                            result.push('\\');
                            result.push('X');
                        }
                    }
                }
                Some('\\') => {
                    chars.next();
                    result.push('\\');
                }
                Some('S') => {
                    // \S\X - single char shift (ISO 8859-1 high bit)
                    chars.next(); // 'S'
                    chars.next(); // '\'
                    if let Some(c) = chars.next() {
                        if let Some(shifted) = char::from_u32(u32::from(c) + 128) {
                            result.push(shifted);
                        }
                    }
                }
                _ => result.push('\\'),
            }
        } else if ch == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            }
            result.push('\'');
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCWALL('2O2Fr$t4X7Zf8NOew3FLOH',$,'Wall ''A''',$,$,#5,$,$,
  .STANDARD.);
#2=IFCPROPERTYSINGLEVALUE('Width',$,IFCLENGTHMEASURE(0.25),$);
#3=IFCRELCONTAINEDINSPATIALSTRUCTURE('x',$,$,$,(#1,#2),#9);
/* comment; with terminator */
#4=IFCLABEL('caf\\X2\\00E9\\X0\\');
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn parses_multiline_entities_and_schema() {
        let file = StepFile::parse(SAMPLE).unwrap();
        assert_eq!(file.schema, "IFC4");
        assert_eq!(file.entities.len(), 4);

        let wall = file.get_entity(1).unwrap();
        assert_eq!(wall.entity_type, "IFCWALL");
        assert_eq!(wall.string(2), Some("Wall 'A'"));
        assert_eq!(wall.reference(5), Some(5));
        assert_eq!(wall.get(8).and_then(StepValue::as_enum), Some("STANDARD"));
    }

    #[test]
    fn keeps_type_wrappers() {
        let file = StepFile::parse(SAMPLE).unwrap();
        let prop = file.get_entity(2).unwrap();
        let value = prop.get(2).unwrap();
        assert_eq!(
            value,
            &StepValue::Typed("IFCLENGTHMEASURE".into(), Box::new(StepValue::Real(0.25)))
        );
        assert_eq!(value.as_f64(), Some(0.25));
        assert_eq!(value.to_string(), "IFCLENGTHMEASURE(0.25)");
    }

    #[test]
    fn reads_reference_lists() {
        let file = StepFile::parse(SAMPLE).unwrap();
        let rel = file.get_entity(3).unwrap();
        assert_eq!(rel.references(4), vec![1, 2]);
        assert_eq!(rel.reference(5), Some(9));
    }

    #[test]
    fn decodes_unicode_escapes() {
        let file = StepFile::parse(SAMPLE).unwrap();
        assert_eq!(file.get_entity(4).unwrap().string(0), Some("café"));
    }

    #[test]
    fn missing_data_section_is_invalid() {
        assert!(StepFile::parse("hello world").is_err());
    }

    #[test]
    fn empty_argument_list_has_no_values() {
        let file = StepFile::parse("DATA;\n#7=IFCOWNERHISTORY();\nENDSEC;").unwrap();
        assert!(file.get_entity(7).unwrap().values.is_empty());
    }
}
