//! JSON and 1PIF recognition.

use super::{Header, Recognizer, Source};
use crate::Result;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static PIF_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\*\*\*.*\*\*\*\s+").unwrap());

/// Expected shape of a JSON document.
///
/// Type matchers (`Str`, `Int`, ...) accept `null` as well as a value of the
/// named type. `Array` checks every item of a list against one shape and
/// `Object` requires each listed key to be present and to match.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonShape {
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
    Array(Box<JsonShape>),
    Object(Vec<(&'static str, JsonShape)>),
    Exact(Value),
}

impl JsonShape {
    pub fn array(item: JsonShape) -> Self {
        JsonShape::Array(Box::new(item))
    }

    pub fn object(fields: Vec<(&'static str, JsonShape)>) -> Self {
        JsonShape::Object(fields)
    }

    pub fn matches(&self, data: &Value) -> bool {
        match self {
            JsonShape::Str => data.is_null() || data.is_string(),
            JsonShape::Int => data.is_null() || data.is_i64() || data.is_u64(),
            JsonShape::Float => data.is_null() || data.is_number(),
            JsonShape::Bool => data.is_null() || data.is_boolean(),
            JsonShape::List => data.is_null() || data.is_array(),
            JsonShape::Dict => data.is_null() || data.is_object(),
            JsonShape::Array(item) => match data {
                Value::Array(items) => items.iter().all(|value| item.matches(value)),
                _ => false,
            },
            JsonShape::Object(fields) => match data {
                Value::Object(map) => fields.iter().all(|(key, shape)| {
                    map.get(*key).is_some_and(|value| shape.matches(value))
                }),
                _ => false,
            },
            JsonShape::Exact(expected) => data == expected,
        }
    }
}

/// Recognizer for plain JSON exports.
pub struct JsonRecognizer {
    text: String,
    data: Option<Value>,
}

impl JsonRecognizer {
    pub fn open(source: &Source) -> Result<Self> {
        Ok(Self {
            text: source.read_text()?,
            data: None,
        })
    }
}

impl Recognizer for JsonRecognizer {
    fn is_format(&mut self) -> bool {
        match serde_json::from_str::<Value>(&self.text) {
            Ok(data) => {
                self.data = Some(data);
                true
            }
            Err(_) => false,
        }
    }

    fn check_header(&self, header: &Header, _only: bool) -> bool {
        match (header, &self.data) {
            (Header::Json(shape), Some(data)) => shape.matches(data),
            _ => false,
        }
    }
}

/// Convert a 1Password Interchange File into a JSON array.
///
/// Records are JSON objects, one per line, separated by `***<uuid>***`
/// marker lines.
pub fn pif_to_json(text: &str) -> Result<Value> {
    let cleaned = PIF_SEPARATOR.replace_all(text, "");
    let records: Vec<&str> = cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    Ok(serde_json::from_str(&format!("[{}]", records.join(",")))?)
}

/// Recognizer for 1PIF exports.
pub struct PifRecognizer {
    text: String,
}

impl PifRecognizer {
    pub fn open(source: &Source) -> Result<Self> {
        Ok(Self {
            text: source.read_text()?,
        })
    }
}

impl Recognizer for PifRecognizer {
    fn is_format(&mut self) -> bool {
        PIF_SEPARATOR.is_match(&self.text) && pif_to_json(&self.text).is_ok()
    }

    fn check_header(&self, _header: &Header, _only: bool) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_matchers_accept_null() {
        assert!(JsonShape::Str.matches(&Value::Null));
        assert!(JsonShape::Str.matches(&json!("x")));
        assert!(!JsonShape::Str.matches(&json!(1)));
        assert!(JsonShape::Int.matches(&json!(3)));
        assert!(!JsonShape::Int.matches(&json!(3.5)));
        assert!(JsonShape::Bool.matches(&json!(false)));
    }

    #[test]
    fn test_object_requires_keys() {
        let shape = JsonShape::object(vec![("id", JsonShape::Str), ("name", JsonShape::Str)]);
        assert!(shape.matches(&json!({"id": "1", "name": "n", "extra": 1})));
        assert!(!shape.matches(&json!({"id": "1"})));
        assert!(!shape.matches(&json!([])));
    }

    #[test]
    fn test_array_checks_every_item() {
        let shape = JsonShape::array(JsonShape::object(vec![("label", JsonShape::Str)]));
        assert!(shape.matches(&json!([{"label": "a"}, {"label": "b"}])));
        assert!(!shape.matches(&json!([{"label": "a"}, {"other": "b"}])));
        assert!(shape.matches(&json!([])));
        assert!(!shape.matches(&json!({"label": "a"})));
    }

    #[test]
    fn test_exact_value() {
        let shape = JsonShape::object(vec![("version", JsonShape::Exact(json!(1)))]);
        assert!(shape.matches(&json!({"version": 1})));
        assert!(!shape.matches(&json!({"version": 2})));
    }

    #[test]
    fn test_json_recognizer() {
        let source = Source::memory(br#"{"folders": [], "items": []}"#.to_vec());
        let mut recognizer = JsonRecognizer::open(&source).unwrap();
        assert!(recognizer.is_format());
        let header = Header::Json(JsonShape::object(vec![
            ("folders", JsonShape::List),
            ("items", JsonShape::List),
        ]));
        assert!(recognizer.check_header(&header, false));
        assert!(!recognizer.check_header(&Header::Csv(vec!["a"]), false));
    }

    #[test]
    fn test_pif_to_json() {
        let text = "{\"title\":\"a\"}\n***5642bee8-a5ff-11dc-8314-0800200c9a66***\n\
                    {\"title\":\"b\"}\n***5642bee8-a5ff-11dc-8314-0800200c9a66***\n";
        let data = pif_to_json(text).unwrap();
        assert_eq!(data, json!([{"title": "a"}, {"title": "b"}]));

        let mut recognizer = PifRecognizer::open(&Source::memory(text.as_bytes().to_vec())).unwrap();
        assert!(recognizer.is_format());
    }

    #[test]
    fn test_pif_rejects_plain_json() {
        let source = Source::memory(br#"{"title": "a"}"#.to_vec());
        let mut recognizer = PifRecognizer::open(&source).unwrap();
        assert!(!recognizer.is_format());
    }
}
