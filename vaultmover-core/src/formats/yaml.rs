//! YAML recognition.

use super::{Header, Recognizer, Source};
use crate::Result;
use serde_yaml::Value;

/// Equality for header checks: numbers compare by value so that `1` in a
/// file matches an expected `1.0`.
pub fn loose_eq(found: &Value, expected: &Value) -> bool {
    match (found, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => found == expected,
    }
}

/// Recognizer for YAML exports.
pub struct YamlRecognizer {
    text: String,
    data: Option<Value>,
}

impl YamlRecognizer {
    pub fn open(source: &Source) -> Result<Self> {
        Ok(Self {
            text: source.read_text()?,
            data: None,
        })
    }
}

impl Recognizer for YamlRecognizer {
    fn is_format(&mut self) -> bool {
        match serde_yaml::from_str::<Value>(&self.text) {
            // Any plain text parses as a YAML scalar; that is not a document.
            Ok(Value::String(_)) | Ok(Value::Null) => false,
            Ok(data) => {
                self.data = Some(data);
                true
            }
            Err(_) => false,
        }
    }

    fn check_header(&self, header: &Header, _only: bool) -> bool {
        let (Header::Yaml(pairs), Some(data)) = (header, &self.data) else {
            return false;
        };
        pairs.iter().all(|(key, expected)| {
            data.get(*key)
                .is_some_and(|found| loose_eq(found, expected))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header::Yaml(vec![
            ("handler", Value::from("passpie")),
            ("version", Value::from(1.0)),
        ])
    }

    #[test]
    fn test_passpie_header() {
        let text = "handler: passpie\nversion: 1.0\ncredentials:\n- name: a\n";
        let mut recognizer = YamlRecognizer::open(&Source::memory(text.as_bytes().to_vec())).unwrap();
        assert!(recognizer.is_format());
        assert!(recognizer.check_header(&header(), false));
    }

    #[test]
    fn test_integer_version_matches_float() {
        let text = "handler: passpie\nversion: 1\n";
        let mut recognizer = YamlRecognizer::open(&Source::memory(text.as_bytes().to_vec())).unwrap();
        assert!(recognizer.is_format());
        assert!(recognizer.check_header(&header(), false));
    }

    #[test]
    fn test_plain_text_is_not_yaml() {
        let source = Source::memory(b"title,login\na,b\n".to_vec());
        let mut recognizer = YamlRecognizer::open(&source).unwrap();
        assert!(!recognizer.is_format());
    }

    #[test]
    fn test_header_mismatch() {
        let text = "handler: other\nversion: 1.0\n";
        let mut recognizer = YamlRecognizer::open(&Source::memory(text.as_bytes().to_vec())).unwrap();
        assert!(recognizer.is_format());
        assert!(!recognizer.check_header(&header(), false));
    }
}
