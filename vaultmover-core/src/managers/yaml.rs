//! YAML importers.

use super::{canonical, Importer, KeyMap};
use crate::entry::{Entry, Value};
use crate::formats::yaml::loose_eq;
use crate::formats::{Header, Source};
use crate::{MigrationError, Result};
use serde_yaml::Value as Yaml;

const PASSPIE_KEYS: KeyMap = &[
    ("title", "name"),
    ("password", "password"),
    ("login", "login"),
    ("comments", "comment"),
];

/// Top-level key holding the list of credentials.
const PASSPIE_ROOT: &str = "credentials";

fn is_truthy(value: &Yaml) -> bool {
    match value {
        Yaml::Null => false,
        Yaml::Bool(b) => *b,
        Yaml::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        Yaml::String(s) => !s.is_empty(),
        Yaml::Sequence(items) => !items.is_empty(),
        Yaml::Mapping(map) => !map.is_empty(),
        Yaml::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

/// Importer for Passpie YAML exports.
pub struct PasspieImporter {
    header: Header,
}

impl PasspieImporter {
    pub fn new(header: Header) -> Self {
        Self { header }
    }

    fn check_header(&self, data: &Yaml) -> bool {
        match &self.header {
            Header::Yaml(pairs) => pairs
                .iter()
                .all(|(key, expected)| data.get(*key).is_some_and(|found| loose_eq(found, expected))),
            _ => true,
        }
    }
}

impl Importer for PasspieImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let data: Yaml = serde_yaml::from_str(&source.read_text()?)?;
        if !self.check_header(&data) {
            return Err(MigrationError::Format(
                "not a Passpie export".to_string(),
            ));
        }
        let blocks = data
            .get(PASSPIE_ROOT)
            .and_then(Yaml::as_sequence)
            .ok_or_else(|| MigrationError::Format(format!("missing '{}' list", PASSPIE_ROOT)))?;

        let mut entries = Vec::new();
        for block in blocks {
            let mut entry = Entry::new();
            for (key, value) in block.as_mapping().into_iter().flatten() {
                if !is_truthy(value) {
                    continue;
                }
                let key = match key {
                    Yaml::String(key) => key.clone(),
                    other => serde_yaml::to_string(other)?.trim_end().to_string(),
                };
                entry.set(canonical(PASSPIE_KEYS, &key), Value::from_yaml(value));
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passpie_header() -> Header {
        Header::Yaml(vec![
            ("handler", Yaml::from("passpie")),
            ("version", Yaml::from(1.0)),
        ])
    }

    #[test]
    fn test_passpie() {
        let text = "handler: passpie\nversion: 1.0\ncredentials:\n\
                    - name: github.com\n  login: jdoe\n  password: pw\n  comment: ''\n  modified: 2019-01-01 10:00:00\n";
        let entries = PasspieImporter::new(passpie_header())
            .parse(&Source::memory(text.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text("title"), Some("github.com"));
        assert_eq!(entries[0].text("login"), Some("jdoe"));
        assert!(!entries[0].contains("comments"));
    }

    #[test]
    fn test_passpie_rejects_other_yaml() {
        let text = "handler: other\nversion: 1.0\ncredentials: []\n";
        let err = PasspieImporter::new(passpie_header())
            .parse(&Source::memory(text.as_bytes().to_vec()))
            .unwrap_err();
        assert!(err.is_format_error());
    }
}
