//! Password-manager adapters.
//!
//! Importers turn a source into [`Entry`] records; exporters write cleaned
//! entries into a destination. Adapters are selected through the closed
//! [`ManagerKind`] tag stored in each catalogue [`Descriptor`].

pub mod csv;
pub mod json;
pub mod kdbx;
pub mod otp;
pub mod pass;
mod registry;
pub mod xml;
pub mod yaml;

pub use registry::register_builtin;

use crate::catalogue::{Cap, Descriptor};
use crate::entry::Entry;
use crate::formats::Source;
use crate::import_export::{CsvExporter, GenericCsvImporter, JsonExporter};
use crate::{MigrationError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Canonical key to source column/field name.
pub type KeyMap = &'static [(&'static str, &'static str)];

/// Canonical name for a source field, or the field name itself when unmapped.
pub fn canonical<'a>(keys: KeyMap, field: &'a str) -> &'a str {
    keys.iter()
        .rev()
        .find(|(_, source)| !source.is_empty() && *source == field)
        .map(|(key, _)| *key)
        .unwrap_or(field)
}

/// Runtime settings shared by all adapters.
#[derive(Clone)]
pub struct ManagerSettings {
    /// Import only entries below this subfolder of the source.
    pub root: String,
    /// Root folder prefixed to every path on export.
    pub destination_root: String,
    pub delimiter: u8,
    /// Comma separated column mapping for the generic CSV adapter.
    pub cols: String,
    pub key_file: Option<PathBuf>,
    pub master_password: Option<Zeroizing<String>>,
    /// Export every field, not just the standard ones.
    pub all: bool,
    /// Overwrite existing destination entries.
    pub force: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            root: String::new(),
            destination_root: String::new(),
            delimiter: b',',
            cols: String::new(),
            key_file: None,
            master_password: None,
            all: false,
            force: false,
        }
    }
}

impl fmt::Debug for ManagerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerSettings")
            .field("root", &self.root)
            .field("destination_root", &self.destination_root)
            .field("delimiter", &(self.delimiter as char))
            .field("cols", &self.cols)
            .field("key_file", &self.key_file)
            .field("master_password", &self.master_password.as_ref().map(|_| "<redacted>"))
            .field("all", &self.all)
            .field("force", &self.force)
            .finish()
    }
}

/// Parses a source into entries.
pub trait Importer {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>>;
}

/// Writes cleaned entries into a destination.
///
/// `prepare` sees the whole batch before the first insert, `insert` is called
/// once per entry and `finish` once after the last successful insert.
pub trait Exporter {
    fn prepare(&mut self, _entries: &[Entry]) -> Result<()> {
        Ok(())
    }

    fn insert(&mut self, entry: &Entry) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Which adapter implementation a descriptor stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerKind {
    /// Column-mapped CSV export described by a static layout.
    CsvTable(&'static csv::CsvLayout),
    /// Enpass CSV: title, field/value pairs, note.
    EnpassCsv,
    /// User-described CSV columns, importable and exportable.
    GenericCsv,
    BitwardenJson,
    DashlaneJson,
    Enpass6Json,
    PassmanJson,
    OnePasswordPif,
    ClipperzHtml,
    KeepassXml,
    KeepassxXml,
    RevelationXml,
    Passpie,
    AndOtp,
    Aegis,
    FreeOtpPlus,
    /// KeePass database unlocked through `keepassxc-cli`.
    Kdbx,
    /// password-store driven through the `pass` CLI.
    PasswordStore,
    /// JSON dump of the cleaned entries.
    JsonFile,
}

impl Descriptor {
    /// Build the importer for this adapter.
    pub fn importer(&self, settings: &ManagerSettings) -> Result<Box<dyn Importer>> {
        if !self.cap.contains(Cap::IMPORT) {
            return Err(MigrationError::Manager(format!(
                "{} cannot import",
                self.class_name
            )));
        }
        let importer: Box<dyn Importer> = match self.kind {
            ManagerKind::CsvTable(layout) => Box::new(csv::TableImporter::new(
                layout,
                self.header.clone(),
                self.only,
                settings.delimiter,
            )),
            ManagerKind::EnpassCsv => Box::new(csv::EnpassImporter),
            ManagerKind::GenericCsv => Box::new(GenericCsvImporter::new(settings)?),
            ManagerKind::BitwardenJson => Box::new(json::BitwardenImporter),
            ManagerKind::DashlaneJson => Box::new(json::DashlaneImporter),
            ManagerKind::Enpass6Json => Box::new(json::Enpass6Importer),
            ManagerKind::PassmanJson => Box::new(json::PassmanImporter),
            ManagerKind::OnePasswordPif => Box::new(json::PifImporter),
            ManagerKind::ClipperzHtml => Box::new(json::ClipperzImporter),
            ManagerKind::KeepassXml => Box::new(xml::KeepassImporter::default()),
            ManagerKind::KeepassxXml => Box::new(xml::KeepassxImporter),
            ManagerKind::RevelationXml => Box::new(xml::RevelationImporter),
            ManagerKind::Passpie => Box::new(yaml::PasspieImporter::new(self.header.clone())),
            ManagerKind::AndOtp => Box::new(otp::AndOtpImporter),
            ManagerKind::Aegis => Box::new(otp::AegisImporter),
            ManagerKind::FreeOtpPlus => Box::new(otp::FreeOtpPlusImporter),
            ManagerKind::Kdbx => Box::new(kdbx::KdbxImporter::new(settings)),
            ManagerKind::PasswordStore => Box::new(pass::PassImporter::new(settings)),
            ManagerKind::JsonFile => {
                return Err(MigrationError::Manager(format!(
                    "{} cannot import",
                    self.class_name
                )))
            }
        };
        Ok(importer)
    }

    /// Open the exporter for this adapter on `out`.
    pub fn exporter(
        &self,
        out: Option<&Path>,
        settings: &ManagerSettings,
    ) -> Result<Box<dyn Exporter>> {
        if !self.cap.contains(Cap::EXPORT) {
            return Err(MigrationError::Manager(format!(
                "{} cannot export",
                self.class_name
            )));
        }
        let exporter: Box<dyn Exporter> = match self.kind {
            ManagerKind::GenericCsv => Box::new(CsvExporter::open(out, settings)?),
            ManagerKind::JsonFile => Box::new(JsonExporter::open(out, settings)?),
            ManagerKind::PasswordStore => Box::new(pass::PassExporter::open(out, settings)?),
            _ => {
                return Err(MigrationError::Manager(format!(
                    "{} cannot export",
                    self.class_name
                )))
            }
        };
        Ok(exporter)
    }
}

/// Truthiness of a decoded JSON value: null, false, zero and empty
/// strings or collections are false.
pub(crate) fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
    }
}

/// String field of a JSON object, empty when absent or not a string.
pub(crate) fn json_str<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Catalogue;

    #[test]
    fn test_canonical_mapping() {
        let keys: KeyMap = &[("title", "name"), ("login", "username"), ("group", "")];
        assert_eq!(canonical(keys, "name"), "title");
        assert_eq!(canonical(keys, "username"), "login");
        assert_eq!(canonical(keys, "extra"), "extra");
        assert_eq!(canonical(keys, ""), "");
    }

    #[test]
    fn test_truthiness() {
        use serde_json::json;
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(true)));
    }

    #[test]
    fn test_every_importer_can_be_built() {
        let catalogue = Catalogue::builtin();
        let settings = ManagerSettings {
            cols: "title,password".into(),
            ..ManagerSettings::default()
        };
        for descriptor in catalogue.iter().filter(|d| d.cap.contains(Cap::IMPORT)) {
            assert!(
                descriptor.importer(&settings).is_ok(),
                "{} importer",
                descriptor.class_name
            );
        }
    }

    #[test]
    fn test_import_only_adapter_cannot_export() {
        let catalogue = Catalogue::builtin();
        let descriptor = catalogue
            .get("BitwardenCSV", None, None, Cap::empty())
            .unwrap();
        assert!(descriptor
            .exporter(None, &ManagerSettings::default())
            .is_err());
    }

    #[test]
    fn test_settings_debug_redacts_password() {
        let settings = ManagerSettings {
            master_password: Some(Zeroizing::new("hunter2".to_string())),
            ..ManagerSettings::default()
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("hunter2"));
    }
}
