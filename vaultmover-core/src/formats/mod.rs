//! Structural file formats and their recognizers.
//!
//! A recognizer answers two questions about a source: is it structurally
//! this format at all (`is_format`), and does its top-level shape match a
//! given manager's header (`check_header`). Recognizers never fail: a source
//! that cannot be opened yields the [`DummyRecognizer`], which rejects
//! everything.

pub mod csv;
pub mod json;
pub mod kdbx;
pub mod xml;
pub mod yaml;

pub use self::csv::CsvRecognizer;
pub use self::json::{JsonRecognizer, JsonShape, PifRecognizer};
pub use self::kdbx::KdbxRecognizer;
pub use self::xml::{HtmlRecognizer, XmlRecognizer};
pub use self::yaml::YamlRecognizer;

use crate::{MigrationError, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroizing;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Structural format tag of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Format {
    Csv,
    Xml,
    Json,
    Kdbx,
    Yaml,
    Pif,
    Html,
    /// A live password-store directory driven through the `pass` CLI.
    Pass,
}

impl Format {
    /// Order in which formats are tried during detection.
    pub const PRIORITY: [Format; 7] = [
        Format::Csv,
        Format::Xml,
        Format::Json,
        Format::Kdbx,
        Format::Yaml,
        Format::Pif,
        Format::Html,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Xml => "xml",
            Format::Json => "json",
            Format::Kdbx => "kdbx",
            Format::Yaml => "yaml",
            Format::Pif => "1pif",
            Format::Html => "html",
            Format::Pass => "pass",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "csv" => Some(Format::Csv),
            "xml" => Some(Format::Xml),
            "json" => Some(Format::Json),
            "kdbx" => Some(Format::Kdbx),
            "yaml" | "yml" => Some(Format::Yaml),
            "1pif" => Some(Format::Pif),
            "html" => Some(Format::Html),
            "pass" => Some(Format::Pass),
            _ => None,
        }
    }

    /// Whether detection can recognize this format from file content.
    pub fn has_recognizer(self) -> bool {
        Self::PRIORITY.contains(&self)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Where an import reads from: a filesystem path or a decrypted in-memory
/// buffer. Buffers are wiped on drop.
#[derive(Debug, Clone)]
pub enum Source {
    Path(PathBuf),
    Memory(Zeroizing<Vec<u8>>),
}

impl Source {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn memory(bytes: Vec<u8>) -> Self {
        Source::Memory(Zeroizing::new(bytes))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Source::Path(path) => Some(path),
            Source::Memory(_) => None,
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self, Source::Memory(_))
    }

    /// A source is readable when it is a buffer or an existing file.
    pub fn is_readable(&self) -> bool {
        match self {
            Source::Path(path) => path.is_file(),
            Source::Memory(_) => true,
        }
    }

    /// Whole content as bytes. The file handle lives only for this call.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Source::Path(path) => {
                let mut file = File::open(path)?;
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)?;
                Ok(buffer)
            }
            Source::Memory(bytes) => Ok(bytes.to_vec()),
        }
    }

    /// At most `limit` leading bytes.
    pub fn read_prefix(&self, limit: usize) -> Result<Vec<u8>> {
        match self {
            Source::Path(path) => {
                let file = File::open(path)?;
                let mut buffer = Vec::with_capacity(limit);
                file.take(limit as u64).read_to_end(&mut buffer)?;
                Ok(buffer)
            }
            Source::Memory(bytes) => Ok(bytes[..bytes.len().min(limit)].to_vec()),
        }
    }

    /// Whole content decoded as UTF-8 with any leading BOM removed.
    pub fn read_text(&self) -> Result<String> {
        let bytes = self.read_bytes()?;
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
        String::from_utf8(bytes.to_vec())
            .map_err(|_| MigrationError::Format(format!("{} is not UTF-8 text", self)))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Memory(_) => f.write_str("<decrypted stream>"),
        }
    }
}

/// The expected top-level shape of a manager's export.
#[derive(Debug, Clone, PartialEq)]
pub enum Header {
    /// No structural expectation: adapters driven by an external tool.
    None,
    /// Column names that must all be present in the first CSV row.
    Csv(Vec<&'static str>),
    Xml {
        doctype: Option<&'static str>,
        root: &'static str,
    },
    /// Slash separated element path that must exist under `<html>`.
    Html(&'static str),
    Json(JsonShape),
    /// Top-level key/value pairs that must be equal in the YAML mapping.
    Yaml(Vec<(&'static str, serde_yaml::Value)>),
}

/// Format-level structural check over one source.
pub trait Recognizer {
    /// True when the source structurally is this recognizer's format.
    fn is_format(&mut self) -> bool;

    /// True when the source's top-level shape matches `header`. `only`
    /// requires the CSV column count to equal the header's.
    fn check_header(&self, header: &Header, only: bool) -> bool;
}

/// Recognizer that rejects every source.
#[derive(Debug, Default)]
pub struct DummyRecognizer;

impl Recognizer for DummyRecognizer {
    fn is_format(&mut self) -> bool {
        false
    }

    fn check_header(&self, _header: &Header, _only: bool) -> bool {
        false
    }
}

/// Open the structural recognizer for `format` over `source`.
///
/// Opening failures (unreadable file, format without a recognizer) are
/// logged and degrade to the [`DummyRecognizer`].
pub fn open_recognizer(format: Format, source: &Source, delimiter: u8) -> Box<dyn Recognizer> {
    let opened: Result<Box<dyn Recognizer>> = match format {
        Format::Csv => CsvRecognizer::open(source, delimiter).map(|r| Box::new(r) as _),
        Format::Xml => XmlRecognizer::open(source).map(|r| Box::new(r) as _),
        Format::Html => HtmlRecognizer::open(source).map(|r| Box::new(r) as _),
        Format::Json => JsonRecognizer::open(source).map(|r| Box::new(r) as _),
        Format::Pif => PifRecognizer::open(source).map(|r| Box::new(r) as _),
        Format::Yaml => YamlRecognizer::open(source).map(|r| Box::new(r) as _),
        Format::Kdbx => KdbxRecognizer::open(source).map(|r| Box::new(r) as _),
        Format::Pass => Ok(Box::new(DummyRecognizer)),
    };
    match opened {
        Ok(recognizer) => recognizer,
        Err(e) => {
            debug!("Cannot open {} as {}: {}", source, format, e);
            Box::new(DummyRecognizer)
        }
    }
}
