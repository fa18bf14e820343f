//! vaultmover core library
//!
//! Moves credentials between password managers. The library recognizes the
//! format of an export file, identifies which manager produced it, parses it
//! into manager-neutral entries, normalizes those entries into a clean
//! hierarchical namespace and hands them to a destination adapter.

pub mod catalogue;
pub mod clean;
pub mod config;
pub mod decrypt;
pub mod detect;
pub mod entry;
pub mod export;
pub mod filter;
pub mod formats;
pub mod groups;
pub mod import_export;
pub mod managers;
pub mod otp;
pub mod platform;
pub mod process;

pub use catalogue::{Cap, Catalogue, CatalogueBuilder, Descriptor};
pub use clean::{CleanConfig, Cleaner};
pub use config::{FileConfig, Settings};
pub use decrypt::{Decrypters, Sniffed};
pub use detect::AutoDetect;
pub use entry::{Entry, Value};
pub use export::{export_entries, ExportReport};
pub use filter::EntryFilter;
pub use formats::{Format, Header, Source};
pub use managers::{Exporter, Importer, ManagerKind, ManagerSettings};

use thiserror::Error;

/// Result type for migration operations
pub type Result<T> = std::result::Result<T, MigrationError>;

/// General error type for migration operations
#[derive(Error, Debug)]
pub enum MigrationError {
    /// The source does not match the structure the adapter expects.
    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Unknown password manager: {0}")]
    UnknownManager(String),

    #[error("No default format for password manager: {0}")]
    NoDefaultManager(String),

    /// Adapter failure such as an unusable destination or a bad key file.
    #[error("Password manager error: {0}")]
    Manager(String),

    #[error("Missing dependency '{name}': {hint}")]
    MissingDependency { name: String, hint: String },

    #[error("Folder hierarchy contains a cycle at '{0}'")]
    CorruptGroupTree(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),
}

impl MigrationError {
    /// True when the error means "this source is not what the adapter expects",
    /// including the structured parse failures of the underlying decoders.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            MigrationError::Format(_)
                | MigrationError::Json(_)
                | MigrationError::Csv(_)
                | MigrationError::Yaml(_)
                | MigrationError::Xml(_)
        )
    }

    /// True for failures reported by a single adapter operation, which the
    /// export loop downgrades to a per-entry warning.
    pub fn is_manager_error(&self) -> bool {
        matches!(self, MigrationError::Manager(_))
    }
}
