//! KeePass KDBX databases, unlocked by `keepassxc-cli`.

use super::xml::{parse_keepass, KeepassOptions};
use super::{Importer, ManagerSettings};
use crate::entry::Entry;
use crate::formats::Source;
use crate::process::Tool;
use crate::{MigrationError, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;
use zeroize::Zeroizing;

const KEEPASSXC_CLI: &str = "keepassxc-cli";
const INSTALL_HINT: &str = "install KeePassXC, which provides keepassxc-cli";

/// Importer for KDBX 3 and KDBX 4 databases.
pub struct KdbxImporter {
    root: String,
    key_file: Option<PathBuf>,
    master_password: Option<Zeroizing<String>>,
}

impl KdbxImporter {
    pub fn new(settings: &ManagerSettings) -> Self {
        Self {
            root: settings.root.clone(),
            key_file: settings.key_file.clone(),
            master_password: settings.master_password.clone(),
        }
    }

    fn export_args(&self, database: PathBuf) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["export".into(), "--format".into(), "xml".into()];
        if let Some(key_file) = &self.key_file {
            args.push("--key-file".into());
            args.push(key_file.clone().into_os_string());
        }
        args.push(database.into_os_string());
        args
    }
}

impl Importer for KdbxImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let database = source.as_path().ok_or_else(|| {
            MigrationError::Format("a KDBX database must be read from a file".to_string())
        })?;
        let tool = Tool::locate(&[KEEPASSXC_CLI], INSTALL_HINT)?;

        let mut stdin = Zeroizing::new(Vec::new());
        if let Some(password) = &self.master_password {
            stdin.extend_from_slice(password.as_bytes());
        }
        stdin.push(b'\n');

        info!("Unlocking {}", database.display());
        let output = tool.run(&self.export_args(database.to_path_buf()), Some(stdin.as_slice()))?;
        if !output.success() {
            return Err(MigrationError::Manager(format!(
                "unable to open {}: {}",
                database.display(),
                output.stderr
            )));
        }

        let xml = std::str::from_utf8(&output.stdout)
            .map_err(|_| MigrationError::Format("keepassxc-cli returned invalid UTF-8".to_string()))?;
        let options = KeepassOptions {
            strip_root: true,
            history: true,
            attachments: true,
            root: self.root.clone(),
        };
        parse_keepass(xml, &options)
    }
}
