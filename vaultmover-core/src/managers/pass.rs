//! password-store, driven through the `pass` command.

use super::{Exporter, Importer, ManagerSettings};
use crate::entry::{Entry, Value, COMMENTS, DATA, GROUP, KEYSLIST, OTPAUTH, PASSWORD, PATH, TITLE};
use crate::formats::Source;
use crate::otp::SCHEME;
use crate::process::Tool;
use crate::{MigrationError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zeroize::Zeroizing;

const PASS: &str = "pass";
const INSTALL_HINT: &str = "install password-store from https://www.passwordstore.org";
const STORE_DIR: &str = "PASSWORD_STORE_DIR";

/// Sorted names of the entries of a store, without the `.gpg` suffix.
/// Anything under a hidden file or directory is left out.
pub fn list(prefix: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(prefix)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(prefix).ok()?;
            let name = relative.to_str()?.strip_suffix(".gpg")?;
            Some(name.replace(std::path::MAIN_SEPARATOR, "/"))
        })
        .collect();
    names.sort();
    names
}

/// Parse the decrypted content of one store entry.
///
/// The first line is the password unless it reads `key: value`; further
/// lines are `key: value` pairs, OTP URIs or free text kept as comments.
pub fn parse_entry(name: &str, content: &str) -> Entry {
    let (group, title) = name.rsplit_once('/').unwrap_or(("", name));
    let mut entry = Entry::new();
    entry.set(GROUP, group);
    entry.set(TITLE, title);

    let mut lines = content.lines();
    if let Some(first) = lines.next() {
        match first.split_once(": ") {
            Some((key, value)) => entry.set(key, value),
            None => entry.set(PASSWORD, first),
        }
    }
    for line in lines {
        if let Some((key, value)) = line.split_once(": ") {
            entry.set(key, value);
        } else if line.starts_with(SCHEME) {
            entry.set(OTPAUTH, line);
        } else {
            let comments = match entry.text(COMMENTS) {
                Some(previous) => format!("{}\n{}", previous, line),
                None => line.to_string(),
            };
            entry.set(COMMENTS, comments);
        }
    }
    entry
}

/// Render an entry as the multiline content `pass insert` expects.
pub fn render(entry: &Entry, all: bool) -> Zeroizing<Vec<u8>> {
    if let Some(data) = entry.get(DATA).and_then(Value::as_bytes) {
        return Zeroizing::new(data.to_vec());
    }

    let mut seen: HashSet<&str> = [PASSWORD, PATH, TITLE, GROUP].into_iter().collect();
    let mut text = Zeroizing::new(String::new());
    text.push_str(entry.text(PASSWORD).unwrap_or_default());
    text.push('\n');
    for key in KEYSLIST {
        if !seen.insert(key) {
            continue;
        }
        let Some(value) = entry.get(key) else {
            continue;
        };
        if key == OTPAUTH {
            text.push_str(&format!("{}\n", value));
        } else {
            text.push_str(&format!("{}: {}\n", key, value));
        }
    }
    if all {
        for (key, value) in entry.iter() {
            if seen.insert(key) {
                text.push_str(&format!("{}: {}\n", key, value));
            }
        }
    }
    Zeroizing::new(text.as_bytes().to_vec())
}

/// Importer reading every entry of a store directory.
pub struct PassImporter {
    root: String,
}

impl PassImporter {
    pub fn new(settings: &ManagerSettings) -> Self {
        Self {
            root: settings.root.clone(),
        }
    }
}

impl Importer for PassImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let prefix = source
            .as_path()
            .filter(|path| path.is_dir())
            .ok_or_else(|| MigrationError::Format("not a password store directory".to_string()))?;
        let names = list(prefix);
        if names.is_empty() {
            return Err(MigrationError::Format("empty password store".to_string()));
        }

        let tool = Tool::locate(&[PASS], INSTALL_HINT)?.env(STORE_DIR, prefix.to_string_lossy());
        let mut entries = Vec::new();
        for name in names.iter().filter(|name| name.contains(self.root.as_str())) {
            debug!("Reading {}", name);
            let output = tool.run(&["show", name.as_str()], None)?;
            if !output.success() {
                return Err(MigrationError::Format(format!(
                    "cannot read {}: {}",
                    name, output.stderr
                )));
            }
            let entry = match std::str::from_utf8(&output.stdout) {
                Ok(content) => parse_entry(name, content),
                Err(_) => {
                    let mut entry = parse_entry(name, "");
                    entry.set(DATA, output.stdout.to_vec());
                    entry
                }
            };
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Exporter inserting entries with `pass insert --multiline`.
pub struct PassExporter {
    prefix: PathBuf,
    root: String,
    all: bool,
    force: bool,
    tool: Option<Tool>,
}

impl PassExporter {
    /// Export into the store at `out`, or at `$PASSWORD_STORE_DIR`.
    pub fn open(out: Option<&Path>, settings: &ManagerSettings) -> Result<Self> {
        let prefix = out
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(STORE_DIR).map(PathBuf::from))
            .ok_or_else(|| {
                MigrationError::Manager(format!(
                    "{} prefix unknown, set {} or use --out",
                    PASS, STORE_DIR
                ))
            })?;
        info!("Exporting to password store {}", prefix.display());
        Ok(Self {
            prefix,
            root: settings.destination_root.clone(),
            all: settings.all,
            force: settings.force,
            tool: None,
        })
    }

    fn destination(&self, entry: &Entry) -> String {
        if self.root.is_empty() {
            entry.path().to_string()
        } else {
            format!("{}/{}", self.root.trim_end_matches('/'), entry.path())
        }
    }
}

impl Exporter for PassExporter {
    fn insert(&mut self, entry: &Entry) -> Result<()> {
        let path = self.destination(entry);
        if !self.force && self.prefix.join(format!("{}.gpg", path)).is_file() {
            return Err(MigrationError::Manager(format!(
                "An entry already exists for {}.",
                path
            )));
        }

        if self.tool.is_none() {
            let tool = Tool::locate(&[PASS], INSTALL_HINT)?
                .env(STORE_DIR, self.prefix.to_string_lossy());
            self.tool = Some(tool);
        }
        let tool = self
            .tool
            .as_ref()
            .ok_or_else(|| MigrationError::Manager(format!("{} is not available", PASS)))?;
        let content = render(entry, self.all);
        let output = tool.run(
            &["insert", "--multiline", "--force", "--", path.as_str()],
            Some(content.as_slice()),
        )?;
        if !output.success() {
            return Err(MigrationError::Manager(format!(
                "{} {}",
                output.stderr,
                String::from_utf8_lossy(&output.stdout)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_list_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Social")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("mail.gpg"), b"").unwrap();
        fs::write(root.join("Social/twitter.gpg"), b"").unwrap();
        fs::write(root.join(".git/config.gpg"), b"").unwrap();
        fs::write(root.join(".gpg-id"), b"").unwrap();
        fs::write(root.join("notes.txt"), b"").unwrap();
        assert_eq!(list(root), vec!["Social/twitter", "mail"]);
    }

    #[test]
    fn test_parse_entry() {
        let entry = parse_entry(
            "Social/twitter",
            "pw\nlogin: jdoe\notpauth://totp/x?secret=JBSWY3DP\nfirst note\nsecond note\n",
        );
        assert_eq!(entry.text("group"), Some("Social"));
        assert_eq!(entry.text("title"), Some("twitter"));
        assert_eq!(entry.text("password"), Some("pw"));
        assert_eq!(entry.text("login"), Some("jdoe"));
        assert_eq!(entry.text("otpauth"), Some("otpauth://totp/x?secret=JBSWY3DP"));
        assert_eq!(entry.text("comments"), Some("first note\nsecond note"));
    }

    #[test]
    fn test_parse_entry_without_password() {
        let entry = parse_entry("mail", "login: jdoe\n");
        assert_eq!(entry.text("group"), Some(""));
        assert_eq!(entry.text("login"), Some("jdoe"));
        assert!(!entry.contains("password"));
    }

    #[test]
    fn test_render_standard_keys() {
        let entry: Entry = [
            ("path", "Social/twitter"),
            ("password", "pw"),
            ("otpauth", "otpauth://totp/x?secret=A"),
            ("login", "jdoe"),
            ("pin", "1234"),
        ]
        .into_iter()
        .collect();
        let rendered = render(&entry, false);
        assert_eq!(
            String::from_utf8(rendered.to_vec()).unwrap(),
            "pw\nlogin: jdoe\notpauth://totp/x?secret=A\n"
        );
        let rendered = render(&entry, true);
        assert_eq!(
            String::from_utf8(rendered.to_vec()).unwrap(),
            "pw\nlogin: jdoe\notpauth://totp/x?secret=A\npin: 1234\n"
        );
    }

    #[test]
    fn test_render_attachment() {
        let mut entry = Entry::new();
        entry.set("path", "file.bin");
        entry.set("data", vec![0u8, 159, 146]);
        assert_eq!(render(&entry, false).as_slice(), &[0u8, 159, 146]);
    }

    #[test]
    fn test_insert_refuses_existing_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mail.gpg"), b"").unwrap();
        let mut exporter = PassExporter::open(Some(dir.path()), &ManagerSettings::default()).unwrap();
        let entry: Entry = [("path", "mail"), ("password", "pw")].into_iter().collect();
        let err = exporter.insert(&entry).unwrap_err();
        assert!(matches!(err, MigrationError::Manager(_)));
    }

    #[test]
    fn test_destination_root() {
        let settings = ManagerSettings {
            destination_root: "imported/".to_string(),
            ..ManagerSettings::default()
        };
        let exporter = PassExporter::open(Some(Path::new("/tmp/store")), &settings).unwrap();
        let entry: Entry = [("path", "mail")].into_iter().collect();
        assert_eq!(exporter.destination(&entry), "imported/mail");
    }
}
