//! XML importers: KeePass, KeePassX and Revelation.

use super::{canonical, Importer, KeyMap};
use crate::entry::{Entry, Value, DATA, GROUP, TITLE};
use crate::formats::xml::{child, child_text, children, parse_document};
use crate::formats::Source;
use crate::{MigrationError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

fn join(path: &str, name: &str) -> String {
    match (path.is_empty(), name.is_empty()) {
        (_, true) => path.to_string(),
        (true, false) => name.to_string(),
        (false, false) => format!("{}/{}", path, name),
    }
}

fn expect_root<'a, 'input>(document: &'a Document<'input>, tag: &str) -> Result<Node<'a, 'input>> {
    let root = document.root_element();
    if root.tag_name().name() != tag {
        return Err(MigrationError::Format(format!(
            "expected <{}> root element, found <{}>",
            tag,
            root.tag_name().name()
        )));
    }
    Ok(root)
}

fn text_value(node: Node<'_, '_>) -> Value {
    node.text().map_or(Value::Null, Value::from)
}

const KEEPASS_KEYS: KeyMap = &[
    ("title", "Title"),
    ("password", "Password"),
    ("login", "UserName"),
    ("url", "URL"),
    ("comments", "Notes"),
    ("otpauth", "otp"),
];

/// What to pull out of a KeePass XML document beyond the live entries.
#[derive(Debug, Clone, Default)]
pub struct KeepassOptions {
    /// Leave the database root group out of entry groups.
    pub strip_root: bool,
    /// Import history snapshots under `History/<group>`.
    pub history: bool,
    /// Import binary attachments as separate `data` entries.
    pub attachments: bool,
    /// Only keep entries whose `group/title` contains this string.
    pub root: String,
}

/// Importer for KeePass 2 XML exports.
#[derive(Debug, Clone, Default)]
pub struct KeepassImporter {
    options: KeepassOptions,
}

impl KeepassImporter {
    pub fn with_options(options: KeepassOptions) -> Self {
        Self { options }
    }
}

impl Importer for KeepassImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        parse_keepass(&source.read_text()?, &self.options)
    }
}

/// Parse a KeePass 2 XML document into entries.
pub fn parse_keepass(text: &str, options: &KeepassOptions) -> Result<Vec<Entry>> {
    let document = parse_document(text)?;
    let root = expect_root(&document, "KeePassFile")?;
    let top = child(root, "Root")
        .and_then(|node| child(node, "Group"))
        .ok_or_else(|| MigrationError::Format("KeePass file without a root group".to_string()))?;

    let mut walker = KeepassWalker {
        options,
        binaries: read_binaries(root)?,
        entries: Vec::new(),
    };
    let path = if options.strip_root {
        String::new()
    } else {
        child_text(top, "Name").unwrap_or_default().to_string()
    };
    walker.walk(top, &path)?;
    Ok(walker.entries)
}

/// Shared binaries from `Meta/Binaries`, keyed by their `ID`.
fn read_binaries(root: Node<'_, '_>) -> Result<HashMap<String, Vec<u8>>> {
    let mut binaries = HashMap::new();
    let pool = child(root, "Meta").and_then(|meta| child(meta, "Binaries"));
    for binary in pool.into_iter().flat_map(|pool| children(pool, "Binary")) {
        let id = binary.attribute("ID").unwrap_or_default();
        let compressed = binary
            .attribute("Compressed")
            .is_some_and(|flag| flag.eq_ignore_ascii_case("true"));
        let data = decode_binary(binary.text().unwrap_or_default(), compressed)?;
        binaries.insert(id.to_string(), data);
    }
    Ok(binaries)
}

fn decode_binary(text: &str, compressed: bool) -> Result<Vec<u8>> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let raw = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| MigrationError::Format(format!("invalid attachment encoding: {}", e)))?;
    if !compressed {
        return Ok(raw);
    }
    let mut data = Vec::new();
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut data)
        .map_err(|e| MigrationError::Format(format!("invalid compressed attachment: {}", e)))?;
    Ok(data)
}

struct KeepassWalker<'o> {
    options: &'o KeepassOptions,
    binaries: HashMap<String, Vec<u8>>,
    entries: Vec<Entry>,
}

impl KeepassWalker<'_> {
    fn walk(&mut self, group: Node<'_, '_>, path: &str) -> Result<()> {
        for subgroup in children(group, "Group") {
            let name = child_text(subgroup, "Name").unwrap_or_default();
            self.walk(subgroup, &join(path, name))?;
        }

        for node in children(group, "Entry") {
            let mut entry = convert_entry(node, path);
            let title = entry.text(TITLE).unwrap_or_default();
            if !join(path, title).contains(self.options.root.as_str()) {
                debug!("Skipping entry outside of '{}'", self.options.root);
                continue;
            }

            if self.options.history {
                let history = child(node, "History");
                for snapshot in history.into_iter().flat_map(|h| children(h, "Entry")) {
                    self.entries
                        .push(convert_entry(snapshot, &join("History", path)));
                }
            }

            if self.options.attachments {
                let mut names = Vec::new();
                for binary in children(node, "Binary") {
                    let name = child_text(binary, "Key").unwrap_or_default();
                    let data = match child(binary, "Value") {
                        Some(value) => match value.attribute("Ref") {
                            Some(id) => self.binaries.get(id).cloned().unwrap_or_default(),
                            None => decode_binary(value.text().unwrap_or_default(), false)?,
                        },
                        None => Vec::new(),
                    };
                    let attachment: Entry = [
                        (GROUP, Value::from(path)),
                        (TITLE, Value::from(name)),
                        (DATA, Value::Bytes(data)),
                    ]
                    .into_iter()
                    .collect();
                    self.entries.push(attachment);
                    names.push(name);
                }
                if !names.is_empty() {
                    entry.set("attachments", names.join(", "));
                }
            }
            self.entries.push(entry);
        }
        Ok(())
    }
}

fn convert_entry(node: Node<'_, '_>, group: &str) -> Entry {
    let mut entry = Entry::new();
    for string in children(node, "String") {
        let key = child_text(string, "Key").unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        let value = child(string, "Value").map_or(Value::Null, text_value);
        entry.set(canonical(KEEPASS_KEYS, key), value);
    }
    if let Some(tags) = child_text(node, "Tags") {
        entry.set("tags", tags);
    }
    entry.set(GROUP, group);
    entry
}

const KEEPASSX_KEYS: KeyMap = &[
    ("title", "title"),
    ("password", "password"),
    ("login", "username"),
    ("url", "url"),
    ("comments", "comment"),
];

/// Importer for KeePassX 0.4 XML exports.
pub struct KeepassxImporter;

impl KeepassxImporter {
    fn walk(node: Node<'_, '_>, path: &str, entries: &mut Vec<Entry>) {
        for group in children(node, "group") {
            let name = child_text(group, "title").unwrap_or_default();
            Self::walk(group, &join(path, name), entries);
        }
        for item in children(node, "entry") {
            let mut entry = Entry::new();
            for field in item.children().filter(|n| n.is_element()) {
                let key = canonical(KEEPASSX_KEYS, field.tag_name().name());
                entry.set(key, text_value(field));
            }
            entry.set(GROUP, path);
            entries.push(entry);
        }
    }
}

impl Importer for KeepassxImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let text = source.read_text()?;
        let document = parse_document(&text)?;
        let root = expect_root(&document, "database")?;
        let mut entries = Vec::new();
        Self::walk(root, "", &mut entries);
        Ok(entries)
    }
}

const REVELATION_KEYS: KeyMap = &[
    ("title", "name"),
    ("password", "generic-password"),
    ("login", "generic-username"),
    ("url", "generic-hostname"),
    ("comments", "notes"),
    ("description", "description"),
];

/// Importer for Revelation XML exports.
pub struct RevelationImporter;

impl RevelationImporter {
    fn walk(node: Node<'_, '_>, path: &str, entries: &mut Vec<Entry>) {
        for item in children(node, "entry") {
            if item.attribute("type") == Some("folder") {
                let name = child_text(item, "name").unwrap_or_default();
                Self::walk(item, &join(path, name), entries);
                continue;
            }
            let mut entry = Entry::new();
            for field in item.children().filter(|n| n.is_element()) {
                let key = match field.tag_name().name() {
                    "field" => field.attribute("id").unwrap_or_default(),
                    tag => tag,
                };
                entry.set(canonical(REVELATION_KEYS, key), text_value(field));
            }
            entry.set(GROUP, path);
            entries.push(entry);
        }
    }
}

impl Importer for RevelationImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let text = source.read_text()?;
        let document = parse_document(&text)?;
        let root = expect_root(&document, "revelationdata")?;
        let mut entries = Vec::new();
        Self::walk(root, "", &mut entries);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const KEEPASS: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<KeePassFile>
  <Meta>
    <Binaries>
      <Binary ID="0" Compressed="True">@GZ@</Binary>
    </Binaries>
  </Meta>
  <Root>
    <Group>
      <Name>Root</Name>
      <Group>
        <Name>Emails</Name>
        <Entry>
          <UUID>AAAA</UUID>
          <String><Key>Title</Key><Value>mail</Value></String>
          <String><Key>UserName</Key><Value>jdoe</Value></String>
          <String><Key>Password</Key><Value>pw</Value></String>
          <String><Key>Notes</Key><Value /></String>
          <String><Key>pin</Key><Value>1234</Value></String>
          <Binary><Key>id.txt</Key><Value Ref="0" /></Binary>
          <History>
            <Entry>
              <String><Key>Title</Key><Value>mail</Value></String>
              <String><Key>Password</Key><Value>old</Value></String>
            </Entry>
          </History>
        </Entry>
      </Group>
      <Entry>
        <String><Key>Title</Key><Value>top</Value></String>
      </Entry>
    </Group>
  </Root>
</KeePassFile>"#;

    fn keepass_text() -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"attached").unwrap();
        let gz = encoder.finish().unwrap();
        KEEPASS.replace("@GZ@", &STANDARD.encode(gz))
    }

    #[test]
    fn test_keepass_xml_default() {
        let entries = parse_keepass(&keepass_text(), &KeepassOptions::default()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text("title"), Some("mail"));
        assert_eq!(entries[0].text("login"), Some("jdoe"));
        assert_eq!(entries[0].text("pin"), Some("1234"));
        assert_eq!(entries[0].get("comments"), Some(&Value::Null));
        assert_eq!(entries[0].text("group"), Some("Root/Emails"));
        assert_eq!(entries[1].text("group"), Some("Root"));
    }

    #[test]
    fn test_keepass_history_and_attachments() {
        let options = KeepassOptions {
            strip_root: true,
            history: true,
            attachments: true,
            root: String::new(),
        };
        let entries = parse_keepass(&keepass_text(), &options).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].text("group"), Some("History/Emails"));
        assert_eq!(entries[0].text("password"), Some("old"));
        assert_eq!(entries[1].get("data"), Some(&Value::Bytes(b"attached".to_vec())));
        assert_eq!(entries[1].text("title"), Some("id.txt"));
        assert_eq!(entries[2].text("attachments"), Some("id.txt"));
        assert_eq!(entries[2].text("group"), Some("Emails"));
        assert_eq!(entries[3].text("group"), Some(""));
    }

    #[test]
    fn test_keepass_root_filter() {
        let options = KeepassOptions {
            root: "Emails".to_string(),
            ..KeepassOptions::default()
        };
        let entries = parse_keepass(&keepass_text(), &options).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text("title"), Some("mail"));
    }

    #[test]
    fn test_keepass_wrong_root() {
        let err = parse_keepass("<database/>", &KeepassOptions::default()).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_keepassx() {
        let text = r#"<!DOCTYPE KEEPASSX_DATABASE>
<database>
  <group>
    <title>Internet</title>
    <entry>
      <title>site</title>
      <username>jdoe</username>
      <password>pw</password>
      <comment>note</comment>
    </entry>
    <group>
      <title>Mail</title>
      <entry><title>inbox</title></entry>
    </group>
  </group>
</database>"#;
        let entries = KeepassxImporter
            .parse(&Source::memory(text.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text("title"), Some("inbox"));
        assert_eq!(entries[0].text("group"), Some("Internet/Mail"));
        assert_eq!(entries[1].text("login"), Some("jdoe"));
        assert_eq!(entries[1].text("comments"), Some("note"));
        assert_eq!(entries[1].text("group"), Some("Internet"));
    }

    #[test]
    fn test_revelation() {
        let text = r#"<?xml version="1.0" encoding="utf-8" ?>
<revelationdata version="0.4.14" dataversion="1">
  <entry type="folder">
    <name>Servers</name>
    <entry type="generic">
      <name>ssh</name>
      <description>box</description>
      <field id="generic-hostname">example.org</field>
      <field id="generic-username">root</field>
      <field id="generic-password">pw</field>
    </entry>
  </entry>
</revelationdata>"#;
        let entries = RevelationImporter
            .parse(&Source::memory(text.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.text("title"), Some("ssh"));
        assert_eq!(entry.text("url"), Some("example.org"));
        assert_eq!(entry.text("login"), Some("root"));
        assert_eq!(entry.text("group"), Some("Servers"));
    }
}
