//! JSON based importers: Bitwarden, Dashlane, Enpass 6, Passman, 1Password
//! 1PIF and the JSON embedded in Clipperz HTML exports.

use super::{canonical, is_truthy, json_str, Importer, KeyMap};
use crate::entry::{Entry, Value, COMMENTS, GROUP, OTPAUTH, TITLE, URL};
use crate::formats::json::pif_to_json;
use crate::formats::xml::{find_all, parse_document};
use crate::formats::Source;
use crate::groups::FolderTree;
use crate::otp::OtpParams;
use crate::{MigrationError, Result};
use serde_json::Value as Json;

fn load(source: &Source) -> Result<Json> {
    Ok(serde_json::from_str(&source.read_text()?)?)
}

fn items<'a>(data: &'a Json, key: &str) -> &'a [Json] {
    data.get(key)
        .and_then(Json::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

const BITWARDEN_KEYS: KeyMap = &[
    ("title", "name"),
    ("password", "password"),
    ("login", "username"),
    ("url", "uris"),
    ("otpauth", "totp"),
    ("comments", "notes"),
];

const BITWARDEN_IGNORE: &[&str] = &[
    "login",
    "id",
    "folderId",
    "collectionIds",
    "organizationId",
    "type",
    "favorite",
    "secureNote",
];

/// Set `key` unless the entry already has it, in which case `key_` is used.
fn set_unique(entry: &mut Entry, key: &str, value: &Json) {
    if !is_truthy(value) {
        return;
    }
    let key = if entry.contains(key) {
        format!("{}_", key)
    } else {
        key.to_string()
    };
    entry.set(key, Value::from_json(value));
}

/// Importer for Bitwarden JSON exports.
pub struct BitwardenImporter;

impl Importer for BitwardenImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let data = load(source)?;
        let mut folders = FolderTree::new();
        for folder in items(&data, "folders") {
            folders.insert(json_str(folder, "id"), json_str(folder, "name"), "");
        }

        let mut entries = Vec::new();
        for item in items(&data, "items") {
            let mut entry = Entry::new();
            entry.set(GROUP, json_str(item, "folderId"));

            let mut fields: Vec<(&String, &Json)> = item
                .as_object()
                .map(|map| map.iter().collect())
                .unwrap_or_default();
            if let Some(login) = item.get("login").and_then(Json::as_object) {
                fields.extend(login.iter());
            }

            let mut uris: &[Json] = &[];
            for (key, value) in fields {
                if BITWARDEN_IGNORE.contains(&key.as_str()) {
                    continue;
                }
                match key.as_str() {
                    "fields" => {
                        for field in value.as_array().map(Vec::as_slice).unwrap_or_default() {
                            let name = json_str(field, "name");
                            set_unique(&mut entry, name, field.get("value").unwrap_or(&Json::Null));
                        }
                    }
                    "card" | "identity" => {
                        if let Some(nested) = value.as_object() {
                            for (name, nested_value) in nested {
                                set_unique(&mut entry, name, nested_value);
                            }
                        }
                    }
                    "uris" => uris = value.as_array().map(Vec::as_slice).unwrap_or_default(),
                    _ => {
                        if is_truthy(value) {
                            entry.set(canonical(BITWARDEN_KEYS, key), Value::from_json(value));
                        }
                    }
                }
            }

            for (index, uri) in uris.iter().enumerate() {
                let key = if index == 0 {
                    URL.to_string()
                } else {
                    format!("{}{}", URL, index + 1)
                };
                entry.set(key, json_str(uri, "uri"));
            }
            entries.push(entry);
        }
        folders.assign(&mut entries)?;
        Ok(entries)
    }
}

const DASHLANE_KEYS: KeyMap = &[
    ("title", "title"),
    ("password", "password"),
    ("email", "email"),
    ("login", "login"),
    ("url", "domain"),
    ("comments", "note"),
];

/// Importer for Dashlane JSON exports.
pub struct DashlaneImporter;

impl Importer for DashlaneImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let data = load(source)?;
        Ok(items(&data, "AUTHENTIFIANT")
            .iter()
            .map(|item| object_entry(item, DASHLANE_KEYS, &[]))
            .collect())
    }
}

/// Map every field of a JSON object through `keys`, skipping `ignore`.
fn object_entry(item: &Json, keys: KeyMap, ignore: &[&str]) -> Entry {
    let mut entry = Entry::new();
    if let Some(map) = item.as_object() {
        for (key, value) in map {
            if !ignore.contains(&key.as_str()) {
                entry.set(canonical(keys, key), Value::from_json(value));
            }
        }
    }
    entry
}

const ENPASS6_KEYS: KeyMap = &[
    ("title", "title"),
    ("password", "password"),
    ("login", "username"),
    ("url", "website"),
    ("comments", "note"),
    ("group", "group"),
    ("email", "e-mail"),
];

/// Importer for Enpass 6 JSON exports.
pub struct Enpass6Importer;

impl Importer for Enpass6Importer {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let data = load(source)?;
        let mut folders = FolderTree::new();
        for folder in items(&data, "folders") {
            folders.insert(
                json_str(folder, "uuid"),
                json_str(folder, "title"),
                json_str(folder, "parent_uuid"),
            );
        }

        let mut entries = Vec::new();
        for item in items(&data, "items") {
            let mut entry = object_entry(item, ENPASS6_KEYS, &["fields", "folders", "icon"]);
            let folder = items(item, "folders")
                .first()
                .and_then(Json::as_str)
                .unwrap_or_default();
            entry.set(GROUP, folder);
            for field in items(item, "fields") {
                let label = json_str(field, "label").to_lowercase();
                entry.set(canonical(ENPASS6_KEYS, &label), json_str(field, "value"));
            }
            entries.push(entry);
        }
        folders.assign(&mut entries)?;
        Ok(entries)
    }
}

const PASSMAN_KEYS: KeyMap = &[
    ("title", "label"),
    ("login", "username"),
    ("comments", "description"),
    ("otpauth", "otp"),
];

/// Importer for Passman JSON exports.
pub struct PassmanImporter;

impl Importer for PassmanImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let data = load(source)?;
        let list = data
            .as_array()
            .ok_or_else(|| MigrationError::Format("expected a list of credentials".to_string()))?;

        let mut entries = Vec::new();
        for item in list {
            let mut entry = object_entry(item, PASSMAN_KEYS, &["custom_fields", "icon", "tags", "otp"]);
            if let Some(tag) = items(item, "tags").first() {
                entry.set(GROUP, json_str(tag, "text").replace('\\', "/"));
            }
            for field in items(item, "custom_fields") {
                let value = field.get("value").unwrap_or(&Json::Null);
                entry.set(json_str(field, "label"), Value::from_json(value));
            }
            if let Some(otp) = item.get("otp").filter(|otp| is_truthy(otp)) {
                let secret = json_str(otp, "secret");
                if !secret.is_empty() {
                    let mut params = OtpParams::new(json_str(item, "label"), secret);
                    params.issuer = Some(json_str(otp, "issuer").to_string());
                    entry.set(OTPAUTH, params.to_uri());
                }
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

const PIF_KEYS: KeyMap = &[
    ("title", "title"),
    ("password", "password"),
    ("login", "username"),
    ("url", "location"),
    ("comments", "notesPlain"),
    ("group", "folderUuid"),
];

const PIF_IGNORE: &[&str] = &["keyID", "typeName", "uuid", "openContents", "URLs", "secureContents"];

/// Importer for 1Password 4 interchange files.
pub struct PifImporter;

impl Importer for PifImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let data = pif_to_json(&source.read_text()?)?;
        if !data.as_array().is_some_and(|items| !items.is_empty()) {
            return Err(MigrationError::Format("no 1PIF records".to_string()));
        }
        let mut folders = FolderTree::new();
        let mut entries = Vec::new();
        for item in data.as_array().map(Vec::as_slice).unwrap_or_default() {
            match json_str(item, "typeName") {
                "system.folder.Regular" => folders.insert(
                    json_str(item, "uuid"),
                    json_str(item, "title"),
                    json_str(item, "folderUuid"),
                ),
                "webforms.WebForm" => {
                    let mut entry = Entry::new();
                    let secure = item.get("secureContents").unwrap_or(&Json::Null);
                    for field in items(secure, "fields") {
                        let name = match json_str(field, "name") {
                            "" => json_str(field, "designation"),
                            name => name,
                        };
                        entry.set(canonical(PIF_KEYS, name), json_str(field, "value"));
                    }
                    if let Some(map) = secure.as_object() {
                        for (key, value) in map.iter().filter(|(key, _)| *key != "fields") {
                            entry.set(canonical(PIF_KEYS, key), Value::from_json(value));
                        }
                    }
                    if let Some(map) = item.as_object() {
                        for (key, value) in map {
                            if !PIF_IGNORE.contains(&key.as_str()) {
                                entry.set(canonical(PIF_KEYS, key), Value::from_json(value));
                            }
                        }
                    }
                    entries.push(entry);
                }
                _ => {}
            }
        }
        folders.assign(&mut entries)?;
        Ok(entries)
    }
}

const CLIPPERZ_KEYS: KeyMap = &[("login", "username")];

/// Separator between title and folder in Clipperz card labels.
const CLIPPERZ_LABEL_SEPARATOR: &str = " \u{e009}";

/// Importer for Clipperz HTML exports, which embed the cards as JSON.
pub struct ClipperzImporter;

impl Importer for ClipperzImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let text = source.read_text()?;
        let document = parse_document(&text)?;
        let found = find_all(document.root_element(), "body/div/div/textarea");
        let payload = found
            .first()
            .and_then(|node| node.text())
            .ok_or_else(|| MigrationError::Format("no Clipperz data block".to_string()))?;

        let cards: Json = serde_json::from_str(payload)?;
        let mut entries = Vec::new();
        for card in cards.as_array().map(Vec::as_slice).unwrap_or_default() {
            let mut entry = Entry::new();
            let label = card
                .get("label")
                .and_then(Json::as_str)
                .unwrap_or(CLIPPERZ_LABEL_SEPARATOR);
            let mut parts = label.split(CLIPPERZ_LABEL_SEPARATOR);
            entry.set(TITLE, parts.next().unwrap_or_default());
            if let Some(group) = parts.next() {
                entry.set(GROUP, group);
            }

            let fields = card
                .get("currentVersion")
                .and_then(|version| version.get("fields"))
                .and_then(Json::as_object);
            for field in fields.into_iter().flat_map(|map| map.values()) {
                let label = json_str(field, "label");
                entry.set(canonical(CLIPPERZ_KEYS, label), json_str(field, "value"));
            }

            let notes = card
                .get("data")
                .map(|data| json_str(data, "notes"))
                .unwrap_or_default();
            entry.set(COMMENTS, notes);
            entries.push(entry);
        }
        Ok(entries)
    }
}
