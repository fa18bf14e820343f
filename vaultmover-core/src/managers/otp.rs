//! Authenticator app exports: andOTP, Gnome Authenticator, Aegis and FreeOTP+.

use super::{json_str, Importer};
use crate::entry::{Entry, OTPAUTH, TITLE};
use crate::formats::Source;
use crate::otp::{encode_secret, OtpParams};
use crate::{MigrationError, Result};
use serde_json::Value as Json;

/// Label used for every generated URI; the account name goes in `issuer`.
const URI_LABEL: &str = "totp-secret";

/// Lowercased text form of a scalar, empty when absent or null.
fn lower_text(item: &Json, key: &str) -> String {
    match item.get(key) {
        None | Some(Json::Null) => String::new(),
        Some(Json::String(text)) => text.to_lowercase(),
        Some(other) => other.to_string().to_lowercase(),
    }
}

/// Text form of an optional scalar setting such as `digits` or `period`.
fn setting(item: &Json, key: &str) -> Option<String> {
    match item.get(key)? {
        Json::Null => None,
        Json::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn otp_uri(item: &Json, secret: &str, issuer: &str) -> String {
    let mut params = OtpParams::new(URI_LABEL, secret);
    params.kind = json_str(item, "type").to_lowercase();
    params.issuer = Some(issuer.to_string());
    params.algorithm = setting(item, "algorithm");
    params.digits = setting(item, "digits");
    params.counter = setting(item, "counter");
    params.period = setting(item, "period");
    params.to_uri()
}

fn load(source: &Source) -> Result<Json> {
    Ok(serde_json::from_str(&source.read_text()?)?)
}

/// Importer for andOTP plain backups. Gnome Authenticator writes the same
/// layout.
pub struct AndOtpImporter;

impl Importer for AndOtpImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let data = load(source)?;
        let items = data
            .as_array()
            .ok_or_else(|| MigrationError::Format("expected a list of tokens".to_string()))?;

        let mut entries = Vec::new();
        for item in items {
            let label = json_str(item, "label");
            let mut entry = Entry::new();
            entry.set(TITLE, label);
            entry.set(OTPAUTH, otp_uri(item, json_str(item, "secret"), label));
            for key in ["type", "thumbnail", "last_used"] {
                entry.set(key, lower_text(item, key));
            }
            let tags: Vec<&str> = item
                .get("tags")
                .and_then(Json::as_array)
                .map(|tags| tags.iter().filter_map(Json::as_str).collect())
                .unwrap_or_default();
            entry.set("tags", tags.join(", "));
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Importer for Aegis plain (unencrypted) exports.
pub struct AegisImporter;

impl Importer for AegisImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let mut data = load(source)?;
        if let Some(db) = data.get_mut("db").map(Json::take) {
            data = db;
        }
        if data.is_string() {
            return Err(MigrationError::Format(
                "encrypted Aegis vaults are not supported, export a plain backup".to_string(),
            ));
        }

        let mut entries = Vec::new();
        for item in data.get("entries").and_then(Json::as_array).into_iter().flatten() {
            let mut merged = item.as_object().cloned().unwrap_or_default();
            if let Some(Json::Object(info)) = merged.remove("info") {
                merged.extend(info);
            }
            if let Some(algo) = merged.remove("algo") {
                merged.insert("algorithm".to_string(), algo);
            }
            let merged = Json::Object(merged);

            let title = format!("{}{}", json_str(&merged, "issuer"), json_str(&merged, "name"));
            let mut entry = Entry::new();
            entry.set(OTPAUTH, otp_uri(&merged, json_str(&merged, "secret"), &title));
            entry.set(TITLE, title);
            for key in ["group", "type", "icon"] {
                entry.set(key, lower_text(&merged, key));
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Importer for FreeOTP+ JSON exports. Secrets are stored as signed bytes.
pub struct FreeOtpPlusImporter;

impl Importer for FreeOtpPlusImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let data = load(source)?;
        let tokens = data
            .get("tokens")
            .and_then(Json::as_array)
            .ok_or_else(|| MigrationError::Format("no FreeOTP+ tokens".to_string()))?;

        let mut entries = Vec::new();
        for token in tokens {
            let bytes: Vec<u8> = token
                .get("secret")
                .and_then(Json::as_array)
                .map(|raw| {
                    raw.iter()
                        .filter_map(Json::as_i64)
                        .map(|x| (x & 0xff) as u8)
                        .collect()
                })
                .unwrap_or_default();

            let mut item = token.clone();
            if let (Some(map), Some(algo)) = (item.as_object_mut(), token.get("algo")) {
                map.insert("algorithm".to_string(), algo.clone());
            }
            let issuer = json_str(token, "issuerExt");
            let mut entry = Entry::new();
            entry.set(TITLE, issuer);
            entry.set(OTPAUTH, otp_uri(&item, &encode_secret(&bytes), issuer));
            entry.set("type", lower_text(token, "type"));
            entries.push(entry);
        }
        Ok(entries)
    }
}
