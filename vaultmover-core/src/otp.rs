//! One-time password provisioning URIs (`otpauth://`).

use crate::{MigrationError, Result};
use data_encoding::{BASE32, BASE32_NOPAD};

pub const SCHEME: &str = "otpauth://";

/// Parsed provisioning data from an `otpauth://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOtpUri {
    /// `totp` or `hotp`.
    pub kind: String,
    pub label: String,
    pub secret_base32: String,
    pub issuer: Option<String>,
    pub account_name: Option<String>,
    pub algorithm: Option<String>,
    pub digits: Option<u8>,
    pub period: Option<u32>,
    pub counter: Option<u64>,
}

/// Parameters for building an `otpauth://` URI.
#[derive(Debug, Clone, Default)]
pub struct OtpParams {
    pub kind: String,
    pub label: String,
    pub secret: String,
    pub issuer: Option<String>,
    pub algorithm: Option<String>,
    pub digits: Option<String>,
    pub counter: Option<String>,
    pub period: Option<String>,
}

impl OtpParams {
    pub fn new(label: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            kind: "totp".to_string(),
            label: label.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn to_uri(&self) -> String {
        let kind = if self.kind.is_empty() {
            "totp".to_string()
        } else {
            self.kind.to_ascii_lowercase()
        };
        let mut uri = format!(
            "{}{}/{}?secret={}",
            SCHEME,
            kind,
            urlencoding::encode(&self.label),
            urlencoding::encode(&self.secret)
        );
        let optional = [
            ("issuer", &self.issuer),
            ("algorithm", &self.algorithm),
            ("digits", &self.digits),
            ("counter", &self.counter),
            ("period", &self.period),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                uri.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
            }
        }
        uri
    }
}

/// Expand a bare secret into a TOTP URI labelled `label`. Values that are
/// already URIs are returned unchanged.
pub fn shorthand_to_uri(value: &str, label: &str) -> String {
    let trimmed = value.trim();
    if trimmed.starts_with(SCHEME) {
        return trimmed.to_string();
    }
    let secret: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    OtpParams::new(label, secret).to_uri()
}

/// Base32 text for a raw secret, padded as authenticator exports expect.
pub fn encode_secret(secret: &[u8]) -> String {
    BASE32.encode(secret)
}

/// Parse an `otpauth://totp/...` or `otpauth://hotp/...` URI.
pub fn parse_otpauth_uri(uri: &str) -> Result<ParsedOtpUri> {
    let trimmed = uri.trim();
    let (scheme, rest) = trimmed.split_once("://").ok_or_else(|| {
        MigrationError::Format("OTP URI must start with otpauth://".to_string())
    })?;
    if !scheme.eq_ignore_ascii_case("otpauth") {
        return Err(MigrationError::Format(
            "OTP URI must start with otpauth://".to_string(),
        ));
    }

    let (kind, remainder) = rest
        .split_once('/')
        .ok_or_else(|| MigrationError::Format("Invalid otpauth URI format".to_string()))?;
    let kind = kind.to_ascii_lowercase();
    if kind != "totp" && kind != "hotp" {
        return Err(MigrationError::Format(format!(
            "Unsupported OTP type '{}'",
            kind
        )));
    }

    let (label_raw, query_raw) = remainder.split_once('?').unwrap_or((remainder, ""));
    let label = percent_decode(label_raw)?;
    let (issuer_from_label, account_name) = match label.split_once(':') {
        Some((issuer, account)) => (non_empty(issuer), non_empty(account)),
        None => (None, non_empty(&label)),
    };

    let mut parsed = ParsedOtpUri {
        kind,
        label: label.clone(),
        secret_base32: String::new(),
        issuer: None,
        account_name,
        algorithm: None,
        digits: None,
        period: None,
        counter: None,
    };

    for pair in query_raw.split('&').filter(|part| !part.is_empty()) {
        let (key_raw, value_raw) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(key_raw)?.to_ascii_lowercase();
        let value = percent_decode(value_raw)?;
        if value.trim().is_empty() {
            continue;
        }
        match key.as_str() {
            "secret" => parsed.secret_base32 = normalize_secret(&value)?,
            "issuer" => parsed.issuer = Some(value),
            "algorithm" => parsed.algorithm = Some(value.to_ascii_uppercase()),
            "digits" => parsed.digits = Some(parse_number(&value, "digits")?),
            "period" => parsed.period = Some(parse_number(&value, "period")?),
            "counter" => parsed.counter = Some(parse_number(&value, "counter")?),
            _ => {}
        }
    }

    if parsed.secret_base32.is_empty() {
        return Err(MigrationError::Format(
            "OTP URI is missing secret parameter".to_string(),
        ));
    }
    if parsed.issuer.is_none() {
        parsed.issuer = issuer_from_label;
    }
    Ok(parsed)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| MigrationError::Format(format!("OTP {} must be numeric", name)))
}

/// Uppercase a base32 secret, dropping spaces and dashes, and check that it
/// decodes.
pub fn normalize_secret(secret_base32: &str) -> Result<String> {
    let normalized = secret_base32
        .trim()
        .replace([' ', '-'], "")
        .to_ascii_uppercase();

    if normalized.is_empty() {
        return Err(MigrationError::Format(
            "OTP secret cannot be empty".to_string(),
        ));
    }

    BASE32_NOPAD
        .decode(normalized.as_bytes())
        .or_else(|_| BASE32.decode(normalized.as_bytes()))
        .map_err(|_| MigrationError::Format("OTP secret must be valid base32".to_string()))?;
    Ok(normalized)
}

fn percent_decode(input: &str) -> Result<String> {
    let spaced = input.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| MigrationError::Format("OTP URI contains invalid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_otpauth_uri_with_all_fields() {
        let parsed = parse_otpauth_uri(
            "otpauth://totp/GitHub:alice%40example.com?secret=JBSWY3DPEHPK3PXP&issuer=GitHub&algorithm=SHA256&digits=8&period=60",
        )
        .unwrap();
        assert_eq!(parsed.kind, "totp");
        assert_eq!(parsed.secret_base32, "JBSWY3DPEHPK3PXP");
        assert_eq!(parsed.issuer.as_deref(), Some("GitHub"));
        assert_eq!(parsed.account_name.as_deref(), Some("alice@example.com"));
        assert_eq!(parsed.algorithm.as_deref(), Some("SHA256"));
        assert_eq!(parsed.digits, Some(8));
        assert_eq!(parsed.period, Some(60));
    }

    #[test]
    fn test_parse_otpauth_uri_defaults() {
        let parsed = parse_otpauth_uri("otpauth://hotp/bob?secret=jbsw y3dp ehpk 3pxp&counter=4")
            .unwrap();
        assert_eq!(parsed.kind, "hotp");
        assert_eq!(parsed.secret_base32, "JBSWY3DPEHPK3PXP");
        assert_eq!(parsed.counter, Some(4));
        assert_eq!(parsed.issuer, None);
        assert_eq!(parsed.digits, None);
    }

    #[test]
    fn test_parse_rejects_bad_uris() {
        assert!(parse_otpauth_uri("https://example.com").is_err());
        assert!(parse_otpauth_uri("otpauth://totp/label").is_err());
        assert!(parse_otpauth_uri("otpauth://steam/label?secret=JBSWY3DP").is_err());
        assert!(parse_otpauth_uri("otpauth://totp/label?secret=!!!").is_err());
    }

    #[test]
    fn test_build_uri_round_trips() {
        let mut params = OtpParams::new("Example Site", "JBSWY3DPEHPK3PXP");
        params.issuer = Some("Example".to_string());
        params.digits = Some("6".to_string());
        let uri = params.to_uri();
        assert_eq!(
            uri,
            "otpauth://totp/Example%20Site?secret=JBSWY3DPEHPK3PXP&issuer=Example&digits=6"
        );
        let parsed = parse_otpauth_uri(&uri).unwrap();
        assert_eq!(parsed.label, "Example Site");
        assert_eq!(parsed.issuer.as_deref(), Some("Example"));
    }

    #[test]
    fn test_shorthand_to_uri() {
        assert_eq!(
            shorthand_to_uri("JBSW Y3DP", "mysite"),
            "otpauth://totp/mysite?secret=JBSWY3DP"
        );
        let uri = "otpauth://totp/x?secret=JBSWY3DP";
        assert_eq!(shorthand_to_uri(uri, "ignored"), uri);
    }

    #[test]
    fn test_encode_secret() {
        assert_eq!(encode_secret(b"Hello!"), "JBSWY3DPEE======");
    }
}
