use super::*;
use crate::managers::ManagerSettings;
use std::path::PathBuf;
use tempfile::TempDir;

const LASTPASS_CSV: &str = "url,username,password,extra,name,grouping,fav
https://twitter.com,jdoe,pw1,,twitter,Social,0
https://mail.example.com,jane,pw2,note,mail,Emails,1
";

const CHROME_CSV: &str = "name,url,username,password
twitter.com,https://twitter.com/login,jdoe,pw1
";

const BITWARDEN_NOTES_CSV: &str = "folder,favorite,type,name,notes,fields,reprompt,login_uri,login_username,login_password,login_totp
Dev,,login,github,\"ssh config:
[core]
editor = vim
}\",,0,https://github.com,jdoe,pw1,
Dev,,login,gitlab,\"{\"\"theme\"\": \"\"dark\"\"}\",,0,https://gitlab.com,jdoe,pw2,
";

const CHROME_BRACKETS_CSV: &str = "name,url,username,password
[Work] mail,https://mail.example.com,jdoe,pw1
{home} router,http://192.168.1.1,admin,pw2
";

const JSON_ROWS_CSV: &str = r#"name,url,username,password
{"name": "twitter", "url": "https://twitter.com", "username": "jdoe", "password": "pw1"}
{"name": "mail", "url": "https://mail.com", "username": "jane", "password": "pw2"}
"#;

const BITWARDEN_JSON: &str = r#"{
  "folders": [{"id": "f1", "name": "Social"}],
  "items": [
    {"id": "i1", "folderId": "f1", "type": 1, "name": "twitter", "favorite": false,
     "login": {"username": "jdoe", "password": "pw1"}}
  ]
}"#;

const AEGIS_JSON: &str = r#"{
  "version": 1,
  "header": {"slots": null, "params": null},
  "db": {
    "version": 1,
    "entries": [
      {"type": "totp", "uuid": "u1", "name": "jdoe", "issuer": "GitHub",
       "info": {"secret": "JBSWY3DPEHPK3PXP", "algo": "SHA1", "digits": 6, "period": 30}}
    ]
  }
}"#;

const OTP_LIST_JSON: &str = r#"[
  {"secret": "JBSWY3DPEHPK3PXP", "label": "GitHub", "digits": 6, "type": "TOTP",
   "algorithm": "SHA1", "thumbnail": "Default", "last_used": 0, "tags": []}
]"#;

const KEEPASS_XML: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<KeePassFile>
  <Root><Group><Name>Root</Name></Group></Root>
</KeePassFile>
"#;

const KEEPASSX_XML: &str = r#"<!DOCTYPE KEEPASSX_DATABASE>
<database>
  <group><title>Internet</title></group>
</database>
"#;

const PASSPIE_YAML: &str = "handler: passpie
version: 1.0
credentials:
- name: twitter.com
  login: jdoe
  password: pw1
  comment: ''
";

const PIF: &str = r#"{"uuid":"a1","typeName":"webforms.WebForm","title":"twitter","secureContents":{"fields":[]}}
***5642bee8-a5ff-11dc-8314-0800200c9a66***
"#;

const KDBX_MAGIC: &[u8] = &[0x03, 0xD9, 0xA2, 0x9A, 0x67, 0xFB, 0x4B, 0xB5];

struct Fixtures {
    dir: TempDir,
}

impl Fixtures {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn file(&self, name: &str, content: &[u8]) -> Source {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        Source::path(path)
    }

    fn missing(&self) -> Source {
        Source::path(self.dir.path().join("missing.csv"))
    }
}

fn class_name(descriptor: Option<&Descriptor>) -> Option<&'static str> {
    descriptor.map(|d| d.class_name)
}

#[test]
fn test_default_adapter() {
    let catalogue = Catalogue::builtin();
    let detect = AutoDetect::new(&catalogue);
    assert_eq!(detect.default("bitwarden").unwrap().class_name, "BitwardenCSV");
    assert_eq!(detect.default("keepass").unwrap().class_name, "KeepassKDBX");
    assert_eq!(detect.default("1password").unwrap().class_name, "OnePasswordCSV");
}

#[test]
fn test_default_unknown_manager() {
    let catalogue = Catalogue::builtin();
    let err = AutoDetect::new(&catalogue).default("nosuchmanager").unwrap_err();
    assert!(matches!(err, MigrationError::NoDefaultManager(ref name) if name == "nosuchmanager"));
}

#[test]
fn test_format_single_candidate_needs_no_source() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let detect = AutoDetect::new(&catalogue);
    let found = detect.format("passpie", &fixtures.missing()).unwrap();
    assert_eq!(found.class_name, "Passpie");
    let found = detect
        .format("pass", &Source::path(PathBuf::from("/nonexistent/store")))
        .unwrap();
    assert_eq!(found.class_name, "PasswordStore");
}

#[test]
fn test_format_unreadable_source_uses_default() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let found = AutoDetect::new(&catalogue)
        .format("bitwarden", &fixtures.missing())
        .unwrap();
    assert_eq!(found.class_name, "BitwardenCSV");
}

#[test]
fn test_format_picks_matching_variant() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let detect = AutoDetect::new(&catalogue);

    let json = fixtures.file("bitwarden.json", BITWARDEN_JSON.as_bytes());
    assert_eq!(detect.format("bitwarden", &json).unwrap().class_name, "BitwardenJSON");

    let xml = fixtures.file("keepass.xml", KEEPASS_XML.as_bytes());
    assert_eq!(detect.format("keepass", &xml).unwrap().class_name, "KeepassXML");

    let kdbx = fixtures.file("keepass.kdbx", KDBX_MAGIC);
    assert_eq!(detect.format("keepass", &kdbx).unwrap().class_name, "KeepassKDBX");

    let pif = fixtures.file("export.1pif", PIF.as_bytes());
    assert_eq!(detect.format("1password", &pif).unwrap().class_name, "OnePassword4PIF");
}

#[test]
fn test_format_without_match_uses_default() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let source = fixtures.file("notes.txt", b"nothing to see here\n");
    let found = AutoDetect::new(&catalogue).format("dashlane", &source).unwrap();
    assert_eq!(found.class_name, "DashlaneCSV");
}

#[test]
fn test_format_reads_memory_source() {
    let catalogue = Catalogue::builtin();
    let source = Source::memory(BITWARDEN_JSON.as_bytes().to_vec());
    let found = AutoDetect::new(&catalogue).format("bitwarden", &source).unwrap();
    assert_eq!(found.class_name, "BitwardenJSON");
}

#[test]
fn test_manager_csv() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let detect = AutoDetect::new(&catalogue);

    let lastpass = fixtures.file("lastpass.csv", LASTPASS_CSV.as_bytes());
    assert_eq!(class_name(detect.manager(&lastpass)), Some("LastpassCSV"));

    let chrome = fixtures.file("chrome.csv", CHROME_CSV.as_bytes());
    assert_eq!(class_name(detect.manager(&chrome)), Some("ChromeCSV"));
}

#[test]
fn test_manager_custom_delimiter() {
    let catalogue = Catalogue::builtin();
    let source = Source::memory(LASTPASS_CSV.replace(',', ";").into_bytes());
    assert_eq!(class_name(AutoDetect::new(&catalogue).manager(&source)), None);
    let found = AutoDetect::new(&catalogue).delimiter(b';').manager(&source);
    assert_eq!(class_name(found), Some("LastpassCSV"));
}

#[test]
fn test_manager_structured_formats() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let detect = AutoDetect::new(&catalogue);

    let cases = [
        ("bitwarden.json", BITWARDEN_JSON, "BitwardenJSON"),
        ("aegis.json", AEGIS_JSON, "Aegis"),
        ("keepass.xml", KEEPASS_XML, "KeepassXML"),
        ("keepassx.xml", KEEPASSX_XML, "KeepassxXML"),
        ("passpie.yml", PASSPIE_YAML, "Passpie"),
    ];
    for (name, content, expected) in cases {
        let source = fixtures.file(name, content.as_bytes());
        assert_eq!(class_name(detect.manager(&source)), Some(expected), "{name}");
    }
}

#[test]
fn test_manager_kdbx_signature() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let source = fixtures.file("db.kdbx", KDBX_MAGIC);
    let found = AutoDetect::new(&catalogue).manager(&source);
    assert_eq!(class_name(found), Some("KeepassKDBX"));
}

#[test]
fn test_manager_first_registered_wins() {
    // andOTP and Gnome Authenticator share the same backup layout.
    let catalogue = Catalogue::builtin();
    let source = Source::memory(OTP_LIST_JSON.as_bytes().to_vec());
    let found = AutoDetect::new(&catalogue).manager(&source);
    assert_eq!(class_name(found), Some("AndOTP"));
}

#[test]
fn test_manager_no_match() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let detect = AutoDetect::new(&catalogue);

    let text = fixtures.file("notes.txt", b"nothing to see here\n");
    assert!(detect.manager(&text).is_none());
    assert!(detect.manager(&fixtures.missing()).is_none());

    let unknown_json = fixtures.file("other.json", br#"{"hello": "world"}"#);
    assert!(detect.manager(&unknown_json).is_none());

    let directory = Source::path(fixtures.dir.path());
    assert!(detect.manager(&directory).is_none());
}

#[test]
fn test_manager_csv_with_bracketed_cells() {
    let catalogue = Catalogue::builtin();
    let fixtures = Fixtures::new();
    let detect = AutoDetect::new(&catalogue);

    let bitwarden = fixtures.file("bitwarden.csv", BITWARDEN_NOTES_CSV.as_bytes());
    assert_eq!(class_name(detect.manager(&bitwarden)), Some("BitwardenCSV"));

    let chrome = fixtures.file("chrome.csv", CHROME_BRACKETS_CSV.as_bytes());
    assert_eq!(class_name(detect.manager(&chrome)), Some("ChromeCSV"));
}

#[test]
fn test_manager_rejects_json_rows_under_csv_header() {
    let catalogue = Catalogue::builtin();
    let source = Source::memory(JSON_ROWS_CSV.as_bytes().to_vec());
    let found = AutoDetect::new(&catalogue).manager(&source);
    assert_ne!(found.map(|d| d.format), Some(Format::Csv));
}

#[test]
fn test_every_importer_rejects_empty_input() {
    let catalogue = Catalogue::builtin();
    let settings = ManagerSettings {
        cols: "title,login".to_string(),
        ..ManagerSettings::default()
    };
    let empty = Source::memory(Vec::new());
    for descriptor in catalogue.iter().filter(|d| d.cap.contains(Cap::IMPORT)) {
        let importer = descriptor.importer(&settings).unwrap();
        let err = importer.parse(&empty).unwrap_err();
        assert!(err.is_format_error(), "{}: {}", descriptor.class_name, err);
    }
}

#[test]
fn test_headerless_and_pif_reject_plain_text() {
    let catalogue = Catalogue::builtin();
    let settings = ManagerSettings::default();
    let text = Source::memory(b"hello world\n".to_vec());
    for class_name in ["DashlaneCSV", "KeeperCSV", "UPM", "OnePassword4PIF"] {
        let descriptor = catalogue.get(class_name, None, None, Cap::IMPORT).unwrap();
        let err = descriptor.importer(&settings).unwrap().parse(&text).unwrap_err();
        assert!(err.is_format_error(), "{class_name}");
    }
}
