//! The built-in adapters, in detection order.

use super::csv::{self as layouts, enpass_header, CsvLayout};
use super::ManagerKind;
use crate::catalogue::{Cap, CatalogueBuilder, Descriptor};
use crate::formats::json::JsonShape;
use crate::formats::{Format, Header};
use serde_json::json;

fn csv(class_name: &'static str, name: &'static str, layout: &'static CsvLayout) -> Descriptor {
    let header = match layout.fieldnames {
        Some(_) => Header::None,
        None => Header::Csv(layout.columns()),
    };
    Descriptor::new(class_name, name, Format::Csv, ManagerKind::CsvTable(layout)).header(header)
}

fn otp_list_header() -> Header {
    Header::Json(JsonShape::array(JsonShape::object(vec![
        ("secret", JsonShape::Str),
        ("label", JsonShape::Str),
        ("digits", JsonShape::Int),
        ("type", JsonShape::Str),
        ("algorithm", JsonShape::Str),
        ("thumbnail", JsonShape::Str),
        ("last_used", JsonShape::Int),
        ("tags", JsonShape::List),
    ])))
}

/// Register every built-in adapter.
///
/// Registration order is detection order: when two adapters accept the same
/// file the one registered first wins.
pub fn register_builtin(builder: CatalogueBuilder) -> CatalogueBuilder {
    builder
        .register(
            csv("BitwardenCSV", "bitwarden", &layouts::BITWARDEN)
                .describe("Bitwarden CSV export", "https://bitwarden.com")
                .hints(
                    "Tools> Export Vault> File Format: .csv",
                    "vaultmover pass bitwarden file.csv",
                ),
        )
        .register(
            Descriptor::new("BitwardenJSON", "bitwarden", Format::Json, ManagerKind::BitwardenJson)
                .non_default()
                .header(Header::Json(JsonShape::object(vec![
                    (
                        "folders",
                        JsonShape::array(JsonShape::object(vec![
                            ("id", JsonShape::Str),
                            ("name", JsonShape::Str),
                        ])),
                    ),
                    (
                        "items",
                        JsonShape::array(JsonShape::object(vec![
                            ("id", JsonShape::Str),
                            ("folderId", JsonShape::Str),
                            ("type", JsonShape::Int),
                            ("name", JsonShape::Str),
                            ("favorite", JsonShape::Bool),
                        ])),
                    ),
                ])))
                .describe("Bitwarden JSON export", "https://bitwarden.com")
                .hints(
                    "Tools> Export Vault> File Format: .json",
                    "vaultmover pass bitwarden file.json",
                ),
        )
        .register(
            csv("Buttercup", "buttercup", &layouts::BUTTERCUP)
                .describe("Buttercup CSV export", "https://buttercup.pw")
                .hints(
                    "File > Export > Export File to CSV",
                    "vaultmover pass buttercup file.csv",
                ),
        )
        .register(
            csv("ChromeCSV", "chrome", &layouts::CHROME)
                .only()
                .describe("Chrome CSV export", "https://support.google.com/chrome")
                .hints(
                    "Settings > Passwords > Export passwords",
                    "vaultmover pass chrome file.csv",
                ),
        )
        .register(
            csv("ChromeCSVSQLite", "chrome", &layouts::CHROME_SQLITE)
                .non_default()
                .describe(
                    "Chrome login database dumped to CSV",
                    "https://support.google.com/chrome",
                )
                .hints(
                    "See this guide: https://www.axllent.org/docs/view/export-chrome-passwords",
                    "vaultmover pass chrome file.csv",
                ),
        )
        .register(
            csv("DashlaneCSV", "dashlane", &layouts::DASHLANE)
                .describe("Dashlane CSV export", "https://www.dashlane.com")
                .hints(
                    "File > Export > Unsecured Archive in CSV",
                    "vaultmover pass dashlane file.csv",
                ),
        )
        .register(
            Descriptor::new("DashlaneJSON", "dashlane", Format::Json, ManagerKind::DashlaneJson)
                .non_default()
                .header(Header::Json(JsonShape::object(vec![
                    ("AUTHENTIFIANT", JsonShape::List),
                    ("EMAIL", JsonShape::List),
                ])))
                .describe("Dashlane JSON export", "https://www.dashlane.com")
                .hints(
                    "File > Export > Unsecured Archive in JSON",
                    "vaultmover pass dashlane file.json",
                ),
        )
        .register(
            csv("Encryptr", "encryptr", &layouts::ENCRYPTR)
                .describe("Encryptr CSV export", "https://spideroak.com/encryptr")
                .hints(
                    "Compile from source and follow instructions from this guide: \
                     https://github.com/SpiderOak/Encryptr/issues/295#issuecomment-322449705",
                    "vaultmover pass encryptr file.csv",
                ),
        )
        .register(
            Descriptor::new("Enpass", "enpass", Format::Csv, ManagerKind::EnpassCsv)
                .non_default()
                .header(Header::Csv(enpass_header()))
                .describe("Enpass 5 CSV export", "https://www.enpass.io")
                .hints("File > Export > As CSV", "vaultmover pass enpass file.csv"),
        )
        .register(
            Descriptor::new("Enpass6", "enpass", Format::Json, ManagerKind::Enpass6Json)
                .version("6")
                .header(Header::Json(JsonShape::object(vec![
                    (
                        "folders",
                        JsonShape::array(JsonShape::object(vec![
                            ("parent_uuid", JsonShape::Str),
                            ("title", JsonShape::Str),
                            ("uuid", JsonShape::Str),
                        ])),
                    ),
                    (
                        "items",
                        JsonShape::array(JsonShape::object(vec![
                            ("category", JsonShape::Str),
                            ("fields", JsonShape::List),
                            ("title", JsonShape::Str),
                        ])),
                    ),
                ])))
                .describe("Enpass 6 JSON export", "https://www.enpass.io")
                .hints(
                    "Menu > File > Export > As JSON",
                    "vaultmover pass enpass file.json",
                ),
        )
        .register(
            csv("FirefoxPasswordExporter", "firefox", &layouts::FIREFOX)
                .describe(
                    "Firefox password exporter add-on",
                    "https://github.com/kspearrin/ff-password-exporter",
                )
                .hints(
                    "Add-ons Prefs: Export Passwords: CSV",
                    "vaultmover pass firefox file.csv",
                ),
        )
        .register(
            Descriptor::new("KeepassKDBX", "keepass", Format::Kdbx, ManagerKind::Kdbx)
                .describe("KeePass encrypted database", "https://www.keepass.info")
                .hints("", "vaultmover pass keepass file.kdbx"),
        )
        .register(
            csv("KeepassCSV", "keepass", &layouts::KEEPASS)
                .non_default()
                .describe("KeePass CSV export", "https://www.keepass.info")
                .hints(
                    "File > Export > Keepass (CSV)",
                    "vaultmover pass keepass file.csv",
                ),
        )
        .register(
            Descriptor::new("KeepassXML", "keepass", Format::Xml, ManagerKind::KeepassXml)
                .non_default()
                .header(Header::Xml {
                    doctype: None,
                    root: "KeePassFile",
                })
                .describe("KeePass XML export", "https://www.keepass.info")
                .hints(
                    "File > Export > Keepass (XML)",
                    "vaultmover pass keepass file.xml",
                ),
        )
        .register(
            Descriptor::new("KeepassxXML", "keepassx", Format::Xml, ManagerKind::KeepassxXml)
                .header(Header::Xml {
                    doctype: Some("<!DOCTYPE KEEPASSX_DATABASE>"),
                    root: "database",
                })
                .describe("KeePassX 0.4 XML export", "https://www.keepassx.org")
                .hints(
                    "File > Export to > Keepass XML File",
                    "vaultmover pass keepassx file.xml",
                ),
        )
        .register(
            Descriptor::new("Keepassx2KDBX", "keepassx2", Format::Kdbx, ManagerKind::Kdbx)
                .describe("KeePassX 2 encrypted database", "https://www.keepassx.org")
                .hints("", "vaultmover pass keepassx2 file.kdbx"),
        )
        .register(
            csv("Keepassx2CSV", "keepassx2", &layouts::KEEPASSX2)
                .non_default()
                .describe("KeePassX 2 CSV export", "https://www.keepassx.org")
                .hints(
                    "Database > Export to CSV File",
                    "vaultmover pass keepassx2 file.csv",
                ),
        )
        .register(
            Descriptor::new("KeepassxcKDBX", "keepassxc", Format::Kdbx, ManagerKind::Kdbx)
                .describe("KeePassXC encrypted database", "https://keepassxc.org")
                .hints("", "vaultmover pass keepassxc file.kdbx"),
        )
        .register(
            csv("KeepassxcCSV", "keepassxc", &layouts::KEEPASSX2)
                .non_default()
                .describe("KeePassXC CSV export", "https://keepassxc.org")
                .hints(
                    "Database > Export to CSV File",
                    "vaultmover pass keepassxc file.csv",
                ),
        )
        .register(
            csv("KeeperCSV", "keeper", &layouts::KEEPER)
                .describe("Keeper CSV export", "https://keepersecurity.com")
                .hints(
                    "Settings > Export : Export to CSV File",
                    "vaultmover pass keeper file.csv",
                ),
        )
        .register(
            csv("LastpassCSV", "lastpass", &layouts::LASTPASS)
                .describe("LastPass CSV export", "https://www.lastpass.com")
                .hints(
                    "More Options > Advanced > Export",
                    "vaultmover pass lastpass file.csv",
                ),
        )
        .register(
            csv("Myki", "myki", &layouts::MYKI)
                .describe("Myki CSV export", "https://myki.com")
                .hints(
                    "See this guide: https://support.myki.com/myki-app/exporting-your-passwords-from-the-myki-app/how-to-export-your-passwords-account-data-from-myki",
                    "vaultmover pass myki file.csv",
                ),
        )
        .register(
            csv("NordPassCSV", "nordpass", &layouts::NORDPASS)
                .describe("NordPass CSV export", "https://nordpass.com/")
                .hints("Settings > Export Items", "vaultmover pass nordpass file.csv"),
        )
        .register(
            csv("OnePasswordCSV", "1password", &layouts::ONEPASSWORD6)
                .version("6")
                .describe("1Password 6 CSV export", "https://1password.com")
                .hints(
                    "See this guide: https://support.1password.com/export",
                    "vaultmover pass 1password file.csv",
                ),
        )
        .register(
            csv("OnePassword4CSV", "1password", &layouts::ONEPASSWORD4)
                .version("4")
                .non_default()
                .only()
                .describe("1Password 4 CSV export", "https://1password.com")
                .hints(
                    "See this guide: https://support.1password.com/export",
                    "vaultmover pass 1password file.csv",
                ),
        )
        .register(
            Descriptor::new("OnePassword4PIF", "1password", Format::Pif, ManagerKind::OnePasswordPif)
                .version("4")
                .non_default()
                .describe("1Password 4 interchange file", "https://1password.com")
                .hints(
                    "See this guide: https://support.1password.com/export",
                    "vaultmover pass 1password file.1pif",
                ),
        )
        .register(
            csv("PadlockCSV", "padlock", &layouts::PADLOCK)
                .describe("Padlock CSV export", "https://padloc.app")
                .hints(
                    "Settings > Export Data and copy text into a .csv file",
                    "vaultmover pass padlock file.csv",
                ),
        )
        .register(
            csv("PassmanCSV", "passman", &layouts::PASSMAN)
                .describe("Passman CSV export", "https://passman.cc")
                .hints(
                    "Settings > Export credentials  > Export type: CSV",
                    "vaultmover pass passman file.csv",
                ),
        )
        .register(
            Descriptor::new("PassmanJSON", "passman", Format::Json, ManagerKind::PassmanJson)
                .non_default()
                .header(Header::Json(JsonShape::array(JsonShape::object(vec![
                    ("credential_id", JsonShape::Int),
                    ("guid", JsonShape::Str),
                    ("label", JsonShape::Str),
                    ("tags", JsonShape::List),
                    ("username", JsonShape::Str),
                    ("password", JsonShape::Str),
                    ("custom_fields", JsonShape::List),
                    ("otp", JsonShape::Dict),
                ]))))
                .describe("Passman JSON export", "https://passman.cc")
                .hints(
                    "Settings > Export credentials  > Export type: JSON",
                    "vaultmover pass passman file.json",
                ),
        )
        .register(
            Descriptor::new("Passpie", "passpie", Format::Yaml, ManagerKind::Passpie)
                .version("1.0")
                .header(Header::Yaml(vec![
                    ("handler", serde_yaml::Value::from("passpie")),
                    ("version", serde_yaml::Value::from(1.0)),
                ]))
                .describe("Passpie YAML export", "https://passpie.readthedocs.io")
                .hints("`passpie export file.yml`", "vaultmover pass passpie file.yml"),
        )
        .register(
            Descriptor::new("Revelation", "revelation", Format::Xml, ManagerKind::RevelationXml)
                .header(Header::Xml {
                    doctype: None,
                    root: "revelationdata",
                })
                .describe("Revelation XML export", "https://revelation.olasagasti.info")
                .hints("File > Export: XML", "vaultmover pass revelation file.xml"),
        )
        .register(
            csv("Roboform", "roboform", &layouts::ROBOFORM)
                .describe("RoboForm CSV export", "https://www.roboform.com")
                .hints(
                    "Roboform > Options > Data & Sync > Export To: CSV file",
                    "vaultmover pass roboform file.csv",
                ),
        )
        .register(
            csv("SafeInCloudCSV", "safeincloud", &layouts::SAFEINCLOUD)
                .describe("SafeInCloud CSV export", "https://safeincloud.ladesk.com/")
                .hints(
                    "File > Export > Comma-Separated Values (CSV)",
                    "vaultmover pass safeincloud file.csv",
                ),
        )
        .register(
            csv("SaferPass", "saferpass", &layouts::SAFERPASS)
                .describe("SaferPass CSV export", "https://saferpass.net")
                .hints(
                    "Settings > Export Data: Export data",
                    "vaultmover pass saferpass file.csv",
                ),
        )
        .register(
            csv("UPM", "upm", &layouts::UPM)
                .describe("Universal Password Manager CSV export", "http://upm.sourceforge.net")
                .hints("Database > Export", "vaultmover pass upm file.csv"),
        )
        .register(
            Descriptor::new("ClipperzHTML", "clipperz", Format::Html, ManagerKind::ClipperzHtml)
                .header(Header::Html("body/div/div/textarea"))
                .describe("Clipperz HTML + JSON export", "https://clipperz.is")
                .hints(
                    "Settings > Data > Export: HTML + JSON",
                    "vaultmover pass clipperz file.html",
                ),
        )
        .register(
            Descriptor::new("AndOTP", "andotp", Format::Json, ManagerKind::AndOtp)
                .header(otp_list_header())
                .describe("andOTP plain backup", "https://github.com/andOTP/andOTP")
                .hints("Backups> Backup plain", "vaultmover pass andotp file.json"),
        )
        .register(
            Descriptor::new("Aegis", "aegis", Format::Json, ManagerKind::Aegis)
                .header(Header::Json(JsonShape::object(vec![
                    ("version", JsonShape::Exact(json!(1))),
                    (
                        "header",
                        JsonShape::object(vec![
                            ("slots", JsonShape::Exact(json!(null))),
                            ("params", JsonShape::Exact(json!(null))),
                        ]),
                    ),
                    (
                        "db",
                        JsonShape::object(vec![
                            ("version", JsonShape::Int),
                            (
                                "entries",
                                JsonShape::array(JsonShape::object(vec![
                                    ("type", JsonShape::Str),
                                    ("uuid", JsonShape::Str),
                                    ("name", JsonShape::Str),
                                    ("issuer", JsonShape::Str),
                                    ("info", JsonShape::Dict),
                                ])),
                            ),
                        ]),
                    ),
                ])))
                .describe(
                    "Aegis plain JSON export",
                    "https://github.com/beemdevelopment/Aegis",
                )
                .hints("Settings> Tools: Export Plain", "vaultmover pass aegis file.json"),
        )
        .register(
            Descriptor::new("FreeOTPPlus", "freeotp+", Format::Json, ManagerKind::FreeOtpPlus)
                .header(Header::Json(JsonShape::object(vec![
                    ("tokenOrder", JsonShape::List),
                    (
                        "tokens",
                        JsonShape::array(JsonShape::object(vec![
                            ("algo", JsonShape::Str),
                            ("digits", JsonShape::Int),
                            ("issuerExt", JsonShape::Str),
                            ("label", JsonShape::Str),
                            ("secret", JsonShape::List),
                            ("type", JsonShape::Str),
                        ])),
                    ),
                ])))
                .describe(
                    "FreeOTP+ JSON export",
                    "https://github.com/helloworld1/FreeOTPPlus",
                )
                .hints(
                    "Settings> Export> Export JSON Format",
                    "vaultmover pass freeotp+ file.json",
                ),
        )
        .register(
            Descriptor::new("GnomeAuthenticator", "gnome-auth", Format::Json, ManagerKind::AndOtp)
                .header(otp_list_header())
                .describe(
                    "Gnome Authenticator plain JSON backup",
                    "https://gitlab.gnome.org/World/Authenticator",
                )
                .hints(
                    "Backup > in a plain-text JSON file",
                    "vaultmover pass gnome-auth file.json",
                ),
        )
        .register(
            Descriptor::new("GenericCSV", "csv", Format::Csv, ManagerKind::GenericCsv)
                .cap(Cap::IMPORT | Cap::EXPORT)
                .describe("CSV file with user-described columns", "")
                .hints("", "vaultmover pass csv file.csv --cols 'url,login,,password'"),
        )
        .register(
            Descriptor::new("JsonFile", "json", Format::Json, ManagerKind::JsonFile)
                .cap(Cap::EXPORT)
                .describe("JSON dump of the cleaned entries", "")
                .hints("", "vaultmover json bitwarden file.csv --out entries.json"),
        )
        .register(
            Descriptor::new("PasswordStore", "pass", Format::Pass, ManagerKind::PasswordStore)
                .cap(Cap::IMPORT | Cap::EXPORT | Cap::FORMAT)
                .secure()
                .describe("password-store repository", "https://passwordstore.org")
                .hints("", "vaultmover csv pass path/to/store --out file.csv"),
        )
}
