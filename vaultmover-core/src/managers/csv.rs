//! Column-mapped CSV importers.

use super::{canonical, Importer, KeyMap};
use crate::entry::{Entry, Value, COMMENTS, GROUP, TITLE};
use crate::formats::csv::{columns_match, reader};
use crate::formats::{Header, Source};
use crate::{MigrationError, Result};

/// Per-manager correction applied to every parsed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvFixup {
    None,
    /// Backslash separated folders.
    BackslashGroups,
    /// Backslash separated folders; a missing folder column means the
    /// export was truncated by the manager.
    Lastpass,
    /// Backslash separated tags wrapped in brackets.
    Passman,
    /// Internal identifier columns are dropped.
    Buttercup,
}

/// Static description of a manager's CSV export.
#[derive(Debug, PartialEq, Eq)]
pub struct CsvLayout {
    pub keys: KeyMap,
    /// Column names of exports that carry no header row.
    pub fieldnames: Option<&'static [&'static str]>,
    /// Header used for recognition when it differs from the mapped columns.
    pub header: Option<&'static [&'static str]>,
    pub fixup: CsvFixup,
}

impl CsvLayout {
    pub const fn new(keys: KeyMap) -> Self {
        Self {
            keys,
            fieldnames: None,
            header: None,
            fixup: CsvFixup::None,
        }
    }

    pub const fn headerless(keys: KeyMap, fieldnames: &'static [&'static str]) -> Self {
        Self {
            keys,
            fieldnames: Some(fieldnames),
            header: None,
            fixup: CsvFixup::None,
        }
    }

    pub const fn with_header(self, header: &'static [&'static str]) -> Self {
        Self {
            header: Some(header),
            ..self
        }
    }

    pub const fn with_fixup(self, fixup: CsvFixup) -> Self {
        Self { fixup, ..self }
    }

    /// Columns expected in the first row of an export.
    pub fn columns(&self) -> Vec<&'static str> {
        match self.header {
            Some(header) => header.to_vec(),
            None => self
                .keys
                .iter()
                .map(|(_, column)| *column)
                .filter(|column| !column.is_empty())
                .collect(),
        }
    }
}

pub static BITWARDEN: CsvLayout = CsvLayout::new(&[
    ("title", "name"),
    ("password", "login_password"),
    ("login", "login_username"),
    ("url", "login_uri"),
    ("comments", "notes"),
    ("group", "folder"),
    ("otpauth", "login_totp"),
]);

pub static BUTTERCUP: CsvLayout = CsvLayout::new(&[
    ("title", "title"),
    ("password", "password"),
    ("login", "username"),
    ("url", "URL"),
    ("comments", "Notes"),
    ("group", "!group_name"),
])
.with_fixup(CsvFixup::Buttercup);

pub static CHROME: CsvLayout = CsvLayout::new(&[
    ("title", "name"),
    ("password", "password"),
    ("login", "username"),
    ("url", "url"),
]);

pub static CHROME_SQLITE: CsvLayout = CsvLayout::new(&[
    ("title", "display_name"),
    ("password", "password_value"),
    ("login", "username_value"),
    ("url", "origin_url"),
]);

pub static DASHLANE: CsvLayout = CsvLayout::headerless(
    &[
        ("title", "title"),
        ("password", "password"),
        ("login", "login"),
        ("url", "url"),
        ("comments", "comments"),
    ],
    &["title", "url", "login", "password", "comments"],
);

pub static ENCRYPTR: CsvLayout = CsvLayout::new(&[
    ("title", "Label"),
    ("password", "Password"),
    ("login", "Username"),
    ("url", "Site URL"),
    ("comments", "Notes"),
    ("text", "Text"),
])
.with_header(&["Entry Type", "Label", "Notes"]);

pub static FIREFOX: CsvLayout = CsvLayout::new(&[
    ("title", "hostname"),
    ("password", "password"),
    ("login", "username"),
]);

pub static KEEPASS: CsvLayout = CsvLayout::new(&[
    ("title", "Account"),
    ("password", "Password"),
    ("login", "Login Name"),
    ("url", "Web Site"),
    ("comments", "Comments"),
]);

pub static KEEPASSX2: CsvLayout = CsvLayout::new(&[
    ("title", "Title"),
    ("password", "Password"),
    ("login", "Username"),
    ("url", "URL"),
    ("comments", "Notes"),
    ("group", "Group"),
]);

pub static KEEPER: CsvLayout = CsvLayout::headerless(
    &[
        ("title", "title"),
        ("password", "password"),
        ("login", "login"),
        ("url", "url"),
        ("comments", "comments"),
        ("group", "group"),
    ],
    &["group", "title", "login", "password", "url", "comments"],
);

pub static LASTPASS: CsvLayout = CsvLayout::new(&[
    ("title", "name"),
    ("password", "password"),
    ("login", "username"),
    ("url", "url"),
    ("comments", "extra"),
    ("group", "grouping"),
])
.with_fixup(CsvFixup::Lastpass);

pub static MYKI: CsvLayout = CsvLayout::new(&[
    ("title", "nickname"),
    ("password", "password"),
    ("login", "username"),
    ("url", "url"),
    ("comments", "additionalInfo"),
    ("otpauth", "twofaSecret"),
]);

pub static NORDPASS: CsvLayout = CsvLayout::new(&[
    ("title", "name"),
    ("password", "password"),
    ("login", "username"),
    ("url", "url"),
    ("comments", "note"),
    ("group", "folder"),
]);

pub static ONEPASSWORD6: CsvLayout = CsvLayout::new(&[
    ("title", "Title"),
    ("password", "Password"),
    ("login", "Username"),
    ("url", "URL"),
    ("comments", "Notes"),
    ("group", "Type"),
]);

pub static ONEPASSWORD4: CsvLayout = CsvLayout::new(&[
    ("title", "title"),
    ("password", "password"),
    ("login", "username"),
    ("url", "url"),
    ("comments", "notes"),
]);

pub static PADLOCK: CsvLayout = CsvLayout::new(&[
    ("title", "name"),
    ("password", "password"),
    ("login", "username"),
    ("url", "url"),
    ("comments", "notes"),
    ("group", "tags"),
])
.with_fixup(CsvFixup::BackslashGroups);

pub static PASSMAN: CsvLayout = CsvLayout::new(&[
    ("title", "label"),
    ("password", "password"),
    ("login", "username"),
    ("email", "email"),
    ("url", "url"),
    ("comments", "description"),
    ("group", "tags"),
])
.with_fixup(CsvFixup::Passman);

pub static ROBOFORM: CsvLayout = CsvLayout::new(&[
    ("title", "Name"),
    ("password", "Pwd"),
    ("login", "Login"),
    ("url", "Url"),
    ("comments", "Note"),
    ("group", "Folder"),
]);

pub static SAFEINCLOUD: CsvLayout = CsvLayout::new(&[
    ("title", "Title"),
    ("login", "Login"),
    ("password", "Password"),
    ("url", "URL"),
    ("comments", "Notes"),
    ("otpauth", "OTP"),
]);

pub static SAFERPASS: CsvLayout = CsvLayout::new(&[
    ("title", "title"),
    ("password", "password"),
    ("login", "username"),
    ("url", "url"),
    ("comments", "notes"),
    ("favorite", "favorite"),
    ("text", "text"),
    ("modelType", "modelType"),
    ("color", "color"),
]);

pub static UPM: CsvLayout = CsvLayout::headerless(
    &[
        ("title", "title"),
        ("password", "password"),
        ("login", "login"),
        ("url", "url"),
        ("comments", "comments"),
    ],
    &["title", "login", "password", "url", "comments"],
);

impl CsvFixup {
    fn apply(self, entry: &mut Entry) -> Result<()> {
        match self {
            CsvFixup::None => {}
            CsvFixup::BackslashGroups => replace_group(entry, &[("\\", "/")]),
            CsvFixup::Lastpass => {
                if matches!(entry.get(GROUP), Some(Value::Null)) {
                    return Err(MigrationError::Format(format!(
                        "Invalid group in entry '{}': the export looks truncated",
                        entry.text(TITLE).unwrap_or_default()
                    )));
                }
                replace_group(entry, &[("\\", "/")]);
            }
            CsvFixup::Passman => replace_group(entry, &[("\\", "/"), ("[", ""), ("]", "")]),
            CsvFixup::Buttercup => {
                entry.remove("!group_id");
                entry.remove("id");
            }
        }
        Ok(())
    }
}

fn replace_group(entry: &mut Entry, replacements: &[(&str, &str)]) {
    let mut group = entry.text(GROUP).unwrap_or_default().to_string();
    for (from, to) in replacements {
        group = group.replace(from, to);
    }
    entry.set(GROUP, group);
}

/// Importer for a manager whose CSV export is described by a [`CsvLayout`].
pub struct TableImporter {
    layout: &'static CsvLayout,
    header: Header,
    only: bool,
    delimiter: u8,
}

impl TableImporter {
    pub fn new(layout: &'static CsvLayout, header: Header, only: bool, delimiter: u8) -> Self {
        Self {
            layout,
            header,
            only,
            delimiter,
        }
    }
}

impl Importer for TableImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let text = source.read_text()?;
        if text.trim().is_empty() {
            return Err(MigrationError::Format("empty CSV file".to_string()));
        }
        let mut records = reader(&text, self.delimiter).into_records();

        let fieldnames: Vec<String> = match self.layout.fieldnames {
            Some(names) => names.iter().map(|name| name.to_string()).collect(),
            None => match records.next() {
                Some(record) => record?.iter().map(str::to_string).collect(),
                None => return Err(MigrationError::Format("empty CSV file".to_string())),
            },
        };
        if let Header::Csv(columns) = &self.header {
            if !columns_match(&fieldnames, columns, self.only) {
                return Err(MigrationError::Format(
                    "CSV header does not match the expected columns".to_string(),
                ));
            }
        }

        let mut entries = Vec::new();
        for record in records {
            let record = record?;
            // Headerless rows carry fixed leading cells; trailing extras are
            // custom fields.
            if self.layout.fieldnames.is_some() && record.len() < fieldnames.len() {
                return Err(MigrationError::Format(format!(
                    "expected {} columns, found {}",
                    fieldnames.len(),
                    record.len()
                )));
            }
            let mut entry = Entry::new();
            for (index, name) in fieldnames.iter().enumerate() {
                let key = canonical(self.layout.keys, name);
                match record.get(index) {
                    Some(value) => entry.set(key, value),
                    None => entry.set(key, Value::Null),
                }
            }
            self.layout.fixup.apply(&mut entry)?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

const ENPASS_HEADER: &str = r#""Title","Field","Value","Field","Value",.........,"Note""#;

const ENPASS_KEYS: KeyMap = &[
    ("title", "Title"),
    ("password", "Password"),
    ("login", "Username"),
    ("url", "URL"),
    ("comments", "notes"),
    ("group", "group"),
];

/// Detection header for the Enpass CSV export.
pub fn enpass_header() -> Vec<&'static str> {
    ENPASS_HEADER.split(',').map(|column| column.trim_matches('"')).collect()
}

/// Importer for Enpass CSV exports: title, then field/value pairs, then note.
pub struct EnpassImporter;

impl Importer for EnpassImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let text = source.read_text()?;
        let (first, rest) = text.split_once('\n').unwrap_or((text.as_str(), ""));
        if !first.starts_with(ENPASS_HEADER) {
            return Err(MigrationError::Format(
                "missing Enpass CSV header".to_string(),
            ));
        }

        let mut entries = Vec::new();
        for record in reader(rest, b',').into_records() {
            let record = record?;
            let mut fields: Vec<&str> = record.iter().collect();
            if fields.is_empty() {
                continue;
            }
            let mut entry = Entry::new();
            entry.set(TITLE, fields.remove(0));
            entry.set(COMMENTS, fields.pop().unwrap_or_default());
            for pair in fields.chunks_exact(2) {
                entry.set(canonical(ENPASS_KEYS, pair[0]), pair[1]);
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(layout: &'static CsvLayout, text: &str) -> Result<Vec<Entry>> {
        let importer = TableImporter::new(layout, Header::Csv(layout.columns()), false, b',');
        importer.parse(&Source::memory(text.as_bytes().to_vec()))
    }

    #[test]
    fn test_bitwarden_rows() {
        let text = "folder,favorite,type,name,notes,fields,login_uri,login_username,login_password,login_totp\n\
                    Social,,login,twitter.com,,,https://twitter.com,jdoe,pass1,\n";
        let entries = parse(&BITWARDEN, text).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.text("title"), Some("twitter.com"));
        assert_eq!(entry.text("login"), Some("jdoe"));
        assert_eq!(entry.text("password"), Some("pass1"));
        assert_eq!(entry.text("url"), Some("https://twitter.com"));
        assert_eq!(entry.text("group"), Some("Social"));
        assert_eq!(entry.text("type"), Some("login"));
    }

    #[test]
    fn test_header_mismatch_is_format_error() {
        let err = parse(&BITWARDEN, "a,b\n1,2\n").unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_headerless_layout() {
        let text = "Emails,gmail,jdoe,secret,https://mail.google.com,note\n";
        let entries = parse(&KEEPER, text).unwrap();
        assert_eq!(entries[0].text("group"), Some("Emails"));
        assert_eq!(entries[0].text("title"), Some("gmail"));
        assert_eq!(entries[0].text("comments"), Some("note"));
    }

    #[test]
    fn test_headerless_rejects_empty_and_short_rows() {
        for layout in [&DASHLANE, &KEEPER, &UPM] {
            assert!(parse(layout, "").unwrap_err().is_format_error());
            assert!(parse(layout, "  \n").unwrap_err().is_format_error());
            assert!(parse(layout, "hello world\n").unwrap_err().is_format_error());
        }
    }

    #[test]
    fn test_headerless_keeps_extra_cells() {
        let text = "Emails,gmail,jdoe,secret,https://mail.google.com,note,Recovery,abc\n";
        let entries = parse(&KEEPER, text).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text("comments"), Some("note"));
    }

    #[test]
    fn test_short_rows_yield_null() {
        let text = "name,url,username,password,extra,grouping\nsite,u,l,p,x\n";
        let err = parse(&LASTPASS, text).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_lastpass_backslash_groups() {
        let text = "url,username,password,extra,name,grouping,fav\n\
                    https://a.com,l,p,,a,Root\\Sub,0\n";
        let entries = parse(&LASTPASS, text).unwrap();
        assert_eq!(entries[0].text("group"), Some("Root/Sub"));
    }

    #[test]
    fn test_passman_tags() {
        let text = "label,username,password,email,url,description,tags\n\
                    a,l,p,,,,[Web\\Mail]\n";
        let entries = parse(&PASSMAN, text).unwrap();
        assert_eq!(entries[0].text("group"), Some("Web/Mail"));
    }

    #[test]
    fn test_buttercup_drops_ids() {
        let text = "!group_id,!group_name,title,username,password,URL,id\n\
                    1,General,a,l,p,u,42\n";
        let entries = parse(&BUTTERCUP, text).unwrap();
        assert!(!entries[0].contains("id"));
        assert!(!entries[0].contains("!group_id"));
        assert_eq!(entries[0].text("group"), Some("General"));
    }

    #[test]
    fn test_encryptr_columns() {
        assert_eq!(ENCRYPTR.columns(), vec!["Entry Type", "Label", "Notes"]);
        assert_eq!(CHROME.columns(), vec!["name", "password", "username", "url"]);
    }

    #[test]
    fn test_enpass_csv() {
        let text = "\"Title\",\"Field\",\"Value\",\"Field\",\"Value\",.........,\"Note\"\n\
                    \"GitHub\",\"Username\",\"jdoe\",\"Password\",\"pw\",\"notes here\"\n";
        let entries = EnpassImporter
            .parse(&Source::memory(text.as_bytes().to_vec()))
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text("title"), Some("GitHub"));
        assert_eq!(entries[0].text("login"), Some("jdoe"));
        assert_eq!(entries[0].text("password"), Some("pw"));
        assert_eq!(entries[0].text("comments"), Some("notes here"));
    }

    #[test]
    fn test_enpass_requires_header() {
        let err = EnpassImporter
            .parse(&Source::memory(b"a,b\n".to_vec()))
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_enpass_header_columns() {
        assert_eq!(enpass_header()[0], "Title");
        assert_eq!(enpass_header().last(), Some(&"Note"));
    }
}
