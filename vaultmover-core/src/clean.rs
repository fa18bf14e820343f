//! Path generation and de-duplication of imported entries.
//!
//! Every entry leaves the cleaner with a `path` unique within the batch,
//! built from its group and its best identifying field. `title` and `group`
//! are folded into that path and removed.

use crate::entry::{Entry, GROUP, HOST, LOGIN, OTPAUTH, PATH, TITLE, URL};
use crate::otp::{shorthand_to_uri, SCHEME};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Segment used when an entry has nothing to name it by.
pub const NOTITLE: &str = "notitle";

/// Fields tried, in order, for the last path segment.
const TITLE_KEYS: [&str; 4] = [TITLE, HOST, URL, LOGIN];

/// Character replacement tables used while building paths.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanConfig {
    /// Replacement for invalid characters and duplicate suffix separator.
    pub separator: String,
    /// Replacements applied with `--clean` to make paths shell friendly.
    pub cleans: Vec<(String, String)>,
    /// Prefixes stripped from titles, urls and groups.
    pub protocols: Vec<String>,
    /// Characters not allowed in a path segment.
    pub invalids: Vec<String>,
}

impl Default for CleanConfig {
    fn default() -> Self {
        let pairs = [
            (" ", "-"),
            ("&", "and"),
            ("@", "At"),
            ("'", ""),
            ("[", ""),
            ("]", ""),
            ("\t", ""),
        ];
        Self {
            separator: "-".to_string(),
            cleans: pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            protocols: vec!["http://".to_string(), "https://".to_string()],
            invalids: ["<", ">", ":", "\"", "/", "\\", "|", "?", "*", "\0", "\t"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl CleanConfig {
    /// Change the separator, and with it the replacement of spaces.
    pub fn set_separator(&mut self, separator: &str) {
        self.separator = separator.to_string();
        match self.cleans.iter_mut().find(|(from, _)| from == " ") {
            Some(space) => space.1 = separator.to_string(),
            None => self.cleans.push((" ".to_string(), separator.to_string())),
        }
    }
}

fn replace_all<'a>(text: &str, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else if path.ends_with('/') {
        format!("{}{}", path, segment)
    } else {
        format!("{}/{}", path, segment)
    }
}

/// First non-empty component of a slash separated string: the host of a
/// URL once its scheme is gone.
fn domain(text: &str) -> &str {
    text.split('/')
        .find(|component| !component.is_empty())
        .unwrap_or(text)
}

/// Builds unique destination paths for a batch of entries.
#[derive(Debug, Clone)]
pub struct Cleaner {
    config: CleanConfig,
    cmdclean: bool,
    convert: bool,
}

impl Cleaner {
    pub fn new(config: CleanConfig, cmdclean: bool, convert: bool) -> Self {
        Self {
            config,
            cmdclean,
            convert,
        }
    }

    /// Clean `entries` in place.
    pub fn run(&self, entries: &mut [Entry]) {
        for entry in entries.iter_mut() {
            if !entry.is_attachment() {
                entry.retain(|_, value| !value.is_empty());
            }
            // Already cleaned: nothing left to build a new path from.
            if !entry.path().is_empty() && !entry.contains(TITLE) && !entry.contains(GROUP) {
                continue;
            }
            let group = entry
                .remove(GROUP)
                .map(|value| value.to_string())
                .unwrap_or_default();
            let seed = self.group(&self.protocol(&group));
            let path = self.path(entry, &seed);
            entry.set(PATH, path);
        }

        for _ in 0..2 {
            self.subfolders(entries);
        }
        self.number_duplicates(entries);

        for entry in entries.iter_mut().filter(|e| !e.is_attachment()) {
            self.normalize_otp(entry);
        }
    }

    fn protocol(&self, text: &str) -> String {
        replace_all(
            text,
            self.config.protocols.iter().map(|p| (p.as_str(), "")),
        )
    }

    /// Replace invalid characters in a group, keeping `/` and `\` as
    /// hierarchy separators.
    fn group(&self, text: &str) -> String {
        let separator = self.config.separator.as_str();
        replace_all(
            text,
            self.config.invalids.iter().map(|c| match c.as_str() {
                "/" | "\\" => (c.as_str(), "/"),
                _ => (c.as_str(), separator),
            }),
        )
    }

    fn convert_invalids(&self, text: &str) -> String {
        let separator = self.config.separator.as_str();
        replace_all(
            text,
            self.config.invalids.iter().map(|c| (c.as_str(), separator)),
        )
    }

    fn cmdline(&self, text: &str) -> String {
        replace_all(
            text,
            self.config
                .cleans
                .iter()
                .map(|(from, to)| (from.as_str(), to.as_str())),
        )
    }

    /// Path segment built from the value of `key`.
    fn segment(&self, key: &str, value: &str) -> String {
        let mut text = value.to_string();
        if key != LOGIN {
            text = self.protocol(&text);
            if key != TITLE {
                text = domain(&text).to_string();
            }
        }
        let separator = self.config.separator.as_str();
        text = replace_all(&text, [("/", separator), ("\\", separator)]);
        if self.cmdclean {
            text = self.cmdline(&text);
        }
        if self.convert {
            text = self.convert_invalids(&text);
        }
        text
    }

    /// Append the entry's best identifying segment to `base` and drop its
    /// title. A segment equal to the last component of `base` is skipped in
    /// favor of the next field, and `notitle` is used when none is left.
    fn path(&self, entry: &mut Entry, base: &str) -> String {
        let mut path = base.to_string();
        let mut found = false;
        for key in TITLE_KEYS {
            let Some(value) = entry.get(key).filter(|v| !v.is_empty()) else {
                continue;
            };
            let segment = self.segment(key, &value.to_string());
            if !segment.is_empty() && basename(&path) != segment {
                path = join(&path, &segment);
                found = true;
                break;
            }
        }
        if !found && basename(&path) != NOTITLE {
            path = join(&path, NOTITLE);
        }
        entry.remove(TITLE);
        path
    }

    /// Split entries sharing a path into subfolders named by their next
    /// identifying field.
    fn subfolders(&self, entries: &mut [Entry]) {
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            groups.entry(entry.path().to_string()).or_default().push(index);
        }
        for (path, indexes) in groups.into_iter().filter(|(_, idx)| idx.len() > 1) {
            debug!("{} entries share {}", indexes.len(), path);
            for index in indexes {
                let entry = &mut entries[index];
                let path = self.path(entry, &path);
                entry.set(PATH, path);
            }
        }
    }

    /// Suffix the remaining duplicates with `<separator><n>`.
    fn number_duplicates(&self, entries: &mut [Entry]) {
        let mut seen: HashSet<String> = HashSet::new();
        for entry in entries.iter_mut() {
            let path = entry.path().to_string();
            if seen.insert(path.clone()) {
                continue;
            }
            let unique = (1..)
                .map(|n| format!("{}{}{}", path, self.config.separator, n))
                .find(|candidate| !seen.contains(candidate))
                .unwrap_or_default();
            seen.insert(unique.clone());
            entry.set(PATH, unique);
        }
    }

    fn normalize_otp(&self, entry: &mut Entry) {
        let Some(value) = entry.text(OTPAUTH) else {
            return;
        };
        if value.starts_with(SCHEME) {
            return;
        }
        let uri = shorthand_to_uri(value, basename(entry.path()));
        entry.set(OTPAUTH, uri);
    }
}
