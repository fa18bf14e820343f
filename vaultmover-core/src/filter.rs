//! Entry selection with a small JSONPath subset.
//!
//! Expressions are evaluated over `{"entries": [...]}`. Supported forms:
//!
//! - `$.entries[*]`
//! - `$.entries[*].FIELD[?@=="V"]`, also with `=` and `!=`
//! - `$.entries[?@.FIELD=="V"]`, also with `!=`
//!
//! Parentheses around the filter and single quotes around the value are
//! accepted. A list field matches when any of its elements does.

use crate::entry::{Entry, Value};
use crate::{MigrationError, Result};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

static ALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$\.entries\[\*\]$").unwrap());

static CHILD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\$\.entries\[\*\]\.([\w-]+)\[\?\(?\s*@\s*(==|=|!=)\s*(?:"([^"]*)"|'([^']*)')\s*\)?\]$"#,
    )
    .unwrap()
});

static MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\$\.entries\[\?\(?\s*@\.([\w-]+)\s*(==|!=)\s*(?:"([^"]*)"|'([^']*)')\s*\)?\]$"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    All,
    Field { field: String, op: Op, value: String },
}

/// A parsed `--filter` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    selector: Selector,
}

impl EntryFilter {
    pub fn parse(expression: &str) -> Result<Self> {
        let expression = expression.trim();
        if ALL.is_match(expression) {
            return Ok(Self {
                selector: Selector::All,
            });
        }
        let caps = CHILD
            .captures(expression)
            .or_else(|| MEMBER.captures(expression))
            .ok_or_else(|| {
                MigrationError::Config(format!("unsupported filter expression: {}", expression))
            })?;
        let op = match &caps[2] {
            "!=" => Op::Ne,
            _ => Op::Eq,
        };
        let value = caps.get(3).or_else(|| caps.get(4)).map_or("", |m| m.as_str());
        Ok(Self {
            selector: Selector::Field {
                field: caps[1].to_string(),
                op,
                value: value.to_string(),
            },
        })
    }

    /// True when `entry` is selected. Entries without the field are never
    /// selected by a comparison.
    pub fn matches(&self, entry: &Entry) -> bool {
        match &self.selector {
            Selector::All => true,
            Selector::Field { field, op, value } => match entry.get(field) {
                Some(found) => compare(found, *op, value),
                None => false,
            },
        }
    }

    pub fn apply(&self, entries: Vec<Entry>) -> Vec<Entry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

fn compare(found: &Value, op: Op, expected: &str) -> bool {
    match found {
        Value::List(items) => items.iter().any(|item| compare(item, op, expected)),
        _ => {
            let equal = found.to_string() == expected;
            match op {
                Op::Eq => equal,
                Op::Ne => !equal,
            }
        }
    }
}

impl FromStr for EntryFilter {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<Entry> {
        let mut tagged: Entry = [("title", "github"), ("group", "Dev")].into_iter().collect();
        tagged.set(
            "tags",
            Value::List(vec![Value::from("work"), Value::from("code")]),
        );
        vec![
            tagged,
            [("title", "twitter"), ("group", "Social")].into_iter().collect(),
            [("title", "mail")].into_iter().collect(),
        ]
    }

    fn titles(entries: &[Entry]) -> Vec<&str> {
        entries.iter().filter_map(|e| e.text("title")).collect()
    }

    #[test]
    fn test_select_all() {
        let filter = EntryFilter::parse("$.entries[*]").unwrap();
        assert_eq!(filter.apply(entries()).len(), 3);
    }

    #[test]
    fn test_member_comparison() {
        let filter = EntryFilter::parse(r#"$.entries[?@.group=="Social"]"#).unwrap();
        assert_eq!(titles(&filter.apply(entries())), vec!["twitter"]);

        let filter = EntryFilter::parse("$.entries[?(@.group != 'Social')]").unwrap();
        assert_eq!(titles(&filter.apply(entries())), vec!["github"]);
    }

    #[test]
    fn test_child_comparison_on_list() {
        let filter = EntryFilter::parse(r#"$.entries[*].tags[?@=="code"]"#).unwrap();
        assert_eq!(titles(&filter.apply(entries())), vec!["github"]);

        let filter = EntryFilter::parse(r#"$.entries[*].tags[?@="home"]"#).unwrap();
        assert!(filter.apply(entries()).is_empty());
    }

    #[test]
    fn test_malformed_expression() {
        for expression in ["", "$.items[*]", "$.entries[?@.group]", "entries"] {
            let err = EntryFilter::parse(expression).unwrap_err();
            assert!(matches!(err, MigrationError::Config(_)), "{expression}");
        }
    }

    #[test]
    fn test_from_str() {
        let filter: EntryFilter = " $.entries[*] ".parse().unwrap();
        assert!(filter.matches(&Entry::new()));
    }
}
