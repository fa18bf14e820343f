//! Auto-detection of the adapter able to read a source.
//!
//! Candidates are always tried in catalogue registration order and the
//! first one whose recognizer accepts both the format and the header wins.

use crate::catalogue::{Cap, Catalogue, Descriptor};
use crate::formats::{open_recognizer, Format, Source};
use crate::{MigrationError, Result};
use tracing::debug;

/// Detection over a catalogue.
pub struct AutoDetect<'a> {
    catalogue: &'a Catalogue,
    delimiter: u8,
}

impl<'a> AutoDetect<'a> {
    pub fn new(catalogue: &'a Catalogue) -> Self {
        Self {
            catalogue,
            delimiter: b',',
        }
    }

    /// CSV delimiter used when sniffing.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn candidates(&self, name: &str) -> Vec<&'a Descriptor> {
        self.catalogue
            .matrix(Cap::IMPORT)
            .remove(name)
            .unwrap_or_default()
    }

    fn sniffable(source: &Source) -> bool {
        source.is_readable() || source.as_path().is_some_and(|path| path.is_dir())
    }

    /// The default adapter of manager `name`.
    pub fn default(&self, name: &str) -> Result<&'a Descriptor> {
        self.candidates(name)
            .into_iter()
            .find(|d| d.default)
            .ok_or_else(|| MigrationError::NoDefaultManager(name.to_string()))
    }

    /// The adapter of manager `name` whose format and header match `source`.
    ///
    /// Falls back to the only candidate without a recognizer when there is
    /// exactly one, and to the default adapter otherwise.
    pub fn format(&self, name: &str, source: &Source) -> Result<&'a Descriptor> {
        let candidates = self.candidates(name);
        if let [only] = candidates.as_slice() {
            return Ok(*only);
        }
        if !Self::sniffable(source) {
            debug!("Nothing to sniff at {}, using the default format", source);
            return self.default(name);
        }

        let mut unknowns = Vec::new();
        for descriptor in &candidates {
            if !descriptor.format.has_recognizer() {
                unknowns.push(*descriptor);
                continue;
            }
            let mut recognizer = open_recognizer(descriptor.format, source, self.delimiter);
            if recognizer.is_format() && recognizer.check_header(&descriptor.header, descriptor.only)
            {
                return Ok(*descriptor);
            }
            debug!("{} rejected {}", descriptor.class_name, source);
        }
        match unknowns.as_slice() {
            [only] => Ok(*only),
            _ => self.default(name),
        }
    }

    /// The first adapter, across all formats, that accepts `source`.
    pub fn manager(&self, source: &Source) -> Option<&'a Descriptor> {
        if !Self::sniffable(source) {
            return None;
        }
        for format in Format::PRIORITY {
            let mut recognizer = open_recognizer(format, source, self.delimiter);
            if !recognizer.is_format() {
                continue;
            }
            debug!("{} looks like {}", source, format);
            let found = self
                .catalogue
                .by_format(format)
                .into_iter()
                .find(|d| recognizer.check_header(&d.header, d.only));
            if found.is_some() {
                return found;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests;
