//! Registry of supported password-manager adapters.
//!
//! Every adapter is described by a static [`Descriptor`]: its display name,
//! structural format, capabilities and the header used to recognize its
//! exports. The [`Catalogue`] indexes descriptors by name and class name and
//! builds the ordered candidate lists detection relies on.

use crate::formats::{Format, Header};
use crate::managers::ManagerKind;
use crate::{MigrationError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;
use tracing::warn;

/// Capability set of an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cap(u8);

impl Cap {
    pub const IMPORT: Cap = Cap(1 << 0);
    pub const EXPORT: Cap = Cap(1 << 1);
    /// Participates in automatic format detection.
    pub const FORMAT: Cap = Cap(1 << 2);
    pub const DECRYPT: Cap = Cap(1 << 3);

    pub const fn empty() -> Self {
        Cap(0)
    }

    pub const fn contains(self, other: Cap) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Cap) -> Self {
        Cap(self.0 | other.0)
    }
}

impl BitOr for Cap {
    type Output = Cap;

    fn bitor(self, rhs: Cap) -> Cap {
        self.union(rhs)
    }
}

impl fmt::Display for Cap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        for (cap, name) in [
            (Cap::IMPORT, "import"),
            (Cap::EXPORT, "export"),
            (Cap::FORMAT, "format"),
            (Cap::DECRYPT, "decrypt"),
        ] {
            if self.contains(cap) {
                names.push(name);
            }
        }
        f.write_str(&names.join("|"))
    }
}

/// Static description of one manager adapter.
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// Unique identifier, e.g. `BitwardenCSV`.
    pub class_name: &'static str,
    /// User-facing manager name, shared by all formats of a manager.
    pub name: &'static str,
    pub format: Format,
    pub version: &'static str,
    pub cap: Cap,
    /// Picked when the user names the manager but the format is unknown.
    pub default: bool,
    /// CSV only: the column count must equal the header's.
    pub only: bool,
    pub header: Header,
    pub description: &'static str,
    pub url: &'static str,
    /// How to produce the export in the manager itself.
    pub export_hint: &'static str,
    /// Example command line for the import.
    pub import_hint: &'static str,
    /// False for plain-text exports, which warrant a warning.
    pub secure: bool,
    pub kind: ManagerKind,
}

impl Descriptor {
    pub fn new(
        class_name: &'static str,
        name: &'static str,
        format: Format,
        kind: ManagerKind,
    ) -> Self {
        Self {
            class_name,
            name,
            format,
            version: "",
            cap: Cap::FORMAT | Cap::IMPORT,
            default: true,
            only: false,
            header: Header::None,
            description: "",
            url: "",
            export_hint: "",
            import_hint: "",
            secure: format == Format::Kdbx,
            kind,
        }
    }

    pub fn version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    pub fn cap(mut self, cap: Cap) -> Self {
        self.cap = cap;
        self
    }

    pub fn non_default(mut self) -> Self {
        self.default = false;
        self
    }

    pub fn only(mut self) -> Self {
        self.only = true;
        self
    }

    pub fn header(mut self, header: Header) -> Self {
        self.header = header;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn describe(mut self, description: &'static str, url: &'static str) -> Self {
        self.description = description;
        self.url = url;
        self
    }

    pub fn hints(mut self, export_hint: &'static str, import_hint: &'static str) -> Self {
        self.export_hint = export_hint;
        self.import_hint = import_hint;
        self
    }
}

/// Builder collecting descriptors in registration order.
#[derive(Default)]
pub struct CatalogueBuilder {
    descriptors: Vec<Descriptor>,
}

impl CatalogueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. A class name already registered is ignored.
    pub fn register(mut self, descriptor: Descriptor) -> Self {
        if self
            .descriptors
            .iter()
            .any(|d| d.class_name == descriptor.class_name)
        {
            warn!("Duplicate manager class {} ignored", descriptor.class_name);
            return self;
        }
        self.descriptors.push(descriptor);
        self
    }

    pub fn build(self) -> Catalogue {
        Catalogue {
            descriptors: self.descriptors,
        }
    }
}

/// Immutable registry of adapters, queried by detection and the CLI.
#[derive(Debug, Clone)]
pub struct Catalogue {
    descriptors: Vec<Descriptor>,
}

impl Catalogue {
    /// The catalogue of all built-in adapters.
    pub fn builtin() -> Self {
        crate::managers::register_builtin(CatalogueBuilder::new()).build()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Sorted, de-duplicated display names of adapters with `cap`.
    pub fn names(&self, cap: Cap) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .descriptors
            .iter()
            .filter(|d| d.cap.contains(cap))
            .map(|d| d.name)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Class names of adapters with `cap`, in registration order.
    pub fn classnames(&self, cap: Cap) -> Vec<&'static str> {
        self.descriptors
            .iter()
            .filter(|d| d.cap.contains(cap))
            .map(|d| d.class_name)
            .collect()
    }

    /// Descriptors of a format that take part in detection, in registration
    /// order.
    pub fn by_format(&self, format: Format) -> Vec<&Descriptor> {
        self.descriptors
            .iter()
            .filter(|d| d.format == format && d.cap.contains(Cap::FORMAT | Cap::IMPORT))
            .collect()
    }

    /// Name to descriptors with `cap`. Within one name the default
    /// descriptor comes first, then the others ordered by format tag.
    pub fn matrix(&self, cap: Cap) -> BTreeMap<&'static str, Vec<&Descriptor>> {
        let mut matrix: BTreeMap<&'static str, Vec<&Descriptor>> = BTreeMap::new();
        for descriptor in self.descriptors.iter().filter(|d| d.cap.contains(cap)) {
            matrix.entry(descriptor.name).or_default().push(descriptor);
        }
        for descriptors in matrix.values_mut() {
            descriptors.sort_by(|a, b| {
                b.default
                    .cmp(&a.default)
                    .then_with(|| a.format.tag().cmp(b.format.tag()))
            });
        }
        matrix
    }

    /// Resolve an adapter.
    ///
    /// `name` is first tried as a class name. Otherwise it is a display name
    /// and the descriptor with the exact `format` and `version` wins, falling
    /// back to the manager's first (default) descriptor.
    pub fn get(
        &self,
        name: &str,
        format: Option<Format>,
        version: Option<&str>,
        cap: Cap,
    ) -> Result<&Descriptor> {
        if let Some(descriptor) = self
            .descriptors
            .iter()
            .find(|d| d.class_name == name && d.cap.contains(cap))
        {
            return Ok(descriptor);
        }

        let matrix = self.matrix(cap);
        let candidates = matrix
            .get(name)
            .ok_or_else(|| MigrationError::UnknownManager(name.to_string()))?;

        if format.is_some() || version.is_some() {
            if let Some(exact) = candidates.iter().copied().find(|d| {
                format.map_or(true, |f| d.format == f) && version.map_or(true, |v| d.version == v)
            }) {
                return Ok(exact);
            }
        }
        candidates
            .first()
            .copied()
            .ok_or_else(|| MigrationError::UnknownManager(name.to_string()))
    }
}
