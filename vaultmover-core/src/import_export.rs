//! Generic CSV import/export and JSON export of cleaned entries

use crate::entry::{Entry, Value, GROUP, KEYSLIST, PATH, TITLE};
use crate::formats::csv::reader;
use crate::formats::Source;
use crate::managers::{Exporter, Importer, ManagerSettings};
use crate::{MigrationError, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Open the destination file, or stdout when none is given.
///
/// An existing file is only replaced with `force`.
fn create_output(out: Option<&Path>, force: bool) -> Result<Box<dyn Write>> {
    let Some(path) = out else {
        return Ok(Box::new(std::io::stdout()));
    };
    if path.is_file() && !force {
        return Err(MigrationError::Manager(format!(
            "{} is already a file",
            path.display()
        )));
    }
    info!("Writing {}", path.display());
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

/// Split a cleaned `path` into `group` (under `root`) and `title`.
fn split_path(entry: &mut Entry, root: &str) {
    let path = entry
        .remove(PATH)
        .and_then(|v| v.as_text().map(str::to_string))
        .unwrap_or_default();
    let (group, title) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
    let group = match (root.trim_end_matches('/'), group) {
        ("", group) => group.to_string(),
        (root, "") => root.to_string(),
        (root, group) => format!("{}/{}", root, group),
    };
    entry.set(GROUP, group);
    entry.set(TITLE, title);
}

/// Importer for CSV files whose columns are described with `--cols`.
pub struct GenericCsvImporter {
    fieldnames: Vec<String>,
    delimiter: u8,
}

impl GenericCsvImporter {
    pub fn new(settings: &ManagerSettings) -> Result<Self> {
        if !settings.cols.contains(',') {
            return Err(MigrationError::Format(
                "no columns to map to credential attributes".to_string(),
            ));
        }
        Ok(Self {
            fieldnames: settings.cols.split(',').map(str::to_string).collect(),
            delimiter: settings.delimiter,
        })
    }
}

impl Importer for GenericCsvImporter {
    fn parse(&self, source: &Source) -> Result<Vec<Entry>> {
        let text = source.read_text()?;
        let mut records = reader(&text, self.delimiter).into_records();
        // The first row is a header in the user's own naming.
        if records.next().transpose()?.is_none() {
            return Err(MigrationError::Format("empty CSV file".to_string()));
        }

        let mut entries = Vec::new();
        for record in records {
            let record = record?;
            let mut entry = Entry::new();
            for (name, value) in self.fieldnames.iter().zip(record.iter()) {
                if !name.is_empty() {
                    entry.set(name.as_str(), value);
                }
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Exporter writing one CSV row per entry.
pub struct CsvExporter {
    writer: csv::Writer<Box<dyn Write>>,
    root: String,
    all: bool,
    fieldnames: Vec<String>,
}

impl CsvExporter {
    pub fn open(out: Option<&Path>, settings: &ManagerSettings) -> Result<Self> {
        let output = create_output(out, settings.force)?;
        let writer = csv::WriterBuilder::new()
            .delimiter(settings.delimiter)
            .from_writer(output);
        Ok(Self {
            writer,
            root: settings.destination_root.clone(),
            all: settings.all,
            fieldnames: Vec::new(),
        })
    }
}

impl Exporter for CsvExporter {
    /// Fix the column set and write the header row.
    fn prepare(&mut self, entries: &[Entry]) -> Result<()> {
        let mut fieldnames: BTreeSet<String> = KEYSLIST.iter().map(|k| k.to_string()).collect();
        if self.all {
            for entry in entries {
                fieldnames.extend(entry.keys().filter(|k| *k != PATH).map(str::to_string));
            }
        }
        self.fieldnames = fieldnames.into_iter().collect();
        self.writer.write_record(&self.fieldnames)?;
        Ok(())
    }

    fn insert(&mut self, entry: &Entry) -> Result<()> {
        if entry.is_attachment() {
            return Err(MigrationError::Manager(format!(
                "binary attachment {} cannot be written to CSV",
                entry.path()
            )));
        }
        let mut row = entry.clone();
        split_path(&mut row, &self.root);
        let record: Vec<String> = self
            .fieldnames
            .iter()
            .map(|key| row.get(key).map(Value::to_string).unwrap_or_default())
            .collect();
        self.writer.write_record(&record)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Exporter writing all entries as one pretty-printed JSON array.
pub struct JsonExporter {
    output: Box<dyn Write>,
    root: String,
    entries: Vec<serde_json::Value>,
}

impl JsonExporter {
    pub fn open(out: Option<&Path>, settings: &ManagerSettings) -> Result<Self> {
        Ok(Self {
            output: create_output(out, settings.force)?,
            root: settings.destination_root.clone(),
            entries: Vec::new(),
        })
    }
}

impl Exporter for JsonExporter {
    fn insert(&mut self, entry: &Entry) -> Result<()> {
        let mut entry = entry.clone();
        if !self.root.is_empty() {
            let path = format!("{}/{}", self.root.trim_end_matches('/'), entry.path());
            entry.set(PATH, path);
        }
        self.entries.push(entry.to_json());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.output, &self.entries)?;
        self.output.write_all(b"\n")?;
        self.output.flush()?;
        Ok(())
    }
}
