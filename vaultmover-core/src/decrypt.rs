//! Decrypt pre-pass: sniff the leading bytes of a source file and, when it
//! is an encrypted container a decrypter knows, replace it with the
//! plaintext held in memory.

use crate::formats::kdbx::magic;
use crate::formats::Source;
use crate::process::Tool;
use crate::{MigrationError, Result};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 2048;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

const KDBX_MIME: &str = "application/x-keepass2";

/// Container formats recognized from binary content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Gpg,
    Kdbx,
    Sqlite,
}

impl Container {
    pub fn tag(self) -> &'static str {
        match self {
            Container::Gpg => "gpg",
            Container::Kdbx => "kdbx",
            Container::Sqlite => "sqlite3",
        }
    }
}

/// What the leading bytes of a file revealed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sniffed {
    pub container: Option<Container>,
    /// Text starting with a UTF-8 byte order mark.
    pub bom: bool,
}

/// Tag and body offset of the OpenPGP packet starting at `header[0]`.
fn packet_body(header: &[u8]) -> Option<(u8, usize)> {
    let first = *header.first()?;
    if first & 0x80 == 0 {
        return None;
    }
    if first & 0x40 != 0 {
        let tag = first & 0x3F;
        let len = *header.get(1)?;
        let offset = match len {
            0..=191 => 2,
            192..=223 => 3,
            255 => 6,
            _ => 2,
        };
        Some((tag, offset))
    } else {
        let tag = (first >> 2) & 0x0F;
        let offset = match first & 0x03 {
            0 => 2,
            1 => 3,
            2 => 5,
            _ => 1,
        };
        Some((tag, offset))
    }
}

/// An OpenPGP message starts with an encrypted session key packet: public
/// key (tag 1, version 3 or 6) or symmetric (tag 3, version 4 to 6).
fn is_pgp_packet(header: &[u8]) -> bool {
    let Some((tag, offset)) = packet_body(header) else {
        return false;
    };
    match (tag, header.get(offset)) {
        (1, Some(3 | 6)) => true,
        (3, Some(4..=6)) => true,
        _ => false,
    }
}

fn is_kdbx(buf: &[u8]) -> bool {
    buf.starts_with(magic::KDBX)
}

/// Database containers known to `infer`, extended with the KeePass signature.
fn database(header: &[u8]) -> Option<Container> {
    let mut matchers = infer::Infer::new();
    matchers.add(KDBX_MIME, "kdbx", is_kdbx);
    match matchers.get(header)?.extension() {
        "kdbx" => Some(Container::Kdbx),
        "sqlite" => Some(Container::Sqlite),
        _ => None,
    }
}

pub fn sniff(header: &[u8]) -> Sniffed {
    let container = if header.starts_with(magic::PGP_ARMOR) || is_pgp_packet(header) {
        Some(Container::Gpg)
    } else {
        database(header)
    };
    Sniffed {
        container,
        bom: header.starts_with(UTF8_BOM),
    }
}

/// Turns an encrypted file into plaintext.
pub trait Decrypter {
    fn container(&self) -> Container;

    fn decrypt(&self, path: &Path) -> Result<Zeroizing<Vec<u8>>>;
}

/// Decrypter driving `gpg2` or `gpg` in batch mode.
#[derive(Debug, Default)]
pub struct GpgDecrypter;

impl Decrypter for GpgDecrypter {
    fn container(&self) -> Container {
        Container::Gpg
    }

    fn decrypt(&self, path: &Path) -> Result<Zeroizing<Vec<u8>>> {
        let tool = Tool::locate(&["gpg2", "gpg"], "install GnuPG from https://gnupg.org")?;
        let args = [
            OsStr::new("--with-colons"),
            OsStr::new("--batch"),
            OsStr::new("--decrypt"),
            path.as_os_str(),
        ];
        let output = tool.run(&args, None)?;
        if !output.success() {
            return Err(MigrationError::Format(format!(
                "{} {}",
                output.stderr,
                String::from_utf8_lossy(&output.stdout)
            )));
        }
        let mut plaintext = output.stdout;
        if plaintext.last() == Some(&b'\n') {
            plaintext.pop();
        }
        Ok(plaintext)
    }
}

/// The registered decrypters.
pub struct Decrypters {
    decrypters: Vec<Box<dyn Decrypter>>,
}

impl Default for Decrypters {
    fn default() -> Self {
        Self {
            decrypters: vec![Box::new(GpgDecrypter)],
        }
    }
}

impl Decrypters {
    pub fn new(decrypters: Vec<Box<dyn Decrypter>>) -> Self {
        Self { decrypters }
    }

    pub fn get(&self, container: Container) -> Option<&dyn Decrypter> {
        self.decrypters
            .iter()
            .find(|d| d.container() == container)
            .map(|d| d.as_ref())
    }

    /// Decrypt `source` when it is a file in a container one of the
    /// decrypters handles. Anything else is returned unchanged.
    pub fn prepare(&self, source: Source) -> Result<Source> {
        let Some(path) = source.as_path().filter(|path| path.is_file()) else {
            return Ok(source);
        };
        let sniffed = sniff(&source.read_prefix(SNIFF_LEN)?);
        if sniffed.bom {
            debug!("{} starts with a UTF-8 byte order mark", path.display());
        }
        let Some(decrypter) = sniffed.container.and_then(|c| self.get(c)) else {
            return Ok(source);
        };
        let plaintext = decrypter.decrypt(path)?;
        info!(
            "Source file decrypted using {}",
            decrypter.container().tag()
        );
        Ok(Source::Memory(plaintext))
    }
}
