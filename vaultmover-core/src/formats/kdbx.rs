//! KeePass database recognition by file signature.

use super::{Header, Recognizer, Source};
use crate::Result;

/// Magic bytes for the formats recognized from binary content.
pub mod magic {
    /// First KeePass 2.x signature word
    pub const KDBX: &[u8; 4] = &[0x03, 0xD9, 0xA2, 0x9A];
    pub const PGP_ARMOR: &[u8] = b"-----BEGIN PGP MESSAGE-----";
}

/// Recognizer for KeePass KDBX databases.
pub struct KdbxRecognizer {
    signature: Vec<u8>,
}

impl KdbxRecognizer {
    pub fn open(source: &Source) -> Result<Self> {
        Ok(Self {
            signature: source.read_prefix(magic::KDBX.len())?,
        })
    }
}

impl Recognizer for KdbxRecognizer {
    fn is_format(&mut self) -> bool {
        self.signature.as_slice() == magic::KDBX
    }

    /// A database carries no readable header before it is unlocked.
    fn check_header(&self, _header: &Header, _only: bool) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kdbx_signature() {
        let source = Source::memory(vec![0x03, 0xD9, 0xA2, 0x9A, 0x67, 0xFB, 0x4B, 0xB5]);
        let mut recognizer = KdbxRecognizer::open(&source).unwrap();
        assert!(recognizer.is_format());
        assert!(recognizer.check_header(&Header::None, false));
    }

    #[test]
    fn test_non_kdbx() {
        let source = Source::memory(b"<KeePassFile/>".to_vec());
        let mut recognizer = KdbxRecognizer::open(&source).unwrap();
        assert!(!recognizer.is_format());

        let mut short = KdbxRecognizer::open(&Source::memory(vec![0x03])).unwrap();
        assert!(!short.is_format());
    }
}
