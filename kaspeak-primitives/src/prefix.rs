use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PrefixError {
    #[error("prefix must be ascii")]
    NotAscii,
}

/// 4-byte application tag partitioning traffic among Kaspeak applications.
///
/// Shorter tags are right-padded with `0x00`; longer ones are truncated to
/// four bytes with a warning. The textual form is the tag with trailing
/// padding removed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prefix([u8; Self::SIZE]);

impl Prefix {
    pub const SIZE: usize = 4;

    /// Coerces an ASCII tag into exactly four bytes.
    pub fn coerce(tag: &str) -> Result<Self, PrefixError> {
        if !tag.is_ascii() {
            return Err(PrefixError::NotAscii);
        }

        let bytes = tag.as_bytes();
        if bytes.len() > Self::SIZE {
            warn!(tag, "prefix longer than {} bytes, truncating", Self::SIZE);
        }

        let mut out = [0u8; Self::SIZE];
        for (slot, byte) in out.iter_mut().zip(bytes.iter()) {
            *slot = *byte;
        }
        Ok(Self(out))
    }

    pub const fn from_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::SIZE] {
        &self.0
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        self.0
    }

    /// The tag with trailing `0x00` padding removed.
    pub fn trimmed(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != 0x00)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.0[..end]
    }
}

impl fmt::Debug for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prefix({self})")
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.trimmed() {
            write!(f, "{}", *byte as char)?;
        }
        Ok(())
    }
}
