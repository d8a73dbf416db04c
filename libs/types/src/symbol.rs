//! Fixed 16-byte zero-padded ASCII instrument identifier.

use std::fmt;

use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Instrument symbol as carried on the wire.
///
/// Always exactly 16 bytes; shorter names are zero-padded, longer names
/// are truncated at construction. The padding bytes never carry
/// information, so equality on the raw array is equality on the name.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, AsBytes, FromBytes, FromZeroes)]
pub struct Symbol(pub [u8; Symbol::LEN]);

impl Symbol {
    pub const LEN: usize = 16;

    /// Build a symbol from a string, truncating to 16 bytes.
    pub fn new(name: &str) -> Self {
        let mut buf = [0u8; Self::LEN];
        let bytes = name.as_bytes();
        let n = bytes.len().min(Self::LEN);
        buf[..n].copy_from_slice(&bytes[..n]);
        Symbol(buf)
    }

    /// Name with trailing zero padding stripped.
    ///
    /// Falls back to an empty string if the buffer holds non-UTF-8
    /// bytes, which a conforming producer never writes.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(Self::LEN);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Symbol([0u8; Self::LEN])
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The raw byte array is never useful in logs.
impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}
