//! Metadata tokens.
//!
//! A token is a 32-bit value whose high byte names a metadata table and whose low 24 bits are
//! a 1-based row index into it (ECMA-335 II.22). Tokens appear in signatures (through the
//! compressed `TypeDefOrRefOrSpecEncoded` form) and are how the catalog addresses rows
//! across tables.

use std::fmt;

use crate::metadata::tables::TableId;

/// A metadata token: table id in the high byte, 1-based row in the low 24 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Token(pub u32);

impl Token {
    /// Wrap a raw token value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Build a token for `row` in `table`
    #[must_use]
    pub fn from_parts(table: TableId, row: u32) -> Self {
        Token((u32::from(table as u8) << 24) | (row & 0x00FF_FFFF))
    }

    /// The raw 32-bit value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table byte
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row index
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// True if the row part is 0, which encodes "no reference"
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }

    /// True if this token addresses `table`
    #[must_use]
    pub fn is_table(&self, table: TableId) -> bool {
        self.table() == table as u8
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token::new(0x0600_0001);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.row(), 1);
        assert!(token.is_table(TableId::MethodDef));
        assert!(!token.is_null());

        assert_eq!(Token::from_parts(TableId::TypeRef, 0x12), Token(0x0100_0012));
        assert!(Token::from_parts(TableId::TypeDef, 0).is_null());
    }

    #[test]
    fn formatting() {
        let token = Token(0x0200_0005);
        assert_eq!(format!("{token}"), "0x02000005");
        assert_eq!(
            format!("{token:?}"),
            "Token(0x02000005, table: 0x02, row: 5)"
        );
    }
}
