//! Cursor over a byte slice for decoding signature and attribute blobs.
//!
//! [`crate::file::parser::Parser`] keeps a position inside a borrowed slice and exposes the
//! bounds-checked reads the blob decoders need: little-endian primitives, the ECMA-335
//! compressed integer encodings, `TypeDefOrRefOrSpecEncoded` tokens and the length-prefixed
//! `SerString` used by custom attributes.
//!
//! # Example
//!
//! ```rust
//! use dotinterop::Parser;
//!
//! let data = [0x81, 0x02, 0x05];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_compressed_uint()?, 0x102);
//! assert_eq!(parser.read_compressed_token()?.value(), 0x0100_0001);
//! assert!(!parser.has_more_data());
//! # Ok::<(), dotinterop::Error>(())
//! ```
//!
//! # Reference
//! * [ECMA-335 II.23.2 - Blobs and signatures](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::io::{read_le_at, CilIO},
    metadata::token::Token,
    Result,
};

/// A forward-only reader over a byte slice.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` positioned at the start of `data`
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying slice
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the underlying slice is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True if at least one unread byte remains
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Current offset into the slice
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The full underlying slice
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Move to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the end of the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Skip one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no byte remains.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Skip `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if step > self.remaining() {
            return Err(out_of_bounds_error!());
        }

        self.position += step;
        Ok(())
    }

    /// Look at the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no byte remains.
    pub fn peek_byte(&self) -> Result<u8> {
        match self.data.get(self.position) {
            Some(byte) => Ok(*byte),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Read a little-endian primitive.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the remaining data.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `length` bytes and consume them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        if length > self.remaining() {
            return Err(out_of_bounds_error!());
        }

        let slice = &self.data[self.position..self.position + length];
        self.position += length;
        Ok(slice)
    }

    /// Read a compressed unsigned integer (ECMA-335 II.23.2).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated data or [`crate::Error::Malformed`]
    /// if the lead byte does not start a valid encoding.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let lead = self.read_le::<u8>()?;

        // 0xxxxxxx
        if lead & 0x80 == 0 {
            return Ok(u32::from(lead));
        }

        // 10xxxxxx xxxxxxxx
        if lead & 0xC0 == 0x80 {
            let next = u32::from(self.read_le::<u8>()?);
            return Ok(((u32::from(lead) & 0x3F) << 8) | next);
        }

        // 110xxxxx xxxxxxxx xxxxxxxx xxxxxxxx
        if lead & 0xE0 == 0xC0 {
            let tail = self.read_bytes(3)?;
            return Ok(((u32::from(lead) & 0x1F) << 24)
                | (u32::from(tail[0]) << 16)
                | (u32::from(tail[1]) << 8)
                | u32::from(tail[2]));
        }

        Err(malformed_error!("Invalid compressed uint - {}", lead))
    }

    /// Read a compressed signed integer: the low bit carries the sign.
    ///
    /// # Errors
    /// See [`Parser::read_compressed_uint`].
    pub fn read_compressed_int(&mut self) -> Result<i32> {
        let unsigned = self.read_compressed_uint()?;

        #[allow(clippy::cast_possible_wrap)]
        let magnitude = (unsigned >> 1) as i32;
        if unsigned & 1 == 0 {
            Ok(magnitude)
        } else {
            Ok(-(magnitude + 1))
        }
    }

    /// Read a `TypeDefOrRefOrSpecEncoded` token (ECMA-335 II.23.2.8).
    ///
    /// | Tag | Table |
    /// |-----|-------|
    /// | 0 | TypeDef |
    /// | 1 | TypeRef |
    /// | 2 | TypeSpec |
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for the reserved tag 3.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let encoded = self.read_compressed_uint()?;

        let table: u32 = match encoded & 0x3 {
            0 => 0x0200_0000,
            1 => 0x0100_0000,
            2 => 0x1B00_0000,
            _ => return Err(malformed_error!("Invalid compressed token - {}", encoded)),
        };

        Ok(Token::new(table | (encoded >> 2)))
    }

    /// Read a nul-terminated UTF-8 string, tolerating a missing terminator at the end of data.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the bytes are not valid UTF-8.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let end = self.data[start..]
            .iter()
            .position(|b| *b == 0)
            .map_or(self.data.len(), |p| start + p);

        self.position = if end < self.data.len() { end + 1 } else { end };

        std::str::from_utf8(&self.data[start..end])
            .map(str::to_string)
            .map_err(|e| malformed_error!("Invalid UTF-8 string at offset {} - {}", start, e))
    }

    /// Read a `SerString` (compressed length and UTF-8 bytes), where a lead byte of `0xFF`
    /// encodes a null string.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated data or [`crate::Error::Malformed`]
    /// for invalid UTF-8.
    pub fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_byte()? == 0xFF {
            self.advance()?;
            return Ok(None);
        }

        let length = self.read_compressed_uint()? as usize;
        let start = self.position;
        let bytes = self.read_bytes(length)?;

        std::str::from_utf8(bytes)
            .map(|s| Some(s.to_string()))
            .map_err(|e| malformed_error!("Invalid UTF-8 string at offset {} - {}", start, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn compressed_uint() {
        let test_cases = vec![
            (vec![0x03], 0x03),
            (vec![0x7F], 0x7F),
            (vec![0x80, 0x80], 0x80),
            (vec![0xAE, 0x57], 0x2E57),
            (vec![0xBF, 0xFF], 0x3FFF),
            (vec![0xC0, 0x00, 0x40, 0x00], 0x4000),
            (vec![0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_uint().unwrap(), expected);
            assert!(!parser.has_more_data());
        }
    }

    #[test]
    fn compressed_uint_invalid() {
        let mut parser = Parser::new(&[0xFF]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::Malformed { .. })
        ));

        let mut parser = Parser::new(&[0xC0, 0x00]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn compressed_int() {
        let test_cases = vec![
            (vec![0x06], 3),
            (vec![0x7B], -62),
            (vec![0x80, 0x80], 64),
            (vec![0x01], -1),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_int().unwrap(), expected);
        }
    }

    #[test]
    fn compressed_token() {
        let mut parser = Parser::new(&[0x49, 0x08, 0x0E]);
        assert_eq!(parser.read_compressed_token().unwrap().value(), 0x0100_0012);
        assert_eq!(parser.read_compressed_token().unwrap().value(), 0x0200_0002);
        assert_eq!(parser.read_compressed_token().unwrap().value(), 0x1B00_0003);

        let mut parser = Parser::new(&[0x03]);
        assert!(parser.read_compressed_token().is_err());
    }

    #[test]
    fn strings() {
        let mut parser = Parser::new(b"Hello\0World");
        assert_eq!(parser.read_string_utf8().unwrap(), "Hello");
        assert_eq!(parser.read_string_utf8().unwrap(), "World");
        assert!(!parser.has_more_data());

        let mut parser = Parser::new(&[0x03, b'a', b'b', b'c', 0xFF]);
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some("abc"));
        assert_eq!(parser.read_ser_string().unwrap(), None);
    }

    #[test]
    fn navigation() {
        let data = [1, 2, 3, 4];
        let mut parser = Parser::new(&data);
        parser.advance_by(2).unwrap();
        assert_eq!(parser.peek_byte().unwrap(), 3);
        assert_eq!(parser.read_bytes(2).unwrap(), &[3, 4]);
        assert!(parser.advance().is_err());
        parser.seek(1).unwrap();
        assert_eq!(parser.remaining(), 3);
        assert!(parser.seek(5).is_err());
    }
}
