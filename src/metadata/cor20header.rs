//! The CLI header (ECMA-335 II.25.3.3).
//!
//! The CLR runtime data directory of the PE points at this 72-byte structure. Generating
//! bindings only needs the location of the metadata root, so the remaining directories are
//! read past and not retained.

use crate::{file::parser::Parser, Result};

/// Size of the CLI header in bytes
pub const COR20_HEADER_SIZE: usize = 72;

/// The fields of the CLI header that locate the metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of the header, always 72
    pub cb: u32,
    /// Minimum runtime major version
    pub major_runtime_version: u16,
    /// Minimum runtime minor version
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata in bytes
    pub meta_data_size: u32,
    /// Runtime flags (`COMIMAGE_FLAGS_*`)
    pub flags: u32,
}

impl Cor20Header {
    /// Parse a CLI header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 72 bytes and
    /// [`crate::Error::Malformed`] if `cb` is wrong or the metadata directory is empty.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < COR20_HEADER_SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb as usize != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!(
                "Metadata directory is empty - rva {}, size {}",
                meta_data_rva,
                meta_data_size
            ));
        }

        let flags = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(rva: u32, size: u32) -> Vec<u8> {
        let mut data = vec![0_u8; COR20_HEADER_SIZE];
        data[0..4].copy_from_slice(&72_u32.to_le_bytes());
        data[4..6].copy_from_slice(&2_u16.to_le_bytes());
        data[6..8].copy_from_slice(&5_u16.to_le_bytes());
        data[8..12].copy_from_slice(&rva.to_le_bytes());
        data[12..16].copy_from_slice(&size.to_le_bytes());
        data[16..20].copy_from_slice(&1_u32.to_le_bytes());
        data
    }

    #[test]
    fn crafted() {
        let header = Cor20Header::read(&header_bytes(0x2048, 0x1234)).unwrap();

        assert_eq!(header.cb, 72);
        assert_eq!(header.major_runtime_version, 2);
        assert_eq!(header.minor_runtime_version, 5);
        assert_eq!(header.meta_data_rva, 0x2048);
        assert_eq!(header.meta_data_size, 0x1234);
        assert_eq!(header.flags, 1);
    }

    #[test]
    fn invalid() {
        assert!(Cor20Header::read(&[0_u8; 16]).is_err());
        assert!(Cor20Header::read(&header_bytes(0, 0x10)).is_err());

        let mut bad_cb = header_bytes(0x2048, 0x10);
        bad_cb[0] = 0x40;
        assert!(Cor20Header::read(&bad_cb).is_err());
    }
}
