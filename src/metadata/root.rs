//! The metadata root (ECMA-335 II.24.2.1).
//!
//! The root starts with the `BSJB` signature, carries a padded version string and is followed
//! by the stream headers that locate `#~`, `#Strings`, `#Blob`, `#GUID` and `#US` relative to
//! the start of the root.

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Result,
};

/// The `BSJB` signature that opens every metadata root
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// Parsed metadata root
pub struct Root {
    /// Always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version, 1
    pub major_version: u16,
    /// Minor version, 1
    pub minor_version: u16,
    /// Runtime version string, e.g. `WindowsRuntime 1.4`
    pub version: String,
    /// Reserved flags
    pub flags: u16,
    /// The stream headers in declaration order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root at the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature is wrong, the version string or a
    /// stream header runs past the data, or no streams are declared.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(out_of_bounds_error!());
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let major_version = read_le::<u16>(&data[4..])?;
        let minor_version = read_le::<u16>(&data[6..])?;

        let version_length = read_le_at::<u32>(data, &mut 12)? as usize;
        let Some(version_end) = version_length.checked_add(16) else {
            return Err(malformed_error!(
                "Version string length causing integer overflow - {}",
                version_length
            ));
        };
        if version_end + 4 > data.len() {
            return Err(out_of_bounds_error!());
        }

        let version_bytes = &data[16..version_end];
        let version_text = version_bytes
            .iter()
            .position(|b| *b == 0)
            .map_or(version_bytes, |end| &version_bytes[..end]);
        let version = String::from_utf8_lossy(version_text).into_owned();

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 {
            return Err(malformed_error!("No valid streams have been found"));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_count));
        for _ in 0..stream_count {
            if offset > data.len() {
                return Err(out_of_bounds_error!());
            }

            let (header, consumed) = StreamHeader::read(&data[offset..])?;
            match header.offset.checked_add(header.size) {
                Some(end) if end as usize <= data.len() => {}
                Some(_) => return Err(out_of_bounds_error!()),
                None => {
                    return Err(malformed_error!(
                        "Stream offset and size cause integer overflow - {} + {}",
                        header.offset,
                        header.size
                    ))
                }
            }

            offset += consumed;
            stream_headers.push(header);
        }

        Ok(Root {
            signature,
            major_version,
            minor_version,
            version,
            flags,
            stream_headers,
        })
    }

    /// Find a stream header by name
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00,
            b'v', b'4', b'.', b'0', b'.', b'3', 0x00, 0x00,
            0x00, 0x00,
            0x02, 0x00,

            0x30, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,

            0x34, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            b'#', b'B', b'l', b'o', b'b', 0x00, 0x00, 0x00,

            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let root = Root::read(&header_bytes).unwrap();

        assert_eq!(root.signature, CIL_HEADER_MAGIC);
        assert_eq!(root.major_version, 1);
        assert_eq!(root.version, "v4.0.3");
        assert_eq!(root.stream_headers.len(), 2);
        assert_eq!(root.stream("#~").unwrap().offset, 0x30);
        assert_eq!(root.stream("#Blob").unwrap().offset, 0x34);
        assert!(root.stream("#GUID").is_none());
    }

    #[test]
    fn bad_magic() {
        let mut data = [0_u8; 40];
        data[0] = 0x42;
        assert!(Root::read(&data).is_err());
    }

    #[test]
    fn stream_out_of_range() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            b'v', b'4', 0x00, 0x00,
            0x00, 0x00,
            0x01, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x00, 0x01, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,
        ];

        assert!(Root::read(&header_bytes).is_err());
    }
}
