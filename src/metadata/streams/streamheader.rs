use crate::{file::io::read_le, Result};

/// Location and name of one metadata stream, relative to the metadata root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream from the start of the root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Stream name, e.g. `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header from the start of `data`, returning the header and the number of
    /// bytes it occupies (the name is nul-terminated and padded to 4 bytes).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the name is unterminated, longer than 32 bytes
    /// or not ASCII.
    pub fn read(data: &[u8]) -> Result<(StreamHeader, usize)> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let name_area = &data[8..data.len().min(8 + 32)];
        let Some(name_len) = name_area.iter().position(|b| *b == 0) else {
            return Err(malformed_error!("Unterminated stream header name"));
        };

        let name_bytes = &name_area[..name_len];
        if !name_bytes.is_ascii() {
            return Err(malformed_error!("Invalid stream header name - {:?}", name_bytes));
        }

        let name = String::from_utf8_lossy(name_bytes).into_owned();
        let consumed = 8 + ((name_len + 1 + 3) & !3);

        Ok((
            StreamHeader {
                offset: read_le::<u32>(data)?,
                size: read_le::<u32>(&data[4..])?,
                name,
            },
            consumed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x53, 0x74, 0x72, 0x69, 0x6E, 0x67, 0x73, 0x00, 0x00, 0x00, 0x00,
        ];

        let (header, consumed) = StreamHeader::read(&header_bytes).unwrap();

        assert_eq!(header.offset, 0x6C);
        assert_eq!(header.size, 0x45A4);
        assert_eq!(header.name, "#Strings");
        assert_eq!(consumed, 20);
    }

    #[test]
    fn crafted_unterminated() {
        let mut header_bytes = vec![0_u8; 8];
        header_bytes.extend(std::iter::repeat(b'A').take(40));

        assert!(StreamHeader::read(&header_bytes).is_err());
    }
}
