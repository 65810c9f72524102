//! Access to the PE container that carries a metadata image.
//!
//! WinMD files are ordinary PE images whose CLR data directory points at a Cor20 header, which
//! in turn locates the metadata root. [`File`] owns the raw bytes through a [`Backend`]
//! (memory-mapped from disk or held in memory) and keeps the parsed `goblin` PE borrowing from
//! them, so that RVAs can be translated into file offsets for the lifetime of the file.
//!
//! # Key Components
//! - [`File`] - owner of the bytes plus the parsed PE headers
//! - [`io`] - bounds-checked little-endian primitive reads
//! - [`parser`] - [`parser::Parser`], a cursor for signature and attribute blobs
//!
//! # Example
//!
//! ```rust,no_run
//! use dotinterop::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("Windows.Win32.winmd"))?;
//! let (clr_rva, clr_size) = file.clr()?;
//! let offset = file.rva_to_offset(clr_rva)?;
//! let cor20 = file.data_slice(offset, clr_size)?;
//! # Ok::<(), dotinterop::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::{section_table::SectionTable, PE};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Storage behind a [`File`].
pub trait Backend: Send + Sync {
    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// All bytes of the backend
    fn data(&self) -> &[u8];

    /// Number of bytes held by the backend
    fn len(&self) -> usize;
}

/// A loaded PE image that is known to carry a CLR runtime header.
#[self_referencing]
pub struct File {
    data: Box<dyn Backend>,
    #[borrows(data)]
    #[not_covariant]
    pe: PE<'this>,
}

impl File {
    /// Memory-map and parse the file at `file`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened,
    /// [`crate::Error::GoblinErr`] if it is not a PE image, and [`crate::Error::Malformed`]
    /// if it has no CLR runtime header.
    pub fn from_file(file: &Path) -> Result<File> {
        Self::load(Physical::new(file)?)
    }

    /// Parse an image that is already in memory.
    ///
    /// # Errors
    /// See [`File::from_file`]; additionally [`crate::Error::Empty`] for empty input.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        Self::load(Memory::new(data))
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        File::try_new(Box::new(data), |data| {
            let pe = PE::parse(data.data()).map_err(GoblinErr)?;
            let Some(optional_header) = pe.header.optional_header else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            match optional_header.data_directories.get_clr_runtime_header() {
                Some(clr) if clr.virtual_address != 0 && clr.size != 0 => Ok(pe),
                _ => Err(malformed_error!(
                    "File does not have a CLR runtime header directory"
                )),
            }
        })
    }

    /// Size of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// True if the image holds no bytes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// RVA and size of the CLR runtime header.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the directory vanished, which `load` rules out.
    pub fn clr(&self) -> Result<(usize, usize)> {
        self.with_pe(|pe| {
            let Some(optional_header) = pe.header.optional_header else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            match optional_header.data_directories.get_clr_runtime_header() {
                Some(dir) => Ok((dir.virtual_address as usize, dir.size as usize)),
                None => Err(malformed_error!("File does not have a CLR runtime header")),
            }
        })
    }

    /// Section headers of the image
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.with_pe(|pe| pe.sections.iter())
    }

    /// All bytes of the image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Borrow `len` bytes at file offset `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Translate a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section maps `rva` or a section header
    /// overflows.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        self.with_pe(|pe| {
            for section in &pe.sections {
                let Some(section_max) = section.virtual_address.checked_add(section.virtual_size)
                else {
                    return Err(malformed_error!(
                        "Section malformed, causing integer overflow - {} + {}",
                        section.virtual_address,
                        section.virtual_size
                    ));
                };

                if section.virtual_address <= rva_u32 && section_max > rva_u32 {
                    return Ok((rva - section.virtual_address as usize)
                        + section.pointer_to_raw_data as usize);
                }
            }

            Err(malformed_error!(
                "RVA could not be converted to offset - {}",
                rva
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{build_pe, MetadataBuilder};

    fn metadata() -> Vec<u8> {
        MetadataBuilder::new("Test.winmd").finish()
    }

    #[test]
    fn load_crafted_pe() {
        let image = build_pe(&metadata());
        let file = File::from_mem(image).unwrap();

        let (clr_rva, clr_size) = file.clr().unwrap();
        assert_eq!(clr_size, 72);

        let offset = file.rva_to_offset(clr_rva).unwrap();
        let cor20 = file.data_slice(offset, clr_size).unwrap();
        assert_eq!(u32::from_le_bytes([cor20[0], cor20[1], cor20[2], cor20[3]]), 72);
        assert_eq!(file.sections().count(), 1);
    }

    #[test]
    fn reject_empty() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Empty)));
    }

    #[test]
    fn reject_garbage() {
        assert!(File::from_mem(vec![0xCC; 512]).is_err());
    }

    #[test]
    fn rva_outside_sections() {
        let file = File::from_mem(build_pe(&metadata())).unwrap();
        assert!(file.rva_to_offset(0x10).is_err());
        assert!(file.rva_to_offset(0x0100_0000).is_err());
    }
}
