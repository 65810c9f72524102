use std::sync::Arc;

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::read_le,
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo, TableInfoRef},
    Result,
};

/// The `#~` stream: the compressed metadata tables (ECMA-335 II.24.2.6).
///
/// The header records which tables are present and their row counts; the tables follow
/// back to back. Only offsets are computed here, rows are decoded on access through
/// [`TablesHeader::table`].
pub struct TablesHeader<'a> {
    /// Major version of the table schema, 2
    pub major_version: u8,
    /// Minor version of the table schema, 0
    pub minor_version: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Shared sizing information
    pub info: TableInfoRef,
    data: &'a [u8],
    offsets: Vec<Option<usize>>,
}

impl<'a> TablesHeader<'a> {
    /// Parse the tables stream header and locate every present table.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if a table runs past the stream and
    /// [`crate::Error::Malformed`] if no table is present.
    pub fn from(data: &'a [u8]) -> Result<TablesHeader<'a>> {
        if data.len() < 24 {
            return Err(out_of_bounds_error!());
        }

        let valid = read_le::<u64>(&data[8..])?;
        if valid == 0 {
            return Err(malformed_error!("No valid rows in any of the tables"));
        }

        let info = Arc::new(TableInfo::new(data, valid)?);

        let heap_sizes = data[6];
        let mut current_offset = 24 + valid.count_ones() as usize * 4;
        if heap_sizes & 0x40 != 0 {
            // Extra data after the row counts
            current_offset += 4;
        }

        let mut offsets = vec![None; TableId::COUNT];
        for table_id in TableId::iter() {
            if valid & (1 << table_id as u64) == 0 {
                continue;
            }

            let size = info.rows(table_id) as usize * info.row_size(table_id) as usize;
            let Some(end) = current_offset.checked_add(size) else {
                return Err(out_of_bounds_error!());
            };
            if end > data.len() {
                return Err(out_of_bounds_error!());
            }

            offsets[table_id as usize] = Some(current_offset);
            current_offset = end;
        }

        Ok(TablesHeader {
            major_version: data[4],
            minor_version: data[5],
            valid,
            sorted: read_le::<u64>(&data[16..])?,
            info,
            data,
            offsets,
        })
    }

    /// Number of present tables
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Number of rows in `table`, 0 if absent
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.info.rows(table)
    }

    /// Typed access to the table of row type `T`, `None` if the table is absent.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the table does not fit the stream.
    pub fn table<T: RowReadable>(&self) -> Result<Option<MetadataTable<'a, T>>> {
        match self.offsets[T::TABLE_ID as usize] {
            Some(offset) => Ok(Some(MetadataTable::new(
                &self.data[offset..],
                self.info.clone(),
            )?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::{ModuleRefRaw, TypeRefRaw};

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let mut data = vec![
            0x00, 0x00, 0x00, 0x00, // reserved
            0x02, 0x00,             // version
            0x00,                   // heap sizes
            0x01,                   // reserved
        ];
        let valid: u64 = (1 << 0x01) | (1 << 0x1A);
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        data.extend_from_slice(&2_u32.to_le_bytes()); // TypeRef rows
        data.extend_from_slice(&1_u32.to_le_bytes()); // ModuleRef rows

        #[rustfmt::skip]
        data.extend_from_slice(&[
            0x06, 0x00, 0x10, 0x00, 0x20, 0x00, // TypeRef 1
            0x06, 0x00, 0x30, 0x00, 0x40, 0x00, // TypeRef 2
            0x50, 0x00,                         // ModuleRef 1
        ]);

        let header = TablesHeader::from(&data).unwrap();
        assert_eq!(header.major_version, 2);
        assert_eq!(header.table_count(), 2);
        assert_eq!(header.rows(TableId::TypeRef), 2);

        let typerefs = header.table::<TypeRefRaw>().unwrap().unwrap();
        assert_eq!(typerefs.get(2).unwrap().type_name, 0x30);

        let modulerefs = header.table::<ModuleRefRaw>().unwrap().unwrap();
        assert_eq!(modulerefs.get(1).unwrap().name, 0x50);

        assert!(header
            .table::<crate::metadata::tables::TypeDefRaw>()
            .unwrap()
            .is_none());
    }

    #[test]
    fn truncated() {
        let mut data = vec![0_u8; 8];
        data.extend_from_slice(&(1_u64 << 0x01).to_le_bytes());
        data.extend_from_slice(&0_u64.to_le_bytes());
        data.extend_from_slice(&4_u32.to_le_bytes());
        data.extend_from_slice(&[0x00; 6]);

        assert!(TablesHeader::from(&data).is_err());
        assert!(TablesHeader::from(&[0_u8; 24]).is_err());
    }
}
