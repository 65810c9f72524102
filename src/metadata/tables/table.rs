use std::marker::PhantomData;

use crate::{
    metadata::tables::{TableId, TableInfoRef},
    Result,
};

/// A row type that can be decoded from the `#~` stream.
pub trait RowReadable: Sized {
    /// The table this row type belongs to
    const TABLE_ID: TableId;

    /// Decode the row `rid` at `offset`, advancing `offset` past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row runs past `data`, or
    /// [`crate::Error::Malformed`] for an invalid coded index.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self>;
}

/// A typed view over the rows of one metadata table.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    sizes: TableInfoRef,
    _phantom: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Create a view over `data`, which must start at the first row of the table.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than the table.
    pub fn new(data: &'a [u8], sizes: TableInfoRef) -> Result<Self> {
        let row_count = sizes.rows(T::TABLE_ID);
        let row_size = sizes.row_size(T::TABLE_ID);
        let size = row_count as usize * row_size as usize;
        if size > data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(MetadataTable {
            data: &data[..size],
            row_count,
            row_size,
            sizes,
            _phantom: PhantomData,
        })
    }

    /// Size of the table in bytes
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.row_count) * u64::from(self.row_size)
    }

    /// Size of one row in bytes
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Number of rows
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Decode the row with 1-based index `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for `rid` 0 or past the last row.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(out_of_bounds_error!());
        }

        let mut offset = (rid as usize - 1) * self.row_size as usize;
        T::row_read(self.data, &mut offset, rid, &self.sizes)
    }

    /// Iterate over all rows in order
    #[must_use]
    pub fn iter(&self) -> TableIterator<'_, 'a, T> {
        TableIterator {
            table: self,
            current_row: 0,
            current_offset: 0,
        }
    }
}

/// Iterator over the rows of a [`MetadataTable`]; yields an error and stops on a bad row
pub struct TableIterator<'t, 'a, T> {
    table: &'t MetadataTable<'a, T>,
    current_row: u32,
    current_offset: usize,
}

impl<T: RowReadable> Iterator for TableIterator<'_, '_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.table.row_count {
            return None;
        }

        let row = T::row_read(
            self.table.data,
            &mut self.current_offset,
            self.current_row + 1,
            &self.table.sizes,
        );

        self.current_row = if row.is_ok() {
            self.current_row + 1
        } else {
            self.table.row_count
        };
        Some(row)
    }
}
