use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A row of the `ClassLayout` table (ECMA-335 II.22.8)
#[derive(Clone, Debug)]
pub struct ClassLayoutRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Field alignment in bytes, 0 for the platform default
    pub packing_size: u16,
    /// Total size in bytes, 0 if not fixed
    pub class_size: u32,
    /// TypeDef row this layout applies to
    pub parent: u32,
}

impl RowReadable for ClassLayoutRaw {
    const TABLE_ID: TableId = TableId::ClassLayout;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ClassLayoutRaw {
            rid,
            token: Token::from_parts(TableId::ClassLayout, rid),
            packing_size: read_le_at::<u16>(data, offset)?,
            class_size: read_le_at::<u32>(data, offset)?,
            parent: read_le_at_dyn(data, offset, sizes.is_large(TableId::TypeDef))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::metadata::tables::{MetadataTable, TableInfo};

    use super::*;

    #[test]
    fn crafted_short() {
        let data = vec![
            0x01, 0x00, // packing_size
            0x10, 0x00, 0x00, 0x00, // class_size
            0x03, 0x00, // parent
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::ClassLayout, 1), (TableId::TypeDef, 3)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<ClassLayoutRaw>::new(&data, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.packing_size, 1);
        assert_eq!(row.class_size, 16);
        assert_eq!(row.parent, 3);
    }
}
