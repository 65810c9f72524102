use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A row of the `FieldLayout` table (ECMA-335 II.22.16)
#[derive(Clone, Debug)]
pub struct FieldLayoutRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Byte offset of the field inside its type
    pub field_offset: u32,
    /// Field row this offset applies to
    pub field: u32,
}

impl RowReadable for FieldLayoutRaw {
    const TABLE_ID: TableId = TableId::FieldLayout;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(FieldLayoutRaw {
            rid,
            token: Token::from_parts(TableId::FieldLayout, rid),
            field_offset: read_le_at::<u32>(data, offset)?,
            field: read_le_at_dyn(data, offset, sizes.is_large(TableId::Field))?,
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
            0x08, 0x00, 0x00, 0x00, // field_offset
            0x02, 0x00, // field
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::FieldLayout, 1), (TableId::Field, 2)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<FieldLayoutRaw>::new(&data, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.field_offset, 8);
        assert_eq!(row.field, 2);
    }
}
