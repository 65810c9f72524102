use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A row of the `Module` table (ECMA-335 II.22.30)
#[derive(Clone, Debug)]
pub struct ModuleRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Reserved, 0
    pub generation: u32,
    /// `#Strings` index of the module name
    pub name: u32,
    /// `#GUID` index of the module version id
    pub mvid: u32,
    /// Reserved, 0
    pub encid: u32,
    /// Reserved, 0
    pub encbaseid: u32,
}

impl RowReadable for ModuleRaw {
    const TABLE_ID: TableId = TableId::Module;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ModuleRaw {
            rid,
            token: Token::from_parts(TableId::Module, rid),
            generation: u32::from(read_le_at::<u16>(data, offset)?),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            mvid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
            encbaseid: read_le_at_dyn(data, offset, sizes.is_large_guid())?,
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
            0x00, 0x00, // generation
            0x0A, 0x00, // name
            0x01, 0x00, // mvid
            0x00, 0x00, // encid
            0x00, 0x00, // encbaseid
        ];

        let sizes = Arc::new(TableInfo::new_test(&[(TableId::Module, 1)], false, false, false));
        let table = MetadataTable::<ModuleRaw>::new(&data, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.token.value(), 0x0000_0001);
        assert_eq!(row.name, 0x0A);
        assert_eq!(row.mvid, 1);
        assert_eq!(row.encid, 0);
    }

    #[test]
    fn crafted_long() {
        let data = vec![
            0x00, 0x00, // generation
            0x0A, 0x00, 0x01, 0x00, // name
            0x01, 0x00, 0x00, 0x00, // mvid
            0x00, 0x00, 0x00, 0x00, // encid
            0x00, 0x00, 0x00, 0x00, // encbaseid
        ];

        let sizes = Arc::new(TableInfo::new_test(&[(TableId::Module, 1)], true, true, true));
        let table = MetadataTable::<ModuleRaw>::new(&data, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.name, 0x0001_000A);
        assert_eq!(row.mvid, 1);
    }
}
