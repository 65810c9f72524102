use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A row of the `ImplMap` table (ECMA-335 II.22.22), the P/Invoke description of a method
#[derive(Clone, Debug)]
pub struct ImplMapRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// `PInvokeAttributes`
    pub mapping_flags: u16,
    /// The imported method (a MethodDef in practice)
    pub member_forwarded: CodedIndex,
    /// `#Strings` index of the native entry point
    pub import_name: u32,
    /// ModuleRef row of the native library
    pub import_scope: u32,
}

impl RowReadable for ImplMapRaw {
    const TABLE_ID: TableId = TableId::ImplMap;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ImplMapRaw {
            rid,
            token: Token::from_parts(TableId::ImplMap, rid),
            mapping_flags: read_le_at::<u16>(data, offset)?,
            member_forwarded: CodedIndex::read(data, offset, sizes, CodedIndexType::MemberForwarded)?,
            import_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            import_scope: read_le_at_dyn(data, offset, sizes.is_large(TableId::ModuleRef))?,
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
            0x40, 0x01, // mapping_flags: SupportsLastError | CallConvWinapi
            0x03, 0x00, // member_forwarded: MethodDef (tag 1), row 1
            0x44, 0x00, // import_name
            0x01, 0x00, // import_scope
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::ImplMap, 1), (TableId::MethodDef, 1), (TableId::ModuleRef, 1)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<ImplMapRaw>::new(&data, sizes).unwrap();

        let row = table.get(1).unwrap();
        assert_eq!(row.mapping_flags, 0x0140);
        assert_eq!(row.member_forwarded, CodedIndex::new(TableId::MethodDef, 1));
        assert_eq!(row.import_name, 0x44);
        assert_eq!(row.import_scope, 1);
    }
}
