use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A row of the `TypeRef` table (ECMA-335 II.22.38)
#[derive(Clone, Debug)]
pub struct TypeRefRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// Module, ModuleRef, AssemblyRef or, for nested references, the enclosing TypeRef
    pub resolution_scope: CodedIndex,
    /// `#Strings` index of the type name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
}

impl RowReadable for TypeRefRaw {
    const TABLE_ID: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            token: Token::from_parts(TableId::TypeRef, rid),
            resolution_scope: CodedIndex::read(data, offset, sizes, CodedIndexType::ResolutionScope)?,
            type_name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, sizes.is_large_str())?,
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
            0x0E, 0x00, // resolution_scope: AssemblyRef (tag 2), row 3
            0x42, 0x00, // type_name
            0x43, 0x00, // type_namespace
            0x07, 0x00, // resolution_scope: TypeRef (tag 3), row 1
            0x44, 0x00, // type_name
            0x00, 0x00, // type_namespace
        ];

        let sizes = Arc::new(TableInfo::new_test(
            &[(TableId::TypeRef, 2), (TableId::AssemblyRef, 3)],
            false,
            false,
            false,
        ));
        let table = MetadataTable::<TypeRefRaw>::new(&data, sizes).unwrap();

        let rows: Vec<TypeRefRaw> = table.iter().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].resolution_scope, CodedIndex::new(TableId::AssemblyRef, 3));
        assert_eq!(rows[0].type_name, 0x42);
        assert_eq!(rows[0].type_namespace, 0x43);
        assert_eq!(rows[1].resolution_scope, CodedIndex::new(TableId::TypeRef, 1));
        assert_eq!(rows[1].token.value(), 0x0100_0002);
    }
}
