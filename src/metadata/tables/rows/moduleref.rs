use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A row of the `ModuleRef` table (ECMA-335 II.22.31), the native library of an import
#[derive(Clone, Debug)]
pub struct ModuleRefRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// `#Strings` index of the module name
    pub name: u32,
}

impl RowReadable for ModuleRefRaw {
    const TABLE_ID: TableId = TableId::ModuleRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        Ok(ModuleRefRaw {
            rid,
            token: Token::from_parts(TableId::ModuleRef, rid),
            name: read_le_at_dyn(data, offset, sizes.is_large_str())?,
        })
    }
}
