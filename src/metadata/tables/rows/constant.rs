use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfoRef},
        token::Token,
    },
    Result,
};

/// A row of the `Constant` table (ECMA-335 II.22.9)
#[derive(Clone, Debug)]
pub struct ConstantRaw {
    /// Row id
    pub rid: u32,
    /// Token of this row
    pub token: Token,
    /// `ELEMENT_TYPE_*` of the value
    pub base: u8,
    /// Owner of the value, a Field, Param or Property
    pub parent: CodedIndex,
    /// `#Blob` index of the little-endian value bytes
    pub value: u32,
}

impl RowReadable for ConstantRaw {
    const TABLE_ID: TableId = TableId::Constant;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, sizes: &TableInfoRef) -> Result<Self> {
        let base = read_le_at::<u8>(data, offset)?;
        // Padding byte
        read_le_at::<u8>(data, offset)?;

        Ok(ConstantRaw {
            rid,
            token: Token::from_parts(TableId::Constant, rid),
            base,
            parent: CodedIndex::read(data, offset, sizes, CodedIndexType::HasConstant)?,
            value: read_le_at_dyn(data, offset, sizes.is_large_blob())?,
        })
    }
}
