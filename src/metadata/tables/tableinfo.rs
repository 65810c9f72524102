use std::sync::Arc;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{CodedIndexType, TableId},
    Result,
};

/// Row count and index width of one table
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to address every row
    pub bits: u8,
    /// True if indexes into this table are 4 bytes wide
    pub is_large: bool,
}

impl TableRowInfo {
    /// Derive the index width for a table with `rows` rows
    #[must_use]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: bits > 16,
        }
    }
}

/// Sizing information shared by every table reader of one `#~` stream.
///
/// Column widths in the tables stream are not fixed: heap indexes are 2 or 4 bytes depending on
/// the heap size flags, table indexes depend on the row count of the target table and coded
/// indexes on the largest of their candidate tables plus the tag bits.
#[derive(Clone, Debug, Default)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

/// Shared handle on a [`TableInfo`]
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Read the row counts that follow the `#~` header and the heap size flags.
    ///
    /// `data` is the tables stream starting at its header; row counts are at offset 24, one
    /// `u32` per table set in `valid_bitvec`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated data and
    /// [`crate::Error::Malformed`] if a table beyond `GenericParamConstraint` is present.
    pub fn new(data: &[u8], valid_bitvec: u64) -> Result<Self> {
        let known_tables = (1_u64 << TableId::COUNT) - 1;
        if valid_bitvec & !known_tables != 0 {
            return Err(malformed_error!(
                "Unsupported tables present in valid vector - 0x{:016x}",
                valid_bitvec & !known_tables
            ));
        }

        let mut rows = vec![TableRowInfo::default(); TableId::COUNT];
        let mut next_row_offset = 24;

        for table_id in TableId::iter() {
            if valid_bitvec & (1 << table_id as usize) == 0 {
                continue;
            }

            let row_count = read_le_at::<u32>(data, &mut next_row_offset)?;
            rows[table_id as usize] = TableRowInfo::new(row_count);
        }

        let heap_size_flags = read_le::<u8>(data.get(6..).unwrap_or_default())?;
        let mut table_info = TableInfo {
            rows,
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_size_flags & 0x01 != 0,
            is_large_index_guid: heap_size_flags & 0x02 != 0,
            is_large_index_blob: heap_size_flags & 0x04 != 0,
        };

        table_info.calculate_coded_index_bits();
        Ok(table_info)
    }

    /// Build sizing information directly from row counts
    #[cfg(test)]
    pub fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TableId::COUNT],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: large_str,
            is_large_index_guid: large_guid,
            is_large_index_blob: large_blob,
        };

        for (table, rows) in valid_tables {
            table_info.rows[*table as usize] = TableRowInfo::new(*rows);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    /// Split a raw coded index into table and row.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the tag is reserved or out of range.
    pub fn decode_coded_index(
        &self,
        value: u32,
        coded_index_type: CodedIndexType,
    ) -> Result<(TableId, u32)> {
        let tag_bits = coded_index_type.tag_bits();
        let tag = (value & ((1 << tag_bits) - 1)) as usize;
        let row = value >> tag_bits;

        match coded_index_type.tables().get(tag) {
            Some(Some(table)) => Ok((*table, row)),
            _ => Err(malformed_error!(
                "Invalid tag {} for coded index {:?}",
                tag,
                coded_index_type
            )),
        }
    }

    /// Row information of `table`
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Number of rows in `table`
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize].rows
    }

    /// True if `#Strings` indexes are 4 bytes
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// True if `#GUID` indexes are 4 bytes
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// True if `#Blob` indexes are 4 bytes
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// True if indexes into `table` are 4 bytes
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.rows[table as usize].is_large
    }

    /// Width of an index into `table`
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u8 {
        if self.rows[table as usize].is_large {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of kind `coded_index_type`
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Size in bytes of one row of `table` under these widths (ECMA-335 II.22).
    ///
    /// Every table needs a size, including the ones that are never decoded, because the tables
    /// are stored back to back and the offset of one depends on all preceding ones.
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        use CodedIndexType as C;
        use TableId as T;

        let s = u32::from(self.str_bytes());
        let g = u32::from(self.guid_bytes());
        let b = u32::from(self.blob_bytes());
        let t = |id: TableId| u32::from(self.table_index_bytes(id));
        let c = |ci: CodedIndexType| u32::from(self.coded_index_bytes(ci));

        match table {
            T::Module => 2 + s + g + g + g,
            T::TypeRef => c(C::ResolutionScope) + s + s,
            T::TypeDef => 4 + s + s + c(C::TypeDefOrRef) + t(T::Field) + t(T::MethodDef),
            T::FieldPtr => t(T::Field),
            T::Field => 2 + s + b,
            T::MethodPtr => t(T::MethodDef),
            T::MethodDef => 4 + 2 + 2 + s + b + t(T::Param),
            T::ParamPtr => t(T::Param),
            T::Param => 2 + 2 + s,
            T::InterfaceImpl => t(T::TypeDef) + c(C::TypeDefOrRef),
            T::MemberRef => c(C::MemberRefParent) + s + b,
            T::Constant => 2 + c(C::HasConstant) + b,
            T::CustomAttribute => c(C::HasCustomAttribute) + c(C::CustomAttributeType) + b,
            T::FieldMarshal => c(C::HasFieldMarshal) + b,
            T::DeclSecurity => 2 + c(C::HasDeclSecurity) + b,
            T::ClassLayout => 2 + 4 + t(T::TypeDef),
            T::FieldLayout => 4 + t(T::Field),
            T::StandAloneSig => b,
            T::EventMap => t(T::TypeDef) + t(T::Event),
            T::EventPtr => t(T::Event),
            T::Event => 2 + s + c(C::TypeDefOrRef),
            T::PropertyMap => t(T::TypeDef) + t(T::Property),
            T::PropertyPtr => t(T::Property),
            T::Property => 2 + s + b,
            T::MethodSemantics => 2 + t(T::MethodDef) + c(C::HasSemantics),
            T::MethodImpl => t(T::TypeDef) + c(C::MethodDefOrRef) + c(C::MethodDefOrRef),
            T::ModuleRef => s,
            T::TypeSpec => b,
            T::ImplMap => 2 + c(C::MemberForwarded) + s + t(T::ModuleRef),
            T::FieldRVA => 4 + t(T::Field),
            T::EncLog => 4 + 4,
            T::EncMap => 4,
            T::Assembly => 4 + 2 * 4 + 4 + b + s + s,
            T::AssemblyProcessor => 4,
            T::AssemblyOS => 4 * 3,
            T::AssemblyRef => 2 * 4 + 4 + b + s + s + b,
            T::AssemblyRefProcessor => 4 + t(T::AssemblyRef),
            T::AssemblyRefOS => 4 * 3 + t(T::AssemblyRef),
            T::File => 4 + s + b,
            T::ExportedType => 4 + 4 + s + s + c(C::Implementation),
            T::ManifestResource => 4 + 4 + s + c(C::Implementation),
            T::NestedClass => t(T::TypeDef) + t(T::TypeDef),
            T::GenericParam => 2 + 2 + c(C::TypeOrMethodDef) + s,
            T::MethodSpec => c(C::MethodDefOrRef) + b,
            T::GenericParamConstraint => t(T::GenericParam) + c(C::TypeDefOrRef),
        }
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .flatten()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits();
        }
    }
}
