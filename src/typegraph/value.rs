//! Typed default values decoded from Constant table bytes.

use widestring::U16Str;

use crate::typegraph::{wellknown, TypeGraph, TypeId, TypeKind};

const MAX_VALUE_DEPTH: usize = 8;

/// A decoded constant
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    I1(i8),
    U1(u8),
    I2(i16),
    U2(u16),
    I4(i32),
    U4(u32),
    I8(i64),
    U8(u64),
    R4(f32),
    R8(f64),
    Char(u16),
    String(String),
    Guid(uguid::Guid),
    /// Bytes no decoding rule applies to
    Bytes(Vec<u8>),
}

impl TypeGraph {
    /// Decode `bytes` as a value of type `id`
    ///
    /// Single-field structures decode as their field and enums as their underlying type. Byte
    /// strings matching no rule are kept as [`Value::Bytes`].
    #[must_use]
    pub fn decode_value(&self, id: TypeId, bytes: &[u8]) -> Option<Value> {
        self.decode_value_at(id, bytes, 0)
    }

    fn decode_value_at(&self, id: TypeId, bytes: &[u8], depth: usize) -> Option<Value> {
        if bytes.is_empty() {
            return None;
        }

        let node = self.get(id)?;
        let full_name = node.name.full_name();
        let value = match (full_name.as_str(), bytes.len()) {
            (wellknown::INT32 | wellknown::INTPTR, 4) => Value::I4(i32::from_le_bytes(array(bytes)?)),
            (wellknown::UINT32 | wellknown::UINTPTR, 4) => {
                Value::U4(u32::from_le_bytes(array(bytes)?))
            }
            (wellknown::BOOLEAN, 1) => Value::Boolean(bytes[0] != 0),
            (wellknown::BYTE, 1) => Value::U1(bytes[0]),
            (wellknown::SBYTE, 1) => Value::I1(i8::from_le_bytes([bytes[0]])),
            (wellknown::SINGLE, 4) => Value::R4(f32::from_le_bytes(array(bytes)?)),
            (wellknown::INT16, 2) => Value::I2(i16::from_le_bytes(array(bytes)?)),
            (wellknown::UINT16, 2) => Value::U2(u16::from_le_bytes(array(bytes)?)),
            (wellknown::INT64 | wellknown::INTPTR, 8) => Value::I8(i64::from_le_bytes(array(bytes)?)),
            (wellknown::UINT64 | wellknown::UINTPTR, 8) => {
                Value::U8(u64::from_le_bytes(array(bytes)?))
            }
            (wellknown::DOUBLE, 8) => Value::R8(f64::from_le_bytes(array(bytes)?)),
            (wellknown::STRING, _) => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                Value::String(U16Str::from_slice(&units).to_string_lossy())
            }
            (wellknown::CHAR, len) if len >= 2 => Value::Char(u16::from_le_bytes([bytes[0], bytes[1]])),
            (wellknown::GUID, 16) => Value::Guid(uguid::Guid::from_bytes(array(bytes)?)),
            _ => return Some(self.decode_compound(id, bytes, depth)),
        };

        Some(value)
    }

    fn decode_compound(&self, id: TypeId, bytes: &[u8], depth: usize) -> Value {
        let raw = || Value::Bytes(bytes.to_vec());
        if depth >= MAX_VALUE_DEPTH {
            return raw();
        }

        let node = &self[id];
        match &node.kind {
            TypeKind::Enum { .. } if bytes.len() == 4 => {
                array(bytes).map_or_else(raw, |b| Value::I4(i32::from_le_bytes(b)))
            }
            TypeKind::Enum {
                underlying: Some(underlying),
                ..
            } => self
                .decode_value_at(*underlying, bytes, depth + 1)
                .unwrap_or_else(raw),
            TypeKind::Structure { .. } if node.fields.len() == 1 => self
                .decode_value_at(node.fields[0].type_id, bytes, depth + 1)
                .unwrap_or_else(raw),
            _ => raw(),
        }
    }
}

fn array<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.get(..N)?.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typegraph::{Field, LayoutKind, QualifiedName, TypeNode};

    #[test]
    fn primitives() {
        let graph = TypeGraph::with_well_known();
        let id = |name| graph.find_full_name(name).unwrap();

        assert_eq!(
            graph.decode_value(id(wellknown::INT32), &(-5_i32).to_le_bytes()),
            Some(Value::I4(-5))
        );
        assert_eq!(
            graph.decode_value(id(wellknown::UINT16), &[0x34, 0x12]),
            Some(Value::U2(0x1234))
        );
        assert_eq!(
            graph.decode_value(id(wellknown::STRING), &[b'h', 0, b'i', 0]),
            Some(Value::String("hi".into()))
        );
        assert_eq!(
            graph.decode_value(id(wellknown::INTPTR), &(-1_i64).to_le_bytes()),
            Some(Value::I8(-1))
        );
        assert_eq!(
            graph.decode_value(id(wellknown::BOOLEAN), &[1]),
            Some(Value::Boolean(true))
        );
        assert_eq!(graph.decode_value(id(wellknown::INT32), &[]), None);
        assert_eq!(
            graph.decode_value(id(wellknown::INT32), &[1, 2]),
            Some(Value::Bytes(vec![1, 2]))
        );
    }

    #[test]
    fn compounds() {
        let mut graph = TypeGraph::with_well_known();
        let int32 = graph.find_full_name(wellknown::INT32).unwrap();
        let byte = graph.find_full_name(wellknown::BYTE).unwrap();

        let mut hresult = TypeNode::new(
            QualifiedName::parse(wellknown::HRESULT),
            TypeKind::Structure {
                layout: LayoutKind::Sequential,
                packing_size: None,
                class_size: None,
            },
        );
        hresult.fields.push(Field::new(None, "Value", int32));
        let hresult = graph.insert(hresult);
        assert_eq!(
            graph.decode_value(hresult, &0x8000_4005_u32.to_le_bytes()),
            Some(Value::I4(0x8000_4005_u32 as i32))
        );

        let color = graph.insert(TypeNode::new(
            QualifiedName::new("A", "COLOR"),
            TypeKind::Enum {
                is_flags: false,
                underlying: Some(byte),
            },
        ));
        assert_eq!(graph.decode_value(color, &[7]), Some(Value::U1(7)));
        assert_eq!(
            graph.decode_value(color, &[1, 0, 0, 0]),
            Some(Value::I4(1))
        );
    }
}
