//! C# literals for constant values.

use crate::typegraph::{wellknown, TypeGraph, TypeId, Value};

/// Types a C# `const` can be declared with
const CONSTABLE: &[&str] = &[
    wellknown::SBYTE,
    wellknown::BYTE,
    wellknown::INT16,
    wellknown::UINT16,
    wellknown::INT32,
    wellknown::UINT32,
    wellknown::INT64,
    wellknown::UINT64,
    wellknown::CHAR,
    wellknown::SINGLE,
    wellknown::DOUBLE,
    wellknown::DECIMAL,
    wellknown::BOOLEAN,
    wellknown::STRING,
];

/// Types that need `static readonly` but can still be emitted as constants
const READONLY: &[&str] = &[wellknown::INTPTR, wellknown::UINTPTR, wellknown::GUID];

/// True if a field of type `id` can be declared `const`
#[must_use]
pub fn is_constable(graph: &TypeGraph, id: TypeId) -> bool {
    let node = &graph[id];
    node.is_enum() || CONSTABLE.contains(&node.name.full_name().as_str())
}

/// True if a field of type `id` can be emitted in a constants class
#[must_use]
pub fn is_supported_constant(graph: &TypeGraph, id: TypeId) -> bool {
    is_constable(graph, id) || READONLY.contains(&graph[id].name.full_name().as_str())
}

/// The literal of `value`, `null` when there is none
#[must_use]
pub fn literal(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return "null".to_string();
    };

    match value {
        Value::Boolean(true) => "true".to_string(),
        Value::Boolean(false) => "false".to_string(),
        Value::Guid(guid) => format!("new(\"{}\")", guid),
        Value::String(text) => format!("@\"{}\"", text.replace('"', "\"\"")),
        Value::Char(c) => format!("'\\u{:04x}'", c),
        Value::Bytes(bytes) => format!(
            "[{}]",
            bytes
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::I1(i8::MIN) => "sbyte.MinValue".to_string(),
        Value::I1(i8::MAX) => "sbyte.MaxValue".to_string(),
        Value::I2(i16::MIN) => "short.MinValue".to_string(),
        Value::I2(i16::MAX) => "short.MaxValue".to_string(),
        Value::I4(i32::MIN) => "int.MinValue".to_string(),
        Value::I4(i32::MAX) => "int.MaxValue".to_string(),
        Value::I8(i64::MIN) => "long.MinValue".to_string(),
        Value::I8(i64::MAX) => "long.MaxValue".to_string(),
        Value::U1(u8::MAX) => "byte.MaxValue".to_string(),
        Value::U2(u16::MAX) => "ushort.MaxValue".to_string(),
        Value::U4(u32::MAX) => "uint.MaxValue".to_string(),
        Value::U8(u64::MAX) => "ulong.MaxValue".to_string(),
        Value::I1(v) => v.to_string(),
        Value::U1(v) => v.to_string(),
        Value::I2(v) => v.to_string(),
        Value::U2(v) => v.to_string(),
        Value::I4(v) => v.to_string(),
        Value::U4(v) => v.to_string(),
        Value::I8(v) => v.to_string(),
        Value::U8(v) => v.to_string(),
        Value::R4(v) if *v == f32::MIN => "float.MinValue".to_string(),
        Value::R4(v) if *v == f32::MAX => "float.MaxValue".to_string(),
        Value::R4(v) if v.is_finite() => format!("{}f", v),
        Value::R4(v) => non_finite("float", v.is_nan(), v.is_sign_positive()),
        Value::R8(v) if *v == f64::MIN => "double.MinValue".to_string(),
        Value::R8(v) if *v == f64::MAX => "double.MaxValue".to_string(),
        Value::R8(v) if v.is_finite() => format!("{}d", v),
        Value::R8(v) => non_finite("double", v.is_nan(), v.is_sign_positive()),
    }
}

fn non_finite(keyword: &str, is_nan: bool, is_positive: bool) -> String {
    if is_nan {
        format!("{}.NaN", keyword)
    } else if is_positive {
        format!("{}.PositiveInfinity", keyword)
    } else {
        format!("{}.NegativeInfinity", keyword)
    }
}
