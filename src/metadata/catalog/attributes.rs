//! Interop facts carried by custom attributes.
//!
//! Attributes are matched by their simple type name, so the same getters work for the
//! `Windows.Win32.Foundation.Metadata` attributes and their `System.*` counterparts.

use crate::metadata::{
    catalog::TypeName,
    customattributes::{CustomAttributeArgument, CustomAttributeValue},
};

/// A decoded custom attribute attached to a type, member or parameter
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttribute {
    /// The attribute type
    pub name: TypeName,
    /// Decoded arguments
    pub value: CustomAttributeValue,
}

/// Size hints from `NativeArrayInfoAttribute`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeArrayInfo {
    /// Fixed element count
    pub count_const: Option<i32>,
    /// Index of the parameter holding the element count
    pub count_param_index: Option<i16>,
    /// Name of the field holding the element count
    pub count_field_name: Option<String>,
}

/// The custom attributes of one owner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<CustomAttribute>);

impl Attributes {
    /// Wrap a list of attributes
    #[must_use]
    pub fn new(attributes: Vec<CustomAttribute>) -> Self {
        Attributes(attributes)
    }

    /// All attributes in table order
    #[must_use]
    pub fn iter(&self) -> std::slice::Iter<'_, CustomAttribute> {
        self.0.iter()
    }

    /// Number of attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no attribute is attached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, attribute: CustomAttribute) {
        self.0.push(attribute);
    }

    /// The first attribute named `name` (`FlagsAttribute` or just `Flags`)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CustomAttributeValue> {
        self.0
            .iter()
            .find(|attr| {
                let simple = attr.name.name.as_str();
                simple == name
                    || simple
                        .strip_suffix("Attribute")
                        .is_some_and(|short| short == name)
            })
            .map(|attr| &attr.value)
    }

    /// True if an attribute named `name` is attached
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn fixed_str(&self, name: &str) -> Option<String> {
        self.get(name)?
            .fixed_args
            .first()?
            .as_str()
            .map(str::to_string)
    }

    fn fixed_i64(&self, name: &str) -> Option<i64> {
        self.get(name)?.fixed_args.first()?.as_i64()
    }

    /// GUID from a `GuidAttribute(uint, ushort, ushort, byte x 8)`
    #[must_use]
    pub fn guid(&self) -> Option<uguid::Guid> {
        let args = &self.get("GuidAttribute")?.fixed_args;
        if args.len() != 11 {
            return None;
        }

        let mut bytes = [0_u8; 16];
        let a = u32::try_from(args[0].as_i64()?).ok()?;
        let b = u16::try_from(args[1].as_i64()?).ok()?;
        let c = u16::try_from(args[2].as_i64()?).ok()?;
        bytes[0..4].copy_from_slice(&a.to_le_bytes());
        bytes[4..6].copy_from_slice(&b.to_le_bytes());
        bytes[6..8].copy_from_slice(&c.to_le_bytes());
        for (slot, arg) in bytes[8..].iter_mut().zip(&args[3..]) {
            *slot = u8::try_from(arg.as_i64()?).ok()?;
        }

        Some(uguid::Guid::from_bytes(bytes))
    }

    /// Documentation link from `DocumentationAttribute`
    #[must_use]
    pub fn documentation(&self) -> Option<String> {
        self.fixed_str("DocumentationAttribute")
    }

    /// Minimum platform from `SupportedOSPlatformAttribute`, e.g. `windows5.0`
    #[must_use]
    pub fn supported_os_platform(&self) -> Option<String> {
        self.fixed_str("SupportedOSPlatformAttribute")
    }

    /// Architecture mask from `SupportedArchitectureAttribute` (X86 = 1, X64 = 2, Arm64 = 4)
    #[must_use]
    pub fn supported_architecture(&self) -> Option<u32> {
        self.fixed_i64("SupportedArchitectureAttribute")
            .and_then(|value| u32::try_from(value).ok())
    }

    /// `CallingConvention` value from `UnmanagedFunctionPointerAttribute`
    #[must_use]
    pub fn unmanaged_function_pointer(&self) -> Option<i32> {
        self.fixed_i64("UnmanagedFunctionPointerAttribute")
            .and_then(|value| i32::try_from(value).ok())
    }

    /// Textual value from `ConstantAttribute`
    #[must_use]
    pub fn constant(&self) -> Option<String> {
        self.fixed_str("ConstantAttribute")
    }

    /// Size hints from `NativeArrayInfoAttribute`
    #[must_use]
    pub fn native_array_info(&self) -> Option<NativeArrayInfo> {
        let value = self.get("NativeArrayInfoAttribute")?;
        let number = |name: &str| value.named(name).and_then(CustomAttributeArgument::as_i64);

        Some(NativeArrayInfo {
            count_const: number("CountConst").and_then(|v| i32::try_from(v).ok()),
            count_param_index: number("CountParamIndex").and_then(|v| i16::try_from(v).ok()),
            count_field_name: value
                .named("CountFieldName")
                .and_then(CustomAttributeArgument::as_str)
                .map(str::to_string),
        })
    }

    /// `BytesParamIndex` from `MemorySizeAttribute`
    #[must_use]
    pub fn bytes_param_index(&self) -> Option<i16> {
        self.get("MemorySizeAttribute")?
            .named("BytesParamIndex")
            .and_then(CustomAttributeArgument::as_i64)
            .and_then(|value| i16::try_from(value).ok())
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a CustomAttribute;
    type IntoIter = std::slice::Iter<'a, CustomAttribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::customattributes::CustomAttributeNamedArgument;

    fn attribute(name: &str, fixed_args: Vec<CustomAttributeArgument>) -> CustomAttribute {
        CustomAttribute {
            name: TypeName::new("Windows.Win32.Foundation.Metadata", name),
            value: CustomAttributeValue {
                fixed_args,
                named_args: vec![],
            },
        }
    }

    #[test]
    fn guid() {
        let mut args = vec![
            CustomAttributeArgument::U4(0x0000_0000),
            CustomAttributeArgument::U2(0x0000),
            CustomAttributeArgument::U2(0x0000),
            CustomAttributeArgument::U1(0xC0),
        ];
        args.extend(std::iter::repeat(CustomAttributeArgument::U1(0)).take(6));
        args.push(CustomAttributeArgument::U1(0x46));

        let attrs = Attributes::new(vec![attribute("GuidAttribute", args)]);
        assert_eq!(
            attrs.guid().unwrap().to_string(),
            "00000000-0000-0000-c000-000000000046"
        );

        let attrs = Attributes::new(vec![attribute(
            "GuidAttribute",
            vec![CustomAttributeArgument::U4(1)],
        )]);
        assert!(attrs.guid().is_none());
    }

    #[test]
    fn strings_and_markers() {
        let attrs = Attributes::new(vec![
            attribute(
                "SupportedOSPlatformAttribute",
                vec![CustomAttributeArgument::String(Some("windows6.0.6000".into()))],
            ),
            attribute("NativeTypedefAttribute", vec![]),
        ]);

        assert_eq!(attrs.supported_os_platform().as_deref(), Some("windows6.0.6000"));
        assert!(attrs.has("NativeTypedef"));
        assert!(attrs.has("NativeTypedefAttribute"));
        assert!(!attrs.has("ComOutPtr"));
        assert!(attrs.documentation().is_none());
    }

    #[test]
    fn native_array_info() {
        let mut attr = attribute("NativeArrayInfoAttribute", vec![]);
        attr.value.named_args.push(CustomAttributeNamedArgument {
            is_field: false,
            name: "CountParamIndex".into(),
            value: CustomAttributeArgument::I2(1),
        });
        let attrs = Attributes::new(vec![attr]);

        let info = attrs.native_array_info().unwrap();
        assert_eq!(info.count_param_index, Some(1));
        assert_eq!(info.count_const, None);
        assert_eq!(info.count_field_name, None);
    }
}
