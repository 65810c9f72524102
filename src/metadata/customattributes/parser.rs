use crate::{
    file::parser::Parser,
    metadata::{
        customattributes::{
            CustomAttributeArgument, CustomAttributeNamedArgument, CustomAttributeValue,
            SERIALIZATION_TYPE,
        },
        signatures::{SignatureMethod, TypeSignature},
        token::Token,
    },
    Error::RecursionLimit,
    Result,
};

/// Deepest nesting of arrays and boxed values accepted inside one attribute blob
pub const MAX_NESTING_DEPTH: usize = 16;

/// Answers the type questions a custom attribute blob cannot answer by itself.
///
/// Fixed arguments are encoded without type tags, so the decoder needs the full name of
/// types referenced by the constructor signature and the storage size of enums.
pub trait AttributeTypeResolver {
    /// Full name (`Namespace.Name`) of the TypeDef or TypeRef behind `token`
    fn type_name(&self, token: Token) -> Option<String>;

    /// Size in bytes of the underlying type of the enum `type_name`, `None` if unknown
    fn enum_size(&self, _type_name: &str) -> Option<usize> {
        None
    }
}

/// Storage type of an argument value (`FieldOrPropType` in ECMA-335 II.23.3)
#[derive(Debug, Clone)]
enum ElementType {
    Primitive(u8),
    Type,
    Boxed,
    Enum(String),
    SzArray(Box<ElementType>),
}

/// Decodes a custom attribute blob against its constructor signature.
pub struct CustomAttributeParser<'a> {
    parser: Parser<'a>,
    resolver: &'a dyn AttributeTypeResolver,
    depth: usize,
}

impl<'a> CustomAttributeParser<'a> {
    /// Create a parser over `data`
    #[must_use]
    pub fn new(data: &'a [u8], resolver: &'a dyn AttributeTypeResolver) -> Self {
        CustomAttributeParser {
            parser: Parser::new(data),
            resolver,
            depth: 0,
        }
    }

    /// Decode the blob. `constructor` supplies the types of the fixed arguments.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a missing prolog or an argument type that
    /// cannot appear in an attribute, [`crate::Error::OutOfBounds`] for truncated data.
    pub fn parse_custom_attribute(
        &mut self,
        constructor: &SignatureMethod,
    ) -> Result<CustomAttributeValue> {
        let prolog = self.parser.read_le::<u16>()?;
        if prolog != 0x0001 {
            return Err(malformed_error!(
                "Invalid custom attribute prolog - expected 0x0001, got 0x{:04X}",
                prolog
            ));
        }

        let mut fixed_args = Vec::with_capacity(constructor.params.len());
        for param in &constructor.params {
            fixed_args.push(self.parse_fixed_argument(&param.base)?);
        }

        let mut named_args = Vec::new();
        if self.parser.remaining() >= 2 {
            let num_named = self.parser.read_le::<u16>()?;
            for _ in 0..num_named {
                named_args.push(self.parse_named_argument()?);
            }
        }

        Ok(CustomAttributeValue {
            fixed_args,
            named_args,
        })
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(RecursionLimit(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn parse_fixed_argument(&mut self, sig: &TypeSignature) -> Result<CustomAttributeArgument> {
        self.enter()?;
        let result = self.parse_fixed_argument_inner(sig);
        self.depth -= 1;
        result
    }

    fn parse_fixed_argument_inner(&mut self, sig: &TypeSignature) -> Result<CustomAttributeArgument> {
        match sig {
            TypeSignature::Boolean => self.parse_primitive(SERIALIZATION_TYPE::BOOLEAN),
            TypeSignature::Char => self.parse_primitive(SERIALIZATION_TYPE::CHAR),
            TypeSignature::I1 => self.parse_primitive(SERIALIZATION_TYPE::I1),
            TypeSignature::U1 => self.parse_primitive(SERIALIZATION_TYPE::U1),
            TypeSignature::I2 => self.parse_primitive(SERIALIZATION_TYPE::I2),
            TypeSignature::U2 => self.parse_primitive(SERIALIZATION_TYPE::U2),
            TypeSignature::I4 => self.parse_primitive(SERIALIZATION_TYPE::I4),
            TypeSignature::U4 => self.parse_primitive(SERIALIZATION_TYPE::U4),
            TypeSignature::I8 => self.parse_primitive(SERIALIZATION_TYPE::I8),
            TypeSignature::U8 => self.parse_primitive(SERIALIZATION_TYPE::U8),
            TypeSignature::R4 => self.parse_primitive(SERIALIZATION_TYPE::R4),
            TypeSignature::R8 => self.parse_primitive(SERIALIZATION_TYPE::R8),
            TypeSignature::String => self.parse_primitive(SERIALIZATION_TYPE::STRING),
            TypeSignature::Object => self.parse_value(&ElementType::Boxed),
            TypeSignature::Class(token) => {
                let type_name = self.type_name(*token)?;
                match type_name.as_str() {
                    "System.Type" => self.parse_value(&ElementType::Type),
                    "System.String" => self.parse_primitive(SERIALIZATION_TYPE::STRING),
                    "System.Object" => self.parse_value(&ElementType::Boxed),
                    _ => self.parse_value(&ElementType::Enum(type_name)),
                }
            }
            TypeSignature::ValueType(token) => {
                let type_name = self.type_name(*token)?;
                self.parse_value(&ElementType::Enum(type_name))
            }
            TypeSignature::SzArray(array) => {
                let length = self.parser.read_le::<i32>()?;
                if length == -1 {
                    return Ok(CustomAttributeArgument::Array(Vec::new()));
                }
                if length < 0 {
                    return Err(malformed_error!("Invalid array length: {}", length));
                }

                let mut elements = Vec::with_capacity((length as usize).min(self.parser.remaining()));
                for _ in 0..length {
                    elements.push(self.parse_fixed_argument(&array.base)?);
                }
                Ok(CustomAttributeArgument::Array(elements))
            }
            other => Err(malformed_error!(
                "Unsupported type in custom attribute constructor: {:?}",
                other
            )),
        }
    }

    fn type_name(&self, token: Token) -> Result<String> {
        self.resolver
            .type_name(token)
            .ok_or_else(|| malformed_error!("Cannot resolve attribute argument type {}", token))
    }

    fn parse_named_argument(&mut self) -> Result<CustomAttributeNamedArgument> {
        let field_or_prop = self.parser.read_le::<u8>()?;
        let is_field = match field_or_prop {
            SERIALIZATION_TYPE::FIELD => true,
            SERIALIZATION_TYPE::PROPERTY => false,
            _ => {
                return Err(malformed_error!(
                    "Invalid field/property indicator: 0x{:02X}",
                    field_or_prop
                ))
            }
        };

        let element_type = self.parse_element_type()?;
        let Some(name) = self.parser.read_ser_string()? else {
            return Err(malformed_error!("Named argument without a name"));
        };
        let value = self.parse_value(&element_type)?;

        Ok(CustomAttributeNamedArgument {
            is_field,
            name,
            value,
        })
    }

    fn parse_element_type(&mut self) -> Result<ElementType> {
        self.enter()?;
        let tag = self.parser.read_le::<u8>()?;
        let result = match tag {
            SERIALIZATION_TYPE::BOOLEAN..=SERIALIZATION_TYPE::STRING => {
                Ok(ElementType::Primitive(tag))
            }
            SERIALIZATION_TYPE::TYPE => Ok(ElementType::Type),
            SERIALIZATION_TYPE::TAGGED_OBJECT => Ok(ElementType::Boxed),
            SERIALIZATION_TYPE::ENUM => match self.parser.read_ser_string()? {
                Some(name) => Ok(ElementType::Enum(name)),
                None => Err(malformed_error!("Enum argument without a type name")),
            },
            SERIALIZATION_TYPE::SZARRAY => {
                Ok(ElementType::SzArray(Box::new(self.parse_element_type()?)))
            }
            _ => Err(malformed_error!(
                "Unsupported serialization type tag: 0x{:02X}",
                tag
            )),
        };
        self.depth -= 1;
        result
    }

    fn parse_value(&mut self, element_type: &ElementType) -> Result<CustomAttributeArgument> {
        self.enter()?;
        let result = match element_type {
            ElementType::Primitive(tag) => self.parse_primitive(*tag),
            ElementType::Type => Ok(CustomAttributeArgument::Type(
                self.parser.read_ser_string()?,
            )),
            ElementType::Boxed => {
                let inner = self.parse_element_type()?;
                self.parse_value(&inner)
            }
            ElementType::Enum(type_name) => {
                let size = self.resolver.enum_size(type_name).unwrap_or(4);
                let value = match size {
                    1 => CustomAttributeArgument::U1(self.parser.read_le::<u8>()?),
                    2 => CustomAttributeArgument::I2(self.parser.read_le::<i16>()?),
                    4 => CustomAttributeArgument::I4(self.parser.read_le::<i32>()?),
                    8 => CustomAttributeArgument::I8(self.parser.read_le::<i64>()?),
                    _ => {
                        return Err(malformed_error!(
                            "Invalid enum underlying type size {} for enum '{}'",
                            size,
                            type_name
                        ))
                    }
                };
                Ok(CustomAttributeArgument::Enum(
                    type_name.clone(),
                    Box::new(value),
                ))
            }
            ElementType::SzArray(element) => {
                let length = self.parser.read_le::<i32>()?;
                if length == -1 {
                    Ok(CustomAttributeArgument::Array(Vec::new()))
                } else if length < 0 {
                    Err(malformed_error!("Invalid array length: {}", length))
                } else {
                    let mut elements =
                        Vec::with_capacity((length as usize).min(self.parser.remaining()));
                    for _ in 0..length {
                        elements.push(self.parse_value(element)?);
                    }
                    Ok(CustomAttributeArgument::Array(elements))
                }
            }
        };
        self.depth -= 1;
        result
    }

    fn parse_primitive(&mut self, tag: u8) -> Result<CustomAttributeArgument> {
        Ok(match tag {
            SERIALIZATION_TYPE::BOOLEAN => {
                CustomAttributeArgument::Bool(self.parser.read_le::<u8>()? != 0)
            }
            SERIALIZATION_TYPE::CHAR => {
                let val = self.parser.read_le::<u16>()?;
                let character = char::from_u32(u32::from(val)).unwrap_or('\u{FFFD}');
                CustomAttributeArgument::Char(character)
            }
            SERIALIZATION_TYPE::I1 => CustomAttributeArgument::I1(self.parser.read_le::<i8>()?),
            SERIALIZATION_TYPE::U1 => CustomAttributeArgument::U1(self.parser.read_le::<u8>()?),
            SERIALIZATION_TYPE::I2 => CustomAttributeArgument::I2(self.parser.read_le::<i16>()?),
            SERIALIZATION_TYPE::U2 => CustomAttributeArgument::U2(self.parser.read_le::<u16>()?),
            SERIALIZATION_TYPE::I4 => CustomAttributeArgument::I4(self.parser.read_le::<i32>()?),
            SERIALIZATION_TYPE::U4 => CustomAttributeArgument::U4(self.parser.read_le::<u32>()?),
            SERIALIZATION_TYPE::I8 => CustomAttributeArgument::I8(self.parser.read_le::<i64>()?),
            SERIALIZATION_TYPE::U8 => CustomAttributeArgument::U8(self.parser.read_le::<u64>()?),
            SERIALIZATION_TYPE::R4 => CustomAttributeArgument::R4(self.parser.read_le::<f32>()?),
            SERIALIZATION_TYPE::R8 => CustomAttributeArgument::R8(self.parser.read_le::<f64>()?),
            SERIALIZATION_TYPE::STRING => {
                CustomAttributeArgument::String(self.parser.read_ser_string()?)
            }
            _ => {
                return Err(malformed_error!(
                    "Unsupported serialization type tag: 0x{:02X}",
                    tag
                ))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::metadata::signatures::{SignatureParameter, SignatureSzArray};

    struct Names(HashMap<u32, &'static str>);

    impl AttributeTypeResolver for Names {
        fn type_name(&self, token: Token) -> Option<String> {
            self.0.get(&token.value()).map(|name| (*name).to_string())
        }

        fn enum_size(&self, type_name: &str) -> Option<usize> {
            (type_name == "Test.Small").then_some(1)
        }
    }

    fn ctor(params: Vec<TypeSignature>) -> SignatureMethod {
        SignatureMethod {
            has_this: true,
            return_type: SignatureParameter {
                base: TypeSignature::Void,
                ..Default::default()
            },
            params: params
                .into_iter()
                .map(|base| SignatureParameter {
                    base,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn parse(data: &[u8], params: Vec<TypeSignature>) -> Result<CustomAttributeValue> {
        let names = Names(HashMap::from([
            (0x0100_0001, "System.Runtime.InteropServices.CallingConvention"),
            (0x0200_0002, "Test.Small"),
            (0x0100_0003, "System.Type"),
        ]));
        CustomAttributeParser::new(data, &names).parse_custom_attribute(&ctor(params))
    }

    #[test]
    fn empty() {
        let value = parse(&[0x01, 0x00, 0x00, 0x00], vec![]).unwrap();
        assert!(value.fixed_args.is_empty());
        assert!(value.named_args.is_empty());

        let value = parse(&[0x01, 0x00], vec![]).unwrap();
        assert!(value.named_args.is_empty());
    }

    #[test]
    fn invalid_prolog() {
        assert!(parse(&[0x02, 0x00], vec![]).is_err());
        assert!(parse(&[], vec![]).is_err());
    }

    #[test]
    fn string_argument() {
        let data = [0x01, 0x00, 0x05, b'H', b'e', b'l', b'l', b'o', 0x00, 0x00];
        let value = parse(&data, vec![TypeSignature::String]).unwrap();
        assert_eq!(value.fixed_args[0].as_str(), Some("Hello"));

        let value = parse(&[0x01, 0x00, 0xFF], vec![TypeSignature::String]).unwrap();
        assert_eq!(value.fixed_args[0], CustomAttributeArgument::String(None));
    }

    #[test]
    fn guid_arguments() {
        // Guid(0x00000000, 0x0000, 0x0000, 0xC0, 0, 0, 0, 0, 0, 0, 0x46)
        let mut data = vec![0x01, 0x00];
        data.extend_from_slice(&0_u32.to_le_bytes());
        data.extend_from_slice(&0_u16.to_le_bytes());
        data.extend_from_slice(&0_u16.to_le_bytes());
        data.extend_from_slice(&[0xC0, 0, 0, 0, 0, 0, 0, 0x46]);

        let mut params = vec![TypeSignature::U4, TypeSignature::U2, TypeSignature::U2];
        params.extend(std::iter::repeat(TypeSignature::U1).take(8));

        let value = parse(&data, params).unwrap();
        assert_eq!(value.fixed_args.len(), 11);
        assert_eq!(value.fixed_args[3], CustomAttributeArgument::U1(0xC0));
        assert_eq!(value.fixed_args[10], CustomAttributeArgument::U1(0x46));
    }

    #[test]
    fn enum_arguments() {
        // external enum defaults to 4 bytes
        let data = [0x01, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00];
        let value = parse(&data, vec![TypeSignature::ValueType(Token::new(0x0100_0001))]).unwrap();
        assert_eq!(value.fixed_args[0].as_i64(), Some(3));

        // local enum with a byte underlying type
        let data = [0x01, 0x00, 0x07, 0x00, 0x00];
        let value = parse(&data, vec![TypeSignature::ValueType(Token::new(0x0200_0002))]).unwrap();
        assert_eq!(
            value.fixed_args[0],
            CustomAttributeArgument::Enum("Test.Small".to_string(), Box::new(CustomAttributeArgument::U1(7)))
        );

        // unknown token
        let data = [0x01, 0x00, 0x03, 0x00, 0x00, 0x00];
        assert!(parse(&data, vec![TypeSignature::ValueType(Token::new(0x0100_0009))]).is_err());
    }

    #[test]
    fn type_and_array_arguments() {
        let data = [0x01, 0x00, 0x03, b'A', b'.', b'B', 0x02, 0x00, 0x00, 0x00, 0x01, 0x02];
        let params = vec![
            TypeSignature::Class(Token::new(0x0100_0003)),
            TypeSignature::SzArray(SignatureSzArray {
                modifiers: vec![],
                base: Box::new(TypeSignature::U1),
            }),
        ];

        let value = parse(&data, params).unwrap();
        assert_eq!(value.fixed_args[0].as_str(), Some("A.B"));
        assert_eq!(
            value.fixed_args[1],
            CustomAttributeArgument::Array(vec![
                CustomAttributeArgument::U1(1),
                CustomAttributeArgument::U1(2)
            ])
        );
    }

    #[test]
    fn named_arguments() {
        #[rustfmt::skip]
        let data = [
            0x01, 0x00,
            0x03, 0x00,
            // property int32 CountConst = 8
            0x54, 0x08, 0x0A, b'C', b'o', b'u', b'n', b't', b'C', b'o', b'n', b's', b't',
            0x08, 0x00, 0x00, 0x00,
            // property int16 CountParamIndex = 2
            0x54, 0x06, 0x0F, b'C', b'o', b'u', b'n', b't', b'P', b'a', b'r', b'a', b'm',
            b'I', b'n', b'd', b'e', b'x',
            0x02, 0x00,
            // field boxed string Text = "x"
            0x53, 0x51, 0x04, b'T', b'e', b'x', b't', 0x0E, 0x01, b'x',
        ];

        let value = parse(&data, vec![]).unwrap();
        assert_eq!(value.named_args.len(), 3);
        assert_eq!(value.named("CountConst").and_then(CustomAttributeArgument::as_i64), Some(8));
        assert_eq!(value.named("CountParamIndex"), Some(&CustomAttributeArgument::I2(2)));
        assert!(value.named_args[2].is_field);
        assert_eq!(value.named("Text").and_then(CustomAttributeArgument::as_str), Some("x"));
        assert!(value.named("Missing").is_none());
    }

    #[test]
    fn named_enum_array() {
        #[rustfmt::skip]
        let data = [
            0x01, 0x00,
            0x01, 0x00,
            0x54, 0x1D, 0x55, 0x0A, b'T', b'e', b's', b't', b'.', b'S', b'm', b'a', b'l', b'l',
            0x01, b'V',
            0x02, 0x00, 0x00, 0x00, 0x04, 0x05,
        ];

        let value = parse(&data, vec![]).unwrap();
        let CustomAttributeArgument::Array(items) = &value.named_args[0].value else {
            panic!("expected an array");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_i64(), Some(5));
    }

    #[test]
    fn invalid_named_argument() {
        assert!(parse(&[0x01, 0x00, 0x01, 0x00, 0x60, 0x08], vec![]).is_err());
        assert!(parse(&[0x01, 0x00, 0x01, 0x00, 0x54, 0x99, 0x01, b'A'], vec![]).is_err());
        assert!(parse(&[0x01, 0x00, 0x01, 0x00, 0x54, 0x08, 0x01], vec![]).is_err());
    }

    #[test]
    fn nesting_limit() {
        let mut data = vec![0x01, 0x00, 0x01, 0x00, 0x54];
        data.extend(std::iter::repeat(0x1D).take(MAX_NESTING_DEPTH + 2));
        data.push(0x08);
        data.extend_from_slice(&[0x01, b'A']);

        assert!(matches!(
            parse(&data, vec![]),
            Err(crate::Error::RecursionLimit(_))
        ));
    }
}
