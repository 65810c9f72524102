//! Signature types to graph nodes.

use log::warn;

use crate::{
    metadata::{
        signatures::{SignatureArray, SignatureParameter, TypeSignature},
        tables::TableId,
        token::Token,
    },
    resolver::DependencyResolver,
    typegraph::{wellknown, QualifiedName, TypeId, TypeKind, TypeNode},
    Error, Result,
};

impl DependencyResolver<'_> {
    /// The node a method parameter or return slot refers to
    pub(crate) fn parameter_type(&mut self, parameter: &SignatureParameter) -> Result<TypeId> {
        if parameter.by_ref {
            return Err(Error::NotSupported(format!(
                "By-reference parameter of type {:?}",
                parameter.base
            )));
        }

        self.signature_type(&parameter.base)
    }

    /// The node `signature` refers to, created on first use for pointers and arrays
    ///
    /// # Errors
    /// Returns [`Error::NotSupported`] for managed-only forms (generics, by-refs, function
    /// pointers, single-dimensional managed arrays) that never appear in native metadata.
    pub fn signature_type(&mut self, signature: &TypeSignature) -> Result<TypeId> {
        let primitive = match signature {
            TypeSignature::Void => wellknown::VOID,
            TypeSignature::Boolean => wellknown::BOOLEAN,
            TypeSignature::Char => wellknown::CHAR,
            TypeSignature::I1 => wellknown::SBYTE,
            TypeSignature::U1 => wellknown::BYTE,
            TypeSignature::I2 => wellknown::INT16,
            TypeSignature::U2 => wellknown::UINT16,
            TypeSignature::I4 => wellknown::INT32,
            TypeSignature::U4 => wellknown::UINT32,
            TypeSignature::I8 => wellknown::INT64,
            TypeSignature::U8 => wellknown::UINT64,
            TypeSignature::R4 => wellknown::SINGLE,
            TypeSignature::R8 => wellknown::DOUBLE,
            TypeSignature::String => wellknown::STRING,
            TypeSignature::I => wellknown::INTPTR,
            TypeSignature::U => wellknown::UINTPTR,
            TypeSignature::Object => wellknown::OBJECT,
            TypeSignature::Ptr(pointer) => {
                let pointee = self.signature_type(&pointer.base)?;
                return Ok(self.graph.pointer_to(pointee, 1));
            }
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => {
                return self.token_type(*token);
            }
            TypeSignature::Array(array) => return self.array_type(array),
            other => {
                return Err(Error::NotSupported(format!("Signature type {:?}", other)));
            }
        };

        self.well_known(primitive)
    }

    pub(crate) fn well_known(&self, full_name: &str) -> Result<TypeId> {
        self.graph
            .find_full_name(full_name)
            .ok_or_else(|| Error::TypeNotFound(full_name.to_string()))
    }

    /// The node of a `TypeDef` or `TypeRef`
    pub(crate) fn token_type(&mut self, token: Token) -> Result<TypeId> {
        if token.is_table(TableId::TypeDef) {
            if let Some(id) = self.by_token.get(&token) {
                return Ok(*id);
            }
        }

        let catalog = self.catalog;
        let Some(type_name) = catalog.type_name(token) else {
            warn!("Can't resolve: token 0x{:08X}", token.value());
            return self.well_known(wellknown::OBJECT);
        };

        let name = QualifiedName::from(type_name);
        if let Some(id) = self.graph.find(&name) {
            return Ok(id);
        }
        if let Some(id) = catalog
            .resolve(token)
            .and_then(|def| self.by_token.get(&def.token))
        {
            return Ok(*id);
        }

        if name.namespace().is_empty() {
            if let Some(current) = self.context.current() {
                let nested = self.graph[current].nested_types.iter().copied().find(|id| {
                    let candidate = &self.graph[*id].name;
                    candidate.is_nested() && candidate.nested_name() == name.name()
                });
                if let Some(id) = nested {
                    return Ok(id);
                }
            }
        }

        warn!("Can't resolve: {}", name);
        self.well_known(wellknown::OBJECT)
    }

    fn array_type(&mut self, array: &SignatureArray) -> Result<TypeId> {
        let element = self.signature_type(&array.base)?;

        if array.rank == 1 && array.sizes.len() == 1 {
            self.add_dependencies(element)?;
            return Ok(self.inline_array(element, array.sizes[0]));
        }

        let element_name = &self.graph[element].name;
        let rank_marker = ",".repeat(array.rank.saturating_sub(1) as usize);
        let name = QualifiedName::new(
            element_name.namespace(),
            format!("{}[{}]", element_name.name(), rank_marker),
        );
        if let Some(id) = self.graph.find(&name) {
            return Ok(id);
        }

        Ok(self.graph.insert(TypeNode::new(
            name,
            TypeKind::Array {
                element,
                rank: array.rank,
            },
        )))
    }

    /// The `InlineArray{Element}_{Size}` node for `size` elements of `element`
    ///
    /// Arrays of nested elements are nested in the type being resolved and are only emitted
    /// as part of it.
    pub(crate) fn inline_array(&mut self, element: TypeId, size: u32) -> TypeId {
        let element_name = self.graph[element].name.without_pointer();
        let is_nested = element_name.is_nested();
        let name = QualifiedName::new(
            wellknown::INTEROP_TYPES_NAMESPACE,
            format!("InlineArray{}_{}", element_name.nested_name(), size),
        );

        let id = match self.graph.find(&name) {
            Some(id) => id,
            None => {
                let mut node = TypeNode::new(name, TypeKind::InlineArray { element, size });
                node.is_value_type = true;
                node.is_nested = is_nested;
                node.is_generated = !is_nested;
                self.graph.insert(node)
            }
        };
        self.types_to_build.insert(id);

        if is_nested {
            if let Some(current) = self.context.current() {
                let owner = &mut self.graph[current];
                if !owner.nested_types.contains(&id) {
                    owner.nested_types.push(id);
                }
            }
        }

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Architecture,
        metadata::{catalog::MetadataCatalog, signatures::SignaturePointer},
        test::MetadataBuilder,
    };

    fn catalog() -> MetadataCatalog {
        let mut builder = MetadataBuilder::new("Test.winmd");
        let value_type = builder.type_ref("System", "ValueType");
        builder.type_ref("", "_Anonymous_e__Union");
        builder.type_ref("Windows.Win32.Missing", "GONE");

        let rect = builder.type_def(0x0010_0109, "Test", "RECT", value_type);
        builder.field(0x0006, "left", &[0x06, 0x08]);
        let inner = builder.type_def(0x0000_0102, "", "_Anonymous_e__Union", value_type);
        builder.field(0x0006, "Value", &[0x06, 0x08]);
        builder.nested(inner, rect);

        MetadataCatalog::from_metadata(&builder.finish()).unwrap()
    }

    fn pointer(base: TypeSignature) -> TypeSignature {
        TypeSignature::Ptr(SignaturePointer {
            modifiers: Vec::new(),
            base: Box::new(base),
        })
    }

    #[test]
    fn primitives_and_pointers() {
        let catalog = catalog();
        let mut resolver = DependencyResolver::new(&catalog, Architecture::X64);

        let int32 = resolver.signature_type(&TypeSignature::I4).unwrap();
        assert_eq!(resolver.graph()[int32].name.full_name(), wellknown::INT32);

        let ppv = resolver
            .signature_type(&pointer(pointer(TypeSignature::Void)))
            .unwrap();
        assert_eq!(resolver.graph()[ppv].name.full_name(), "System.Void**");
        assert_eq!(resolver.graph()[ppv].indirections(), 2);

        assert!(matches!(
            resolver.signature_type(&TypeSignature::GenericParamType(0)),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn tokens() {
        let catalog = catalog();
        let mut resolver = DependencyResolver::new(&catalog, Architecture::X64);

        let rect = catalog.find("Test.RECT").unwrap().token;
        let id = resolver.token_type(rect).unwrap();
        assert_eq!(resolver.graph()[id].name.full_name(), "Test.RECT");

        let missing = Token::from_parts(TableId::TypeRef, 3);
        let object = resolver.token_type(missing).unwrap();
        assert_eq!(resolver.graph()[object].name.full_name(), wellknown::OBJECT);
    }

    #[test]
    fn anonymous_nested_reference() {
        let catalog = catalog();
        let mut resolver = DependencyResolver::new(&catalog, Architecture::X64);
        let rect = resolver.token_type(catalog.find("Test.RECT").unwrap().token).unwrap();
        resolver.add_dependencies(rect).unwrap();

        let anonymous = Token::from_parts(TableId::TypeRef, 2);
        let unscoped = resolver.token_type(anonymous).unwrap();
        assert_eq!(resolver.graph()[unscoped].name.full_name(), wellknown::OBJECT);

        resolver.context.push(rect, &resolver.graph).unwrap();
        let nested = resolver.token_type(anonymous).unwrap();
        assert_eq!(
            resolver.graph()[nested].name.full_name(),
            "Test.RECT+_Anonymous_e__Union"
        );
    }

    #[test]
    fn inline_arrays() {
        let catalog = catalog();
        let mut resolver = DependencyResolver::new(&catalog, Architecture::X64);
        let array = SignatureArray {
            base: Box::new(TypeSignature::U2),
            rank: 1,
            sizes: vec![32],
            lower_bounds: Vec::new(),
        };

        let id = resolver.signature_type(&TypeSignature::Array(array.clone())).unwrap();
        let node = &resolver.graph()[id];
        assert_eq!(
            node.name.full_name(),
            "System.Runtime.InteropServices.InteropTypes.InlineArrayUInt16_32"
        );
        assert!(node.is_generated && node.is_value_type);
        assert!(resolver.types_to_build.contains(&id));
        assert_eq!(resolver.signature_type(&TypeSignature::Array(array)).unwrap(), id);

        let rect = resolver.token_type(catalog.find("Test.RECT").unwrap().token).unwrap();
        resolver.add_dependencies(rect).unwrap();
        let inner = resolver.graph()[rect].nested_types[0];
        resolver.context.push(rect, &resolver.graph).unwrap();
        let nested = resolver.inline_array(inner, 2);
        let node = &resolver.graph()[nested];
        assert_eq!(node.name.name(), "InlineArray_Anonymous_e__Union_2");
        assert!(node.is_nested && !node.is_generated);
        assert!(resolver.graph()[rect].nested_types.contains(&nested));
    }

    #[test]
    fn general_arrays() {
        let catalog = catalog();
        let mut resolver = DependencyResolver::new(&catalog, Architecture::X64);
        let array = TypeSignature::Array(SignatureArray {
            base: Box::new(TypeSignature::I4),
            rank: 2,
            sizes: Vec::new(),
            lower_bounds: Vec::new(),
        });

        let id = resolver.signature_type(&array).unwrap();
        assert_eq!(resolver.graph()[id].name.full_name(), "System.Int32[,]");
        assert!(!resolver.graph()[id].is_generated);
    }
}
