//! COM dispatch tables.
//!
//! Interface methods are called through the table a COM object points to. Slots are assigned
//! along the single-inheritance chain: the methods of the farthest base come first, then each
//! derived interface appends its own in declaration order. The root COM interface is not part
//! of the graph, so IUnknown-derived interfaces start after its three methods when emitted as
//! COM interfaces and at zero when emitted as dispatch-table structs.
//!
//! A derived method with the same name and parameter shape as an ancestor method would hide
//! it in hosts that surface interface members unqualified. [`method_name`] renames the derived
//! copy with its interface name as prefix.

use crate::{
    marshal::{SignatureSynthesizer, SynthesisOptions},
    typegraph::{Method, TypeGraph, TypeId},
    Error, Result,
};

/// Comment attached to a renamed method
pub const RENAMED_COMMENT: &str = " // renamed, see https://github.com/dotnet/runtime/issues/101240";

/// A method and the slot it is called through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSlot {
    /// Interface declaring the method
    pub owner: TypeId,
    /// Position of the method in its owner
    pub method: usize,
    /// Index in the dispatch table
    pub slot: usize,
}

/// The single base interface of `id`
///
/// # Errors
/// Returns [`Error::NotSupported`] when the interface has more than one base
pub fn base_interface(graph: &TypeGraph, id: TypeId) -> Result<Option<TypeId>> {
    let node = &graph[id];
    match node.interfaces.as_slice() {
        [] => Ok(None),
        [base] => Ok(Some(*base)),
        _ => Err(Error::NotSupported(format!(
            "Interface {} has {} base interfaces",
            node.name,
            node.interfaces.len()
        ))),
    }
}

/// Slots of every method callable on `id`, bases first, starting at `first_slot`
///
/// # Errors
/// Returns [`Error::NotSupported`] when an interface of the chain has more than one base
pub fn dispatch_slots(graph: &TypeGraph, id: TypeId, first_slot: usize) -> Result<Vec<DispatchSlot>> {
    let mut chain = vec![id];
    let mut current = id;
    while let Some(base) = base_interface(graph, current)? {
        if chain.contains(&base) {
            return Err(Error::NotSupported(format!(
                "Interface {} inherits from itself",
                graph[id].name
            )));
        }
        chain.push(base);
        current = base;
    }

    let mut slots = Vec::new();
    let mut slot = first_slot;
    for owner in chain.into_iter().rev() {
        for method in 0..graph[owner].methods.len() {
            slots.push(DispatchSlot {
                owner,
                method,
                slot,
            });
            slot += 1;
        }
    }

    Ok(slots)
}

/// True if both methods have the same name and the same parameter types and directions
#[must_use]
pub fn has_same_signature(
    synthesizer: &SignatureSynthesizer<'_>,
    graph: &TypeGraph,
    owner: TypeId,
    first: &Method,
    second: &Method,
) -> bool {
    if first.name != second.name || first.parameters.len() != second.parameters.len() {
        return false;
    }

    let node = &graph[owner];
    first
        .parameters
        .iter()
        .zip(&second.parameters)
        .all(|(a, b)| {
            let a = synthesizer.parameter(node, first, a, SynthesisOptions::empty());
            let b = synthesizer.parameter(node, second, b, SynthesisOptions::empty());
            match (a, b) {
                (Ok(a), Ok(b)) => a.type_name == b.type_name && a.direction == b.direction,
                _ => false,
            }
        })
}

/// The name `method` of `owner` is emitted under and, if it was renamed, the comment to attach
#[must_use]
pub fn method_name(
    synthesizer: &SignatureSynthesizer<'_>,
    graph: &TypeGraph,
    owner: TypeId,
    method: &Method,
) -> (String, Option<&'static str>) {
    let name = method.emitted_name().to_string();
    let hidden = graph.all_interfaces(owner).into_iter().any(|ancestor| {
        graph[ancestor]
            .methods
            .iter()
            .any(|candidate| has_same_signature(synthesizer, graph, owner, candidate, method))
    });

    if hidden {
        (
            format!("{}_{}", graph[owner].name.name(), name),
            Some(RENAMED_COMMENT),
        )
    } else {
        (name, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Generation,
        emit::csharp::CSharpNamer,
        metadata::catalog::ParamAttributes,
        typegraph::{wellknown, Parameter, QualifiedName, TypeKind, TypeNode},
    };

    fn interface(graph: &mut TypeGraph, name: &str, bases: &[TypeId], methods: Vec<Method>) -> TypeId {
        let mut node = TypeNode::new(
            QualifiedName::new("Windows.Win32.Graphics.Dxgi", name),
            TypeKind::Interface {
                is_iunknown_derived: true,
            },
        );
        node.interfaces = bases.to_vec();
        node.methods = methods;
        graph.insert(node)
    }

    fn method(name: &str, parameters: Vec<Parameter>) -> Method {
        let mut method = Method::new(None, name);
        method.parameters = parameters;
        method
    }

    #[test]
    fn slots_follow_the_chain() {
        let mut graph = TypeGraph::with_well_known();
        let object = interface(
            &mut graph,
            "IDXGIObject",
            &[],
            vec![method("SetPrivateData", vec![]), method("GetParent", vec![])],
        );
        let child = interface(&mut graph, "IDXGIDeviceSubObject", &[object], vec![method("GetDevice", vec![])]);
        let factory = interface(&mut graph, "IDXGIFactory", &[child], vec![method("EnumAdapters", vec![])]);

        let slots = dispatch_slots(&graph, factory, 3).unwrap();
        let owners: Vec<(TypeId, usize, usize)> = slots
            .iter()
            .map(|slot| (slot.owner, slot.method, slot.slot))
            .collect();
        assert_eq!(
            owners,
            [(object, 0, 3), (object, 1, 4), (child, 0, 5), (factory, 0, 6)]
        );

        let own: Vec<usize> = dispatch_slots(&graph, child, 0)
            .unwrap()
            .into_iter()
            .filter(|slot| slot.owner == child)
            .map(|slot| slot.slot)
            .collect();
        assert_eq!(own, [2]);
    }

    #[test]
    fn own_slots_follow_base_methods() {
        let mut graph = TypeGraph::with_well_known();
        let base = interface(
            &mut graph,
            "IBase",
            &[],
            vec![method("First", vec![]), method("Second", vec![]), method("Third", vec![])],
        );
        let derived = interface(
            &mut graph,
            "IDerived",
            &[base],
            vec![method("Fourth", vec![]), method("Fifth", vec![])],
        );

        let slots = dispatch_slots(&graph, derived, 0).unwrap();
        let base_slots: Vec<usize> = slots.iter().filter(|s| s.owner == base).map(|s| s.slot).collect();
        let own_slots: Vec<(usize, usize)> = slots
            .iter()
            .filter(|s| s.owner == derived)
            .map(|s| (s.method, s.slot))
            .collect();
        assert_eq!(base_slots, [0, 1, 2]);
        assert_eq!(own_slots, [(0, 3), (1, 4)]);
    }

    #[test]
    fn multiple_bases_are_rejected() {
        let mut graph = TypeGraph::with_well_known();
        let first = interface(&mut graph, "IFirst", &[], vec![]);
        let second = interface(&mut graph, "ISecond", &[], vec![]);
        let both = interface(&mut graph, "IBoth", &[first, second], vec![]);

        assert!(matches!(base_interface(&graph, both), Err(Error::NotSupported(_))));
        assert!(matches!(dispatch_slots(&graph, both, 0), Err(Error::NotSupported(_))));
        assert_eq!(base_interface(&graph, first).unwrap(), None);
    }

    #[test]
    fn hidden_methods_are_renamed() {
        let mut graph = TypeGraph::with_well_known();
        let int = graph.find_full_name(wellknown::INT32).unwrap();
        let uint = graph.find_full_name(wellknown::UINT32).unwrap();
        let int_ptr = graph.pointer_to(int, 1);

        let flags = |type_id| {
            let mut parameter = Parameter::new("value", 1, type_id);
            parameter.attributes = ParamAttributes::IN;
            parameter
        };

        let base = interface(
            &mut graph,
            "IDXGISwapChain",
            &[],
            vec![method("Present", vec![flags(int)]), method("GetDesc", vec![flags(int_ptr)])],
        );
        let derived = interface(
            &mut graph,
            "IDXGISwapChain1",
            &[base],
            vec![method("Present", vec![flags(int)]), method("GetDesc", vec![flags(uint)])],
        );

        let generation = Generation::default();
        let namer = CSharpNamer::new(false);
        let synthesizer = SignatureSynthesizer::new(&graph, &generation, &namer);

        let present = &graph[derived].methods[0];
        assert_eq!(
            method_name(&synthesizer, &graph, derived, present),
            ("IDXGISwapChain1_Present".to_string(), Some(RENAMED_COMMENT))
        );

        let desc = &graph[derived].methods[1];
        assert_eq!(
            method_name(&synthesizer, &graph, derived, desc),
            ("GetDesc".to_string(), None)
        );

        let own = &graph[base].methods[0];
        assert_eq!(method_name(&synthesizer, &graph, base, own).0, "Present");
    }
}
