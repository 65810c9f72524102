//! The "currently resolving" stack.

use crate::{
    typegraph::{TypeGraph, TypeId},
    Error, Result,
};

/// Explicit stack of the nodes whose resolution is in progress
///
/// The innermost entry is the type that owns the members being decoded, which is where
/// anonymous nested types and nested inline arrays are looked up and attached.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    stack: Vec<TypeId>,
}

impl ResolutionContext {
    /// An empty stack
    #[must_use]
    pub fn new() -> Self {
        ResolutionContext::default()
    }

    /// Enter `id`
    ///
    /// # Errors
    /// Returns [`Error::ResolutionStack`] if `id` is already the innermost entry
    pub fn push(&mut self, id: TypeId, graph: &TypeGraph) -> Result<()> {
        if let Some(&top) = self.stack.last() {
            if top == id {
                let name = node_name(graph, id);
                return Err(Error::ResolutionStack {
                    expected: format!("a node other than '{}'", name),
                    found: name,
                });
            }
        }

        self.stack.push(id);
        Ok(())
    }

    /// Leave `expected`
    ///
    /// # Errors
    /// Returns [`Error::ResolutionStack`] if the innermost entry is not `expected`
    pub fn pop(&mut self, expected: TypeId, graph: &TypeGraph) -> Result<()> {
        match self.stack.pop() {
            Some(top) if top == expected => Ok(()),
            top => Err(Error::ResolutionStack {
                expected: node_name(graph, expected),
                found: top.map_or_else(|| "<empty>".to_string(), |top| node_name(graph, top)),
            }),
        }
    }

    /// The innermost entry
    #[must_use]
    pub fn current(&self) -> Option<TypeId> {
        self.stack.last().copied()
    }

    /// Number of entries
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

fn node_name(graph: &TypeGraph, id: TypeId) -> String {
    graph
        .get(id)
        .map_or_else(|| format!("#{}", id.index()), |node| node.name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typegraph::wellknown;

    #[test]
    fn discipline() {
        let graph = TypeGraph::with_well_known();
        let int32 = graph.find_full_name(wellknown::INT32).unwrap();
        let guid = graph.find_full_name(wellknown::GUID).unwrap();

        let mut context = ResolutionContext::new();
        assert_eq!(context.current(), None);
        context.push(int32, &graph).unwrap();
        context.push(guid, &graph).unwrap();
        assert_eq!(context.current(), Some(guid));
        assert_eq!(context.depth(), 2);

        assert!(matches!(
            context.push(guid, &graph),
            Err(Error::ResolutionStack { found, .. }) if found == "System.Guid"
        ));

        assert!(matches!(
            context.pop(int32, &graph),
            Err(Error::ResolutionStack { expected, found }) if expected == "System.Int32" && found == "System.Guid"
        ));

        context.pop(int32, &graph).unwrap();
        assert!(matches!(
            context.pop(int32, &graph),
            Err(Error::ResolutionStack { found, .. }) if found == "<empty>"
        ));
    }
}
