//! Last-error detection for imported functions.
//!
//! Win32 metadata does not reliably record which functions report failure through the
//! thread's last-error slot. When the import does not say so, the return type decides:
//! booleans and handles usually do, `HRESULT` and `void` never do. This is a heuristic and
//! is wrong for some functions; patches override it per method.

use crate::{
    config::SetLastErrorMode,
    marshal::SignatureSynthesizer,
    metadata::catalog::ImportFlags,
    typegraph::{wellknown, Method, TypeNode},
};

impl SignatureSynthesizer<'_> {
    /// True if the import of `method` declared by `owner` should capture the last error
    ///
    /// Only functions of API holders are considered; a patched flag always wins.
    #[must_use]
    pub fn set_last_error(&self, owner: &TypeNode, method: &Method) -> bool {
        if let Some(patched) = method.set_last_error {
            return patched;
        }

        owner.is_api_holder() && self.has_set_last_error(method)
    }

    /// The last-error heuristic for `method`
    #[must_use]
    pub fn has_set_last_error(&self, method: &Method) -> bool {
        let attributed = method
            .import
            .as_ref()
            .is_some_and(|import| import.flags.contains(ImportFlags::SUPPORTS_LAST_ERROR));
        if attributed {
            return true;
        }

        if self.generation.set_last_error_mode != SetLastErrorMode::Auto {
            return false;
        }
        let Some(return_type) = method.return_type else {
            return false;
        };

        let node = &self.graph[return_type];
        match node.name.full_name().as_str() {
            wellknown::VOID | wellknown::HRESULT => false,
            wellknown::BOOLEAN | wellknown::BOOL | wellknown::INTPTR | wellknown::UINTPTR => true,
            _ => node.is_handle,
        }
    }
}
