//! Carving the requested subset out of the metadata universe.
//!
//! The [`SelectionEngine`] evaluates the configured type and member [`Pattern`]s against every
//! top-level type the target architecture can see and produces a [`Selection`]: the root
//! types the resolver starts from, the member narrowing of roots that were only reached
//! through member patterns, and the roots that stay in the closure without being emitted.
//!
//! Precedence, per type:
//!
//! - member patterns only apply to holder classes (constants and functions);
//! - a forward type match makes the type a root and discards any member narrowing;
//! - otherwise the type is a root if at least one member survived the member patterns;
//! - a reverse type match removes the type whatever else matched it.
//!
//! # Example
//!
//! ```rust
//! use dotinterop::selection::Pattern;
//! use dotinterop::typegraph::QualifiedName;
//!
//! let pattern = Pattern::parse("-IShell*");
//! assert!(pattern.is_exclude());
//! assert!(pattern.matches_type(&QualifiedName::new("Windows.Win32.UI.Shell", "IShellItem")));
//! ```

mod pattern;

pub use pattern::Pattern;

use std::collections::{BTreeSet, HashMap, HashSet};

use log::{debug, info, warn};

use crate::{
    config::{Architecture, BuilderConfiguration, PatternInput},
    metadata::{
        catalog::{DefinitionKind, MetadataCatalog, TypeDefinition},
        token::Token,
    },
    typegraph::QualifiedName,
    Result,
};

/// Members of a root reached through member patterns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberFilter {
    /// Methods and fields matched by a forward member pattern
    pub included: HashSet<Token>,
    /// Methods and fields matched by a reverse member pattern
    pub excluded: HashSet<Token>,
}

impl MemberFilter {
    /// True if `member` survives the filter
    #[must_use]
    pub fn allows(&self, member: Token) -> bool {
        !self.excluded.contains(&member) && self.included.contains(&member)
    }
}

/// Result of evaluating the patterns over a catalog
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// `TypeDef` tokens the resolver starts from, sorted for determinism
    pub roots: BTreeSet<Token>,
    /// Member narrowing per root; roots without an entry keep every member
    pub filters: HashMap<Token, MemberFilter>,
    /// Roots matched by an exclude pattern; resolved but never emitted
    pub not_generated: HashSet<Token>,
    /// Patterns that matched nothing, as written in the configuration
    pub unmatched: Vec<String>,
}

impl Selection {
    /// Number of roots
    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// True if nothing was selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// True if `token` is a root
    #[must_use]
    pub fn contains(&self, token: Token) -> bool {
        self.roots.contains(&token)
    }

    /// The member narrowing of `token`, if any
    #[must_use]
    pub fn filter(&self, token: Token) -> Option<&MemberFilter> {
        self.filters.get(&token)
    }

    /// True unless `token` was matched by an exclude pattern
    #[must_use]
    pub fn is_generated(&self, token: Token) -> bool {
        !self.not_generated.contains(&token)
    }
}

/// Evaluates type and member patterns
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    type_patterns: Vec<Pattern>,
    member_patterns: Vec<Pattern>,
    architecture: Architecture,
}

impl SelectionEngine {
    /// An engine for the given patterns and target architecture
    #[must_use]
    pub fn new(
        type_patterns: Vec<Pattern>,
        member_patterns: Vec<Pattern>,
        architecture: Architecture,
    ) -> Self {
        SelectionEngine {
            type_patterns,
            member_patterns,
            architecture,
        }
    }

    /// An engine for the patterns and architecture of `config`
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedArchitecture`] if the configured architecture is unknown
    pub fn from_config(config: &BuilderConfiguration) -> Result<Self> {
        let parse = |inputs: &[PatternInput]| -> Vec<Pattern> {
            inputs
                .iter()
                .map(|input| Pattern::parse(input.name.trim()))
                .filter(|pattern| !pattern.text().is_empty() || pattern.is_wildcard())
                .collect()
        };

        Ok(SelectionEngine::new(
            parse(&config.type_inputs),
            parse(&config.member_inputs),
            config.architecture()?,
        ))
    }

    /// The target architecture
    #[must_use]
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// True if `def` takes part in selection
    ///
    /// Nested types are reached through their declaring type, and types restricted to other
    /// architectures are invisible.
    #[must_use]
    pub fn is_visible(&self, def: &TypeDefinition) -> bool {
        !def.is_nested()
            && !def.name.name.starts_with('<')
            && def.supports_architecture(self.architecture.flag())
    }

    /// Evaluate every pattern against `catalog`
    #[must_use]
    pub fn select(&self, catalog: &MetadataCatalog) -> Selection {
        let mut selection = Selection::default();
        let mut type_hits = vec![0_usize; self.type_patterns.len()];
        let mut member_hits = vec![0_usize; self.member_patterns.len()];

        for def in catalog.types().iter().filter(|def| self.is_visible(def)) {
            let name = QualifiedName::from(&def.name);

            let mut filter = MemberFilter::default();
            if !self.member_patterns.is_empty() && catalog.kind(def) == DefinitionKind::Class {
                let members = def
                    .methods
                    .iter()
                    .map(|method| (method.token, method.name.as_str()))
                    .chain(def.fields.iter().map(|field| (field.token, field.name.as_str())));

                for (token, member) in members {
                    for (index, pattern) in self.member_patterns.iter().enumerate() {
                        if !pattern.matches_member(member) {
                            continue;
                        }

                        member_hits[index] += 1;
                        if pattern.is_reverse() {
                            filter.excluded.insert(token);
                        } else {
                            filter.included.insert(token);
                        }
                    }
                }
            }

            let mut forward = false;
            let mut reverse = false;
            let mut exclude = false;
            for (index, pattern) in self.type_patterns.iter().enumerate() {
                if !pattern.matches_type(&name) {
                    continue;
                }

                type_hits[index] += 1;
                if pattern.is_reverse() {
                    reverse = true;
                } else {
                    forward = true;
                    exclude |= pattern.is_exclude();
                }
            }

            if reverse {
                debug!("Type '{}' removed by a reverse pattern", name);
                continue;
            }

            if forward {
                selection.roots.insert(def.token);
                if exclude {
                    selection.not_generated.insert(def.token);
                }
            } else if filter.included.iter().any(|token| !filter.excluded.contains(token)) {
                selection.roots.insert(def.token);
                selection.filters.insert(def.token, filter);
            }
        }

        for (pattern, hits) in self.type_patterns.iter().zip(&type_hits) {
            if *hits == 0 {
                warn!("Type input '{}' doesn't match anything", pattern);
                selection.unmatched.push(pattern.to_string());
            }
        }
        for (pattern, hits) in self.member_patterns.iter().zip(&member_hits) {
            if *hits == 0 {
                warn!("Member input '{}' doesn't match anything", pattern);
                selection.unmatched.push(pattern.to_string());
            }
        }

        info!(
            "Selected {} root types ({} narrowed by members)",
            selection.roots.len(),
            selection.filters.len()
        );
        selection
    }
}
