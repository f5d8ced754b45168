//! Operation kind registry
//!
//! Process-wide table of the operation kinds the builder may construct,
//! initialized once and immutable afterwards. The builder consults it
//! before creating any operation; a kind without a registered spec is
//! rejected with `UnsupportedConstruct` instead of silently succeeding.

use crate::ir::OpKind;
use std::sync::OnceLock;

/// Expected attribute value kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Int,
    Str,
    /// Either kind is acceptable; finer checks happen in the verifier
    Any,
}

/// Structural description of one operation kind
#[derive(Debug, Clone)]
pub struct OpSpec {
    pub kind: OpKind,
    /// Number of regions the operation owns
    pub num_regions: usize,
    /// Attributes that must be present, with their value kinds
    pub required_attrs: &'static [(&'static str, AttrKind)],
    /// Terminator operations must be last in their block
    pub is_terminator: bool,
}

/// The registered kind set
#[derive(Debug)]
pub struct Registry {
    specs: Vec<OpSpec>,
}

impl Registry {
    fn builtin() -> Self {
        Self {
            specs: vec![
                OpSpec {
                    kind: OpKind::Constant,
                    num_regions: 0,
                    required_attrs: &[("value", AttrKind::Any)],
                    is_terminator: false,
                },
                OpSpec {
                    kind: OpKind::Call,
                    num_regions: 0,
                    required_attrs: &[("callee", AttrKind::Str)],
                    is_terminator: false,
                },
                OpSpec {
                    kind: OpKind::Spmd,
                    num_regions: 1,
                    required_attrs: &[],
                    is_terminator: false,
                },
                OpSpec {
                    kind: OpKind::For,
                    num_regions: 1,
                    required_attrs: &[],
                    is_terminator: false,
                },
            ],
        }
    }

    /// Look up the spec for a kind, if registered
    pub fn spec(&self, kind: OpKind) -> Option<&OpSpec> {
        self.specs.iter().find(|spec| spec.kind == kind)
    }
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// The process-wide registry, registering the builtin kinds on first use
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::builtin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds_registered() {
        for kind in [OpKind::Constant, OpKind::Call, OpKind::Spmd, OpKind::For] {
            assert!(registry().spec(kind).is_some(), "{} missing", kind);
        }
    }

    #[test]
    fn test_region_counts() {
        assert_eq!(registry().spec(OpKind::Constant).unwrap().num_regions, 0);
        assert_eq!(registry().spec(OpKind::Spmd).unwrap().num_regions, 1);
        assert_eq!(registry().spec(OpKind::For).unwrap().num_regions, 1);
    }

    #[test]
    fn test_required_attrs() {
        let constant = registry().spec(OpKind::Constant).unwrap();
        assert_eq!(constant.required_attrs, &[("value", AttrKind::Any)]);
        let call = registry().spec(OpKind::Call).unwrap();
        assert_eq!(call.required_attrs, &[("callee", AttrKind::Str)]);
    }
}
