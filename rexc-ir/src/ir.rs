//! IR data model
//!
//! The module owns four arenas (operations, blocks, regions, values);
//! every cross-reference is a copyable id into one of them. The ownership
//! tree is Module -> Function -> Region -> Block -> Operation -> Region
//! and so on; entities detached on an error path simply become
//! unreachable from the function list and are never visited again.

use rexc_common::SourceLocation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A value type in the IR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// No value
    None,
    /// Fixed-width integer
    Int { width: u32 },
    /// Platform index type (loop bounds, counts)
    Index,
    /// Opaque string literal
    Str,
}

impl Type {
    /// Check if this is an integer or index type
    pub fn is_integer_like(&self) -> bool {
        matches!(self, Type::Int { .. } | Type::Index)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::None => write!(f, "none"),
            Type::Int { width } => write!(f, "i{}", width),
            Type::Index => write!(f, "index"),
            Type::Str => write!(f, "str"),
        }
    }
}

/// Compile-time attribute constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Attribute {
    Int(i64),
    Str(String),
}

macro_rules! ir_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

ir_id! {
    /// Id of an operation in the module's operation arena
    OpId
}
ir_id! {
    /// Id of a block in the module's block arena
    BlockId
}
ir_id! {
    /// Id of a region in the module's region arena
    RegionId
}
ir_id! {
    /// Id of a function in the module's function list
    FuncId
}
ir_id! {
    /// An SSA value: produced exactly once, referenced by identity
    Value
}

// Diagnostics show the arena id; the printer assigns its own `%N` names
// per function, so a `%` prefix here would suggest a name that never
// appears in the printed IR.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value #{}", self.0)
    }
}

/// What produced a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueDef {
    /// The `index`-th result of an operation
    OpResult { op: OpId, index: u32 },
    /// The `index`-th argument of a block
    BlockArg { block: BlockId, index: u32 },
}

/// Value table entry: type plus producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueData {
    pub ty: Type,
    pub def: ValueDef,
}

/// Operation kinds (closed set; extending it means adding a tag here and
/// a matching entry in the kind registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpKind {
    /// Materializes a compile-time literal; attribute `value`, one result
    Constant,
    /// Call to a declared function; attribute `callee`, at most one result
    Call,
    /// SPMD region: one operand (participant count), one body region
    Spmd,
    /// Counted loop: operands lower/upper/step, one body region whose
    /// entry block takes the induction variable then loop-carried values
    For,
}

impl OpKind {
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Constant => "rex.constant",
            OpKind::Call => "rex.call",
            OpKind::Spmd => "rex.spmd",
            OpKind::For => "rex.for",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An operation: kind tag, operands, results, attributes, nested regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    pub operands: Vec<Value>,
    pub results: Vec<Value>,
    pub attributes: BTreeMap<String, Attribute>,
    pub regions: Vec<RegionId>,
    pub location: SourceLocation,
    /// Owning block
    pub parent: BlockId,
}

/// A block: typed arguments plus an ordered operation sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub args: Vec<Value>,
    pub ops: Vec<OpId>,
    /// Owning region
    pub parent: RegionId,
}

/// A region: an ordered block sequence owned by an operation (or by a
/// function, for body regions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub blocks: Vec<BlockId>,
    /// Owning operation; `None` for a function body region
    pub parent: Option<OpId>,
}

impl Region {
    pub fn entry_block(&self) -> Option<BlockId> {
        self.blocks.first().copied()
    }
}

/// A function definition: name, parameter types, one body region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<Type>,
    pub body: RegionId,
    pub location: SourceLocation,
}

/// An external function declaration (callable but not defined here)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Type>,
    pub location: SourceLocation,
}

/// IR module: the top-level container and owner of all arenas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Module {
    pub functions: Vec<Function>,
    pub declarations: Vec<FuncDecl>,

    ops: Vec<Operation>,
    blocks: Vec<Block>,
    regions: Vec<Region>,
    values: Vec<ValueData>,
}

impl Module {
    /// Create a new empty module
    pub fn new() -> Self {
        Self::default()
    }

    pub fn op(&self, id: OpId) -> &Operation {
        &self.ops[id.index()]
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn region(&self, id: RegionId) -> &Region {
        &self.regions[id.index()]
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn value_type(&self, value: Value) -> Type {
        self.values[value.index()].ty
    }

    pub fn value_def(&self, value: Value) -> ValueDef {
        self.values[value.index()].def
    }

    /// Find a defined function by name
    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Find an external declaration by name
    pub fn get_declaration(&self, name: &str) -> Option<&FuncDecl> {
        self.declarations.iter().find(|d| d.name == name)
    }

    // Arena allocation is reserved for the builder.

    pub(crate) fn new_region(&mut self, parent: Option<OpId>) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(Region {
            blocks: Vec::new(),
            parent,
        });
        id
    }

    pub(crate) fn new_block(&mut self, parent: RegionId, arg_types: &[Type]) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            args: Vec::new(),
            ops: Vec::new(),
            parent,
        });
        let args: Vec<Value> = arg_types
            .iter()
            .enumerate()
            .map(|(index, &ty)| {
                self.new_value(
                    ty,
                    ValueDef::BlockArg {
                        block: id,
                        index: index as u32,
                    },
                )
            })
            .collect();
        self.blocks[id.index()].args = args;
        self.regions[parent.index()].blocks.push(id);
        id
    }

    pub(crate) fn new_value(&mut self, ty: Type, def: ValueDef) -> Value {
        let id = Value(self.values.len() as u32);
        self.values.push(ValueData { ty, def });
        id
    }

    pub(crate) fn alloc_op(&mut self, op: Operation) -> OpId {
        let id = OpId(self.ops.len() as u32);
        self.ops.push(op);
        id
    }

    pub(crate) fn op_mut(&mut self, id: OpId) -> &mut Operation {
        &mut self.ops[id.index()]
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    /// Detach functions added after `len`. Arena entries stay behind but
    /// become unreachable; used when generation of a function fails.
    pub(crate) fn truncate_functions(&mut self, len: usize) {
        self.functions.truncate(len);
    }

    /// The block a value is defined in, plus the defining operation's
    /// position within that block (`None` for block arguments, which are
    /// defined before every operation).
    pub fn defining_position(&self, value: Value) -> (BlockId, Option<usize>) {
        match self.value_def(value) {
            ValueDef::BlockArg { block, .. } => (block, None),
            ValueDef::OpResult { op, .. } => {
                let block = self.op(op).parent;
                let pos = self
                    .block(block)
                    .ops
                    .iter()
                    .position(|&candidate| candidate == op);
                (block, pos)
            }
        }
    }

    /// Check whether `value` dominates the program point just before
    /// position `index` in `block`: its definition must appear earlier in
    /// the same block, or in a strictly enclosing block (including as a
    /// block argument of an enclosing block). Sibling regions never
    /// dominate each other.
    pub fn dominates(&self, value: Value, block: BlockId, index: usize) -> bool {
        let (def_block, def_pos) = self.defining_position(value);

        if def_block == block {
            return match def_pos {
                None => true,
                Some(pos) => pos < index,
            };
        }

        // Walk outward through enclosing operations.
        let mut current = block;
        loop {
            let region = self.block(current).parent;
            let Some(enclosing_op) = self.region(region).parent else {
                return false;
            };
            let enclosing_block = self.op(enclosing_op).parent;
            if enclosing_block == def_block {
                let op_pos = self
                    .block(enclosing_block)
                    .ops
                    .iter()
                    .position(|&candidate| candidate == enclosing_op);
                return match (def_pos, op_pos) {
                    (None, _) => true,
                    (Some(def), Some(user)) => def < user,
                    (Some(_), None) => false,
                };
            }
            current = enclosing_block;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(Type::None.to_string(), "none");
        assert_eq!(Type::Int { width: 32 }.to_string(), "i32");
        assert_eq!(Type::Index.to_string(), "index");
        assert_eq!(Type::Str.to_string(), "str");
    }

    #[test]
    fn test_type_structural_equality() {
        assert_eq!(Type::Int { width: 32 }, Type::Int { width: 32 });
        assert_ne!(Type::Int { width: 32 }, Type::Int { width: 64 });
    }

    #[test]
    fn test_type_kinds() {
        assert!(Type::Int { width: 8 }.is_integer_like());
        assert!(Type::Index.is_integer_like());
        assert!(!Type::Str.is_integer_like());
        assert!(!Type::None.is_integer_like());
    }

    #[test]
    fn test_value_display_distinct_from_printed_names() {
        // The printer numbers values per function; diagnostics must not
        // look like printed `%N` names.
        assert_eq!(Value(7).to_string(), "value #7");
    }

    #[test]
    fn test_op_kind_names() {
        assert_eq!(OpKind::Constant.name(), "rex.constant");
        assert_eq!(OpKind::Call.name(), "rex.call");
        assert_eq!(OpKind::Spmd.name(), "rex.spmd");
        assert_eq!(OpKind::For.name(), "rex.for");
    }

    #[test]
    fn test_block_args_get_values() {
        let mut module = Module::new();
        let region = module.new_region(None);
        let block = module.new_block(region, &[Type::Index, Type::Str]);

        let args = module.block(block).args.clone();
        assert_eq!(args.len(), 2);
        assert_eq!(module.value_type(args[0]), Type::Index);
        assert_eq!(module.value_type(args[1]), Type::Str);
        assert_eq!(
            module.value_def(args[0]),
            ValueDef::BlockArg { block, index: 0 }
        );
    }

    #[test]
    fn test_region_entry_block() {
        let mut module = Module::new();
        let region = module.new_region(None);
        assert_eq!(module.region(region).entry_block(), None);
        let block = module.new_block(region, &[]);
        assert_eq!(module.region(region).entry_block(), Some(block));
    }
}
