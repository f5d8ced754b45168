//! IR builder with an insertion-point protocol
//!
//! The builder owns the module under construction and exactly one cursor:
//! a (block, position) pair where the next operation is inserted. Nested
//! construction saves and restores the cursor through `InsertionGuard`,
//! which restores the previous cursor on drop, on every exit path.
//!
//! Dominance is enforced at creation time: an operation whose operand does
//! not dominate the insertion point is rejected before anything is
//! appended, leaving the block untouched.

use crate::ir::{
    Attribute, BlockId, FuncDecl, FuncId, Function, Module, OpId, OpKind, Operation, RegionId,
    Type, Value, ValueDef,
};
use crate::registry::registry;
use log::{debug, trace};
use rexc_common::{CompilerError, SourceLocation};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

/// A (block, position) pair: the next operation is inserted at `index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPoint {
    pub block: BlockId,
    pub index: usize,
}

/// Cursor-based IR builder
pub struct IrBuilder {
    module: Module,
    cursor: Option<InsertPoint>,
}

impl IrBuilder {
    /// Create a builder for a fresh module
    pub fn new() -> Self {
        Self {
            module: Module::new(),
            cursor: None,
        }
    }

    /// The module under construction
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Finish building and return the module
    pub fn finish(self) -> Module {
        self.module
    }

    /// Current cursor, if one is set
    pub fn insertion_point(&self) -> Option<InsertPoint> {
        self.cursor
    }

    /// Restore a previously saved cursor
    pub fn restore_insertion_point(&mut self, cursor: Option<InsertPoint>) {
        self.cursor = cursor;
    }

    /// Point the cursor at the start of `block`
    pub fn set_insertion_point_to_start(&mut self, block: BlockId) {
        self.cursor = Some(InsertPoint { block, index: 0 });
    }

    /// Point the cursor at the end of `block`
    pub fn set_insertion_point_to_end(&mut self, block: BlockId) {
        let index = self.module.block(block).ops.len();
        self.cursor = Some(InsertPoint { block, index });
    }

    /// Save the cursor; the returned guard restores it when dropped
    pub fn insertion_guard(&mut self) -> InsertionGuard<'_> {
        let saved = self.cursor;
        InsertionGuard {
            builder: self,
            saved,
        }
    }

    /// Create a function with one body region containing one entry block
    /// whose arguments match the signature. The cursor is not moved; the
    /// caller must explicitly enter the entry block.
    pub fn create_function(
        &mut self,
        name: &str,
        params: Vec<Type>,
        location: SourceLocation,
    ) -> FuncId {
        debug!("creating function @{}({} params)", name, params.len());
        let body = self.module.new_region(None);
        self.module.new_block(body, &params);
        let id = FuncId(self.module.functions.len() as u32);
        self.module.functions.push(Function {
            name: name.to_string(),
            params,
            body,
            location,
        });
        id
    }

    /// Record an external function declaration
    pub fn declare_function(&mut self, name: &str, params: Vec<Type>, location: SourceLocation) {
        debug!("declaring external @{}({} params)", name, params.len());
        self.module.declarations.push(FuncDecl {
            name: name.to_string(),
            params,
            location,
        });
    }

    /// Entry block of a function's body region
    pub fn entry_block(&self, func: FuncId) -> Result<BlockId, CompilerError> {
        let body = self.module.function(func).body;
        self.module
            .region(body)
            .entry_block()
            .ok_or_else(|| CompilerError::InternalError {
                message: format!(
                    "function @{} has no entry block",
                    self.module.function(func).name
                ),
            })
    }

    /// Append an empty block with typed arguments to `region`.
    /// The cursor is unchanged.
    pub fn create_block(&mut self, region: RegionId, arg_types: &[Type]) -> BlockId {
        self.module.new_block(region, arg_types)
    }

    /// Create an operation at the cursor and return its id. Operands are
    /// validated against the dominance rule before anything is appended.
    pub fn create_operation(
        &mut self,
        kind: OpKind,
        operands: Vec<Value>,
        result_types: Vec<Type>,
        attributes: BTreeMap<String, Attribute>,
        location: SourceLocation,
    ) -> Result<OpId, CompilerError> {
        let Some(spec) = registry().spec(kind) else {
            return Err(CompilerError::unsupported(
                format!("operation kind {} is not registered", kind),
                location,
            ));
        };
        let num_regions = spec.num_regions;

        let Some(cursor) = self.cursor else {
            return Err(CompilerError::InternalError {
                message: format!("cannot create {} without an insertion point", kind),
            });
        };

        for &operand in &operands {
            if !self.module.dominates(operand, cursor.block, cursor.index) {
                return Err(CompilerError::dominance(
                    format!(
                        "operand {} of {} is not defined in an enclosing scope \
                         of the insertion point",
                        operand, kind
                    ),
                    location,
                ));
            }
        }

        let id = self.module.alloc_op(Operation {
            kind,
            operands,
            results: Vec::new(),
            attributes,
            regions: Vec::new(),
            location,
            parent: cursor.block,
        });

        let results: Vec<Value> = result_types
            .iter()
            .enumerate()
            .map(|(index, &ty)| {
                self.module.new_value(
                    ty,
                    ValueDef::OpResult {
                        op: id,
                        index: index as u32,
                    },
                )
            })
            .collect();
        let regions: Vec<RegionId> = (0..num_regions)
            .map(|_| self.module.new_region(Some(id)))
            .collect();
        {
            let op = self.module.op_mut(id);
            op.results = results;
            op.regions = regions;
        }

        self.module.block_mut(cursor.block).ops.insert(cursor.index, id);
        self.cursor = Some(InsertPoint {
            block: cursor.block,
            index: cursor.index + 1,
        });

        trace!("created {} at {:?}", kind, cursor);
        Ok(id)
    }

    /// Results of an operation
    pub fn op_results(&self, op: OpId) -> &[Value] {
        &self.module.op(op).results
    }

    /// Detach functions added after `attached`, leaving their arena
    /// entries unreachable. Used by the generation pass when a function
    /// fails mid-construction.
    pub(crate) fn detach_functions_after(&mut self, attached: usize) {
        self.module.truncate_functions(attached);
    }

    /// Materialize an integer literal of the given width
    pub fn build_int_constant(
        &mut self,
        value: i64,
        width: u32,
        location: SourceLocation,
    ) -> Result<Value, CompilerError> {
        let mut attributes = BTreeMap::new();
        attributes.insert("value".to_string(), Attribute::Int(value));
        let op = self.create_operation(
            OpKind::Constant,
            vec![],
            vec![Type::Int { width }],
            attributes,
            location,
        )?;
        Ok(self.module.op(op).results[0])
    }

    /// Materialize an index literal
    pub fn build_index_constant(
        &mut self,
        value: i64,
        location: SourceLocation,
    ) -> Result<Value, CompilerError> {
        let mut attributes = BTreeMap::new();
        attributes.insert("value".to_string(), Attribute::Int(value));
        let op = self.create_operation(
            OpKind::Constant,
            vec![],
            vec![Type::Index],
            attributes,
            location,
        )?;
        Ok(self.module.op(op).results[0])
    }

    /// Materialize a string literal
    pub fn build_str_constant(
        &mut self,
        value: &str,
        location: SourceLocation,
    ) -> Result<Value, CompilerError> {
        let mut attributes = BTreeMap::new();
        attributes.insert("value".to_string(), Attribute::Str(value.to_string()));
        let op = self.create_operation(
            OpKind::Constant,
            vec![],
            vec![Type::Str],
            attributes,
            location,
        )?;
        Ok(self.module.op(op).results[0])
    }

    /// Build a call to a named function
    pub fn build_call(
        &mut self,
        callee: &str,
        args: Vec<Value>,
        result_types: Vec<Type>,
        location: SourceLocation,
    ) -> Result<OpId, CompilerError> {
        let mut attributes = BTreeMap::new();
        attributes.insert("callee".to_string(), Attribute::Str(callee.to_string()));
        self.create_operation(OpKind::Call, args, result_types, attributes, location)
    }

    /// Build an SPMD operation. Its body region gets an entry block
    /// taking no arguments.
    pub fn build_spmd(
        &mut self,
        threads: Value,
        location: SourceLocation,
    ) -> Result<OpId, CompilerError> {
        let op = self.create_operation(
            OpKind::Spmd,
            vec![threads],
            vec![],
            BTreeMap::new(),
            location,
        )?;
        let body = self.module.op(op).regions[0];
        self.create_block(body, &[]);
        Ok(op)
    }

    /// Build a counted loop. The body region's entry block is created
    /// eagerly with the induction variable argument followed by one
    /// argument per loop-carried value.
    pub fn build_for(
        &mut self,
        lower: Value,
        upper: Value,
        step: Value,
        carried_types: Vec<Type>,
        location: SourceLocation,
    ) -> Result<OpId, CompilerError> {
        let op = self.create_operation(
            OpKind::For,
            vec![lower, upper, step],
            carried_types.clone(),
            BTreeMap::new(),
            location,
        )?;
        let body = self.module.op(op).regions[0];
        let mut arg_types = vec![Type::Index];
        arg_types.extend(carried_types);
        self.create_block(body, &arg_types);
        Ok(op)
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Saves the builder's cursor and restores it on drop.
///
/// Dereferences to the builder, so nested construction reads naturally:
///
/// ```ignore
/// let mut guard = builder.insertion_guard();
/// guard.set_insertion_point_to_end(body_block);
/// guard.build_call("printf", args, vec![], loc)?;
/// // prior cursor restored here, even on early return
/// ```
pub struct InsertionGuard<'a> {
    builder: &'a mut IrBuilder,
    saved: Option<InsertPoint>,
}

impl Deref for InsertionGuard<'_> {
    type Target = IrBuilder;

    fn deref(&self) -> &IrBuilder {
        self.builder
    }
}

impl DerefMut for InsertionGuard<'_> {
    fn deref_mut(&mut self) -> &mut IrBuilder {
        self.builder
    }
}

impl Drop for InsertionGuard<'_> {
    fn drop(&mut self) {
        self.builder.cursor = self.saved;
    }
}
