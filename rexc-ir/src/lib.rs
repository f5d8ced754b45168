//! REX Compiler - Structured Intermediate Representation
//!
//! This crate defines the region-based IR sitting between the frontend
//! and any later processing:
//! - Types, SSA values, operations, blocks, regions, functions, module
//! - A cursor-based builder with an insertion-point protocol
//! - The AST-to-IR generation pass
//! - A structural verifier
//! - A deterministic textual printer
//!
//! Ownership is strictly tree-shaped: the module owns arenas for every
//! entity and children reference each other through lightweight ids.

pub mod builder;
pub mod ir;
pub mod irgen;
pub mod print;
pub mod registry;
pub mod verify;

pub use builder::{InsertPoint, InsertionGuard, IrBuilder};
pub use ir::{
    Attribute, Block, BlockId, FuncDecl, FuncId, Function, Module, OpId, OpKind, Operation,
    Region, RegionId, Type, Value, ValueDef,
};
pub use irgen::{generate, GenResult};
pub use print::print_module;
pub use registry::{registry, AttrKind, OpSpec, Registry};
pub use verify::verify;
