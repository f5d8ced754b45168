//! AST to IR generation pass
//!
//! Walks the frontend AST in declaration order and drives the builder to
//! populate a module. Name bindings are scoped per nesting level: a new
//! scope is pushed on entering a region body and popped on leaving it,
//! on every exit path.
//!
//! Failure policy is best-effort batch: an error aborts the current
//! function (which is detached from the module) but the remaining
//! top-level declarations still generate.

use crate::builder::IrBuilder;
use crate::ir::{Module, Type, Value};
use log::{debug, info};
use rexc_common::CompilerError;
use rexc_frontend::{
    Expression, ExpressionKind, FunctionDef, Item, ParamType, Program, Statement, StatementKind,
};
use std::collections::HashMap;

/// Outcome of a generation pass: the module plus the errors of any
/// functions that failed to generate
#[derive(Debug)]
pub struct GenResult {
    pub module: Module,
    pub errors: Vec<CompilerError>,
}

/// Generate IR for a whole program
pub fn generate(program: &Program) -> GenResult {
    let mut gen = IrGen::new();
    let mut errors = Vec::new();

    for item in &program.items {
        match item {
            Item::Extern(decl) => {
                let params = decl.params.iter().map(|&p| lower_type(p)).collect();
                gen.builder
                    .declare_function(&decl.name, params, decl.location.clone());
            }
            Item::Function(func) => {
                let attached = gen.builder.module().functions.len();
                if let Err(err) = gen.gen_function(func) {
                    debug!("generation of @{} failed: {}", func.name, err);
                    gen.detach_function(attached);
                    errors.push(err);
                }
            }
        }
    }

    let module = gen.builder.finish();
    info!(
        "generated {} functions, {} declarations, {} errors",
        module.functions.len(),
        module.declarations.len(),
        errors.len()
    );
    GenResult { module, errors }
}

fn lower_type(param: ParamType) -> Type {
    match param {
        ParamType::Int => Type::Int { width: 32 },
        ParamType::Index => Type::Index,
        ParamType::Str => Type::Str,
    }
}

struct IrGen {
    builder: IrBuilder,
    scopes: Vec<HashMap<String, Value>>,
}

impl IrGen {
    fn new() -> Self {
        Self {
            builder: IrBuilder::new(),
            scopes: Vec::new(),
        }
    }

    /// Drop a partially generated function from the module
    fn detach_function(&mut self, attached: usize) {
        self.builder.detach_functions_after(attached);
    }

    /// Run `f` with a fresh binding scope, popping it on every exit path
    fn in_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CompilerError>,
    ) -> Result<T, CompilerError> {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Run `f` with the cursor at the end of `block`, restoring the prior
    /// cursor on every exit path
    fn at_block_end<T>(
        &mut self,
        block: crate::ir::BlockId,
        f: impl FnOnce(&mut Self) -> Result<T, CompilerError>,
    ) -> Result<T, CompilerError> {
        let saved = self.builder.insertion_point();
        self.builder.set_insertion_point_to_end(block);
        let result = f(self);
        self.builder.restore_insertion_point(saved);
        result
    }

    fn bind(&mut self, name: &str, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn gen_function(&mut self, func: &FunctionDef) -> Result<(), CompilerError> {
        debug!("generating function @{}", func.name);
        let params: Vec<Type> = func.params.iter().map(|&(_, ty)| lower_type(ty)).collect();
        let id = self
            .builder
            .create_function(&func.name, params, func.location.clone());
        let entry = self.builder.entry_block(id)?;
        let args: Vec<Value> = self.builder.module().block(entry).args.to_vec();

        self.in_scope(|gen| {
            for ((name, _), value) in func.params.iter().zip(args) {
                gen.bind(name, value);
            }
            gen.at_block_end(entry, |gen| {
                for stmt in &func.body {
                    gen.gen_statement(stmt)?;
                }
                Ok(())
            })
        })
    }

    fn gen_statement(&mut self, stmt: &Statement) -> Result<(), CompilerError> {
        match &stmt.kind {
            StatementKind::Call { callee, args } => {
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.gen_expression(arg, None)?);
                }
                // Statement-position calls produce no results; whether the
                // callee exists is the verifier's concern.
                self.builder
                    .build_call(callee, arg_values, vec![], stmt.location.clone())?;
                Ok(())
            }

            StatementKind::Parallel { threads, body } => {
                let count = self.gen_expression(threads, Some(Type::Int { width: 32 }))?;
                let op = self.builder.build_spmd(count, stmt.location.clone())?;
                let region = self.builder.module().op(op).regions[0];
                let block = self
                    .builder
                    .module()
                    .region(region)
                    .entry_block()
                    .ok_or_else(|| CompilerError::InternalError {
                        message: "parallel op was created without a body block".to_string(),
                    })?;

                self.in_scope(|gen| {
                    gen.at_block_end(block, |gen| {
                        for stmt in body {
                            gen.gen_statement(stmt)?;
                        }
                        Ok(())
                    })
                })
            }

            StatementKind::For {
                var,
                lower,
                upper,
                step,
                body,
            } => {
                let lower = self.gen_expression(lower, Some(Type::Index))?;
                let upper = self.gen_expression(upper, Some(Type::Index))?;
                let step = self.gen_expression(step, Some(Type::Index))?;
                let op = self
                    .builder
                    .build_for(lower, upper, step, vec![], stmt.location.clone())?;
                let region = self.builder.module().op(op).regions[0];
                let block = self
                    .builder
                    .module()
                    .region(region)
                    .entry_block()
                    .ok_or_else(|| CompilerError::InternalError {
                        message: "loop op was created without a body block".to_string(),
                    })?;
                let induction = self.builder.module().block(block).args[0];

                self.in_scope(|gen| {
                    gen.bind(var, induction);
                    gen.at_block_end(block, |gen| {
                        for stmt in body {
                            gen.gen_statement(stmt)?;
                        }
                        Ok(())
                    })
                })
            }
        }
    }

    /// Materialize an expression as a value. Integer literals follow the
    /// expected type where one is given (index position vs. plain int).
    fn gen_expression(
        &mut self,
        expr: &Expression,
        expected: Option<Type>,
    ) -> Result<Value, CompilerError> {
        match &expr.kind {
            ExpressionKind::IntLiteral(value) => match expected {
                Some(Type::Index) => self
                    .builder
                    .build_index_constant(*value, expr.location.clone()),
                Some(Type::Int { width }) => {
                    self.builder
                        .build_int_constant(*value, width, expr.location.clone())
                }
                _ => self
                    .builder
                    .build_int_constant(*value, 32, expr.location.clone()),
            },
            ExpressionKind::StrLiteral(value) => {
                if matches!(expected, Some(ty) if ty.is_integer_like()) {
                    return Err(CompilerError::unsupported(
                        "string literal cannot be used where an integer is required".to_string(),
                        expr.location.clone(),
                    ));
                }
                self.builder.build_str_constant(value, expr.location.clone())
            }
            ExpressionKind::Identifier(name) => self.lookup(name).ok_or_else(|| {
                CompilerError::unbound(
                    format!("`{}` is not bound in this scope", name),
                    expr.location.clone(),
                )
            }),
        }
    }
}
