//! Abstract Syntax Tree definitions for REX
//!
//! This module defines the AST nodes produced by the parser and consumed
//! by the IR generation pass, plus the indented textual dump used by the
//! `dump-ast` driver action.

use rexc_common::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write;

/// Parameter types expressible in REX signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    Int,
    Index,
    Str,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Int => write!(f, "int"),
            ParamType::Index => write!(f, "index"),
            ParamType::Str => write!(f, "str"),
        }
    }
}

/// A complete REX source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub items: Vec<Item>,
}

impl Program {
    /// Render this program as an indented tree; see [`dump`]
    pub fn dump(&self) -> String {
        dump(self)
    }
}

/// Top-level item: an external declaration or a function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Extern(ExternDecl),
    Function(FunctionDef),
}

/// External function declaration: `extern fn printf(str);`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternDecl {
    pub name: String,
    pub params: Vec<ParamType>,
    pub location: SourceLocation,
}

/// Function definition with a statement body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<(String, ParamType)>,
    pub body: Vec<Statement>,
    pub location: SourceLocation,
}

/// A statement with its source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// Function call statement: `printf("...");`
    Call {
        callee: String,
        args: Vec<Expression>,
    },

    /// SPMD block: `parallel <threads> { ... }`
    Parallel {
        threads: Expression,
        body: Vec<Statement>,
    },

    /// Counted loop: `for i in <lower> .. <upper> step <step> { ... }`
    For {
        var: String,
        lower: Expression,
        upper: Expression,
        step: Expression,
        body: Vec<Statement>,
    },
}

/// An expression with its source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpressionKind {
    IntLiteral(i64),
    StrLiteral(String),
    Identifier(String),
}

/// Render a program as an indented tree, one node per line.
///
/// The format is stable and diff-friendly; it is the golden-output
/// format for `dump-ast`.
pub fn dump(program: &Program) -> String {
    let mut out = String::new();
    out.push_str("Program:\n");
    for item in &program.items {
        match item {
            Item::Extern(decl) => {
                let params: Vec<String> = decl.params.iter().map(|p| p.to_string()).collect();
                let _ = writeln!(out, "  Extern {}({})", decl.name, params.join(", "));
            }
            Item::Function(func) => {
                let params: Vec<String> = func
                    .params
                    .iter()
                    .map(|(name, ty)| format!("{}: {}", name, ty))
                    .collect();
                let _ = writeln!(out, "  Function {}({})", func.name, params.join(", "));
                for stmt in &func.body {
                    dump_statement(&mut out, stmt, 2);
                }
            }
        }
    }
    out
}

fn dump_statement(out: &mut String, stmt: &Statement, depth: usize) {
    let pad = "  ".repeat(depth);
    match &stmt.kind {
        StatementKind::Call { callee, args } => {
            let _ = writeln!(out, "{}Call {}:", pad, callee);
            for arg in args {
                dump_expression(out, arg, depth + 1);
            }
        }
        StatementKind::Parallel { threads, body } => {
            let _ = writeln!(out, "{}Parallel:", pad);
            dump_expression(out, threads, depth + 1);
            for stmt in body {
                dump_statement(out, stmt, depth + 1);
            }
        }
        StatementKind::For {
            var,
            lower,
            upper,
            step,
            body,
        } => {
            let _ = writeln!(out, "{}For {}:", pad, var);
            dump_expression(out, lower, depth + 1);
            dump_expression(out, upper, depth + 1);
            dump_expression(out, step, depth + 1);
            for stmt in body {
                dump_statement(out, stmt, depth + 1);
            }
        }
    }
}

fn dump_expression(out: &mut String, expr: &Expression, depth: usize) {
    let pad = "  ".repeat(depth);
    match &expr.kind {
        ExpressionKind::IntLiteral(value) => {
            let _ = writeln!(out, "{}Int {}", pad, value);
        }
        ExpressionKind::StrLiteral(value) => {
            let _ = writeln!(out, "{}Str {:?}", pad, value);
        }
        ExpressionKind::Identifier(name) => {
            let _ = writeln!(out, "{}Ident {}", pad, name);
        }
    }
}
