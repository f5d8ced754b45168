//! Textual IR printing
//!
//! Renders a module in a stable, diff-friendly form: value names are
//! assigned sequentially per function in traversal order, attribute maps
//! iterate in key order, and nothing host-dependent (addresses, hash
//! order) leaks into the output. Printing the same module twice yields
//! byte-identical text; this is the golden-output format for tests.

use crate::ir::{Attribute, BlockId, Function, Module, OpId, RegionId, Value};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;

/// Render a module to its canonical textual form
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    out.push_str("module {\n");
    for decl in &module.declarations {
        let params: Vec<String> = decl.params.iter().map(|t| t.to_string()).collect();
        let _ = writeln!(out, "  extern @{}({})", decl.name, params.join(", "));
    }
    for func in &module.functions {
        let mut printer = Printer {
            module,
            names: HashMap::new(),
            next_name: 0,
        };
        printer.print_function(&mut out, func);
    }
    out.push_str("}\n");
    out
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", print_module(self))
    }
}

struct Printer<'m> {
    module: &'m Module,
    /// Per-function value numbering, assigned in print order
    names: HashMap<Value, u32>,
    next_name: u32,
}

impl Printer<'_> {
    fn name(&mut self, value: Value) -> String {
        let next = self.next_name;
        let id = *self.names.entry(value).or_insert(next);
        if id == next {
            self.next_name += 1;
        }
        format!("%{}", id)
    }

    fn print_function(&mut self, out: &mut String, func: &Function) {
        let body = self.module.region(func.body);
        let entry = body.entry_block();

        let mut sig = String::new();
        if let Some(entry) = entry {
            let args = self.module.block(entry).args.clone();
            let parts: Vec<String> = args
                .iter()
                .map(|&arg| {
                    let name = self.name(arg);
                    format!("{}: {}", name, self.module.value_type(arg))
                })
                .collect();
            sig = parts.join(", ");
        }
        let _ = writeln!(out, "  func @{}({}) {{", func.name, sig);

        let blocks = body.blocks.clone();
        for (index, &block) in blocks.iter().enumerate() {
            // Entry block arguments already appear in the signature.
            if index > 0 {
                self.print_block_header(out, block, index, 2);
            }
            self.print_block_ops(out, block, 4);
        }
        out.push_str("  }\n");
    }

    fn print_block_header(
        &mut self,
        out: &mut String,
        block: BlockId,
        index: usize,
        indent: usize,
    ) {
        let pad = " ".repeat(indent);
        let args = self.module.block(block).args.clone();
        if args.is_empty() {
            let _ = writeln!(out, "{}^bb{}:", pad, index);
        } else {
            let parts: Vec<String> = args
                .iter()
                .map(|&arg| {
                    let name = self.name(arg);
                    format!("{}: {}", name, self.module.value_type(arg))
                })
                .collect();
            let _ = writeln!(out, "{}^bb{}({}):", pad, index, parts.join(", "));
        }
    }

    fn print_block_ops(&mut self, out: &mut String, block: BlockId, indent: usize) {
        let ops = self.module.block(block).ops.clone();
        for op in ops {
            self.print_op(out, op, indent);
        }
    }

    fn print_op(&mut self, out: &mut String, op_id: OpId, indent: usize) {
        let pad = " ".repeat(indent);
        let op = self.module.op(op_id);
        let results = op.results.clone();
        let operands = op.operands.clone();
        let regions = op.regions.clone();

        let mut line = String::new();
        if !results.is_empty() {
            let parts: Vec<String> = results.iter().map(|&r| self.name(r)).collect();
            let _ = write!(line, "{} = ", parts.join(", "));
        }
        let _ = write!(line, "{}", op.kind);
        if !operands.is_empty() {
            let parts: Vec<String> = operands.iter().map(|&o| self.name(o)).collect();
            let _ = write!(line, "({})", parts.join(", "));
        }
        if !op.attributes.is_empty() {
            let parts: Vec<String> = op
                .attributes
                .iter()
                .map(|(name, attr)| format!("{} = {}", name, format_attribute(attr)))
                .collect();
            let _ = write!(line, " {{{}}}", parts.join(", "));
        }
        if !results.is_empty() {
            let parts: Vec<String> = results
                .iter()
                .map(|&r| self.module.value_type(r).to_string())
                .collect();
            let _ = write!(line, " : {}", parts.join(", "));
        }

        if regions.is_empty() {
            let _ = writeln!(out, "{}{}", pad, line);
            return;
        }

        let _ = writeln!(out, "{}{} {{", pad, line);
        for &region in &regions {
            self.print_region(out, region, indent);
        }
        let _ = writeln!(out, "{}}}", pad);
    }

    fn print_region(&mut self, out: &mut String, region: RegionId, indent: usize) {
        let blocks = self.module.region(region).blocks.clone();
        let single_plain = blocks.len() == 1
            && self
                .module
                .block(blocks[0])
                .args
                .is_empty();
        for (index, &block) in blocks.iter().enumerate() {
            if !single_plain {
                self.print_block_header(out, block, index, indent);
            }
            self.print_block_ops(out, block, indent + 2);
        }
    }
}

fn format_attribute(attr: &Attribute) -> String {
    match attr {
        Attribute::Int(value) => value.to_string(),
        Attribute::Str(value) => format!("\"{}\"", escape(value)),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IrBuilder;
    use crate::ir::Type;
    use pretty_assertions::assert_eq;
    use rexc_common::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation::unknown()
    }

    #[test]
    fn test_print_empty_module() {
        assert_eq!(print_module(&Module::new()), "module {\n}\n");
    }

    #[test]
    fn test_print_declaration_and_signature() {
        let mut builder = IrBuilder::new();
        builder.declare_function("printf", vec![Type::Str], loc());
        builder.create_function("bar", vec![Type::Int { width: 32 }, Type::Str], loc());

        let expected = concat!(
            "module {\n",
            "  extern @printf(str)\n",
            "  func @bar(%0: i32, %1: str) {\n",
            "  }\n",
            "}\n",
        );
        assert_eq!(print_module(&builder.finish()), expected);
    }

    #[test]
    fn test_print_nested_regions() {
        let mut builder = IrBuilder::new();
        builder.declare_function("printf", vec![Type::Str], loc());
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);

        let threads = builder.build_int_constant(6, 32, loc()).unwrap();
        let spmd = builder.build_spmd(threads, loc()).unwrap();
        let region = builder.module().op(spmd).regions[0];
        let body = builder.module().region(region).entry_block().unwrap();
        {
            let mut guard = builder.insertion_guard();
            guard.set_insertion_point_to_end(body);
            let text = guard.build_str_constant("hi\n", loc()).unwrap();
            guard.build_call("printf", vec![text], vec![], loc()).unwrap();
        }

        let expected = concat!(
            "module {\n",
            "  extern @printf(str)\n",
            "  func @foo() {\n",
            "    %0 = rex.constant {value = 6} : i32\n",
            "    rex.spmd(%0) {\n",
            "      %1 = rex.constant {value = \"hi\\n\"} : str\n",
            "      rex.call(%1) {callee = \"printf\"}\n",
            "    }\n",
            "  }\n",
            "}\n",
        );
        assert_eq!(print_module(&builder.finish()), expected);
    }

    #[test]
    fn test_print_for_shows_induction_argument() {
        let mut builder = IrBuilder::new();
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);

        let lb = builder.build_index_constant(0, loc()).unwrap();
        let ub = builder.build_index_constant(10, loc()).unwrap();
        let step = builder.build_index_constant(1, loc()).unwrap();
        builder.build_for(lb, ub, step, vec![], loc()).unwrap();

        let expected = concat!(
            "module {\n",
            "  func @foo() {\n",
            "    %0 = rex.constant {value = 0} : index\n",
            "    %1 = rex.constant {value = 10} : index\n",
            "    %2 = rex.constant {value = 1} : index\n",
            "    rex.for(%0, %1, %2) {\n",
            "    ^bb0(%3: index):\n",
            "    }\n",
            "  }\n",
            "}\n",
        );
        let printed = print_module(&builder.finish());
        assert_eq!(printed, expected);
    }

    #[test]
    fn test_printing_is_deterministic() {
        let mut builder = IrBuilder::new();
        builder.declare_function("printf", vec![Type::Str], loc());
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);
        let text = builder.build_str_constant("x", loc()).unwrap();
        builder.build_call("printf", vec![text], vec![], loc()).unwrap();
        let module = builder.finish();

        assert_eq!(print_module(&module), print_module(&module));
    }
}
