//! Structural IR verification
//!
//! A read-only traversal over a module confirming the invariants the
//! builder cannot see in isolation: region non-emptiness, terminator
//! position, operand dominance, call-target resolution, and attribute
//! well-formedness per operation kind. Verification never mutates the IR
//! and may run any number of times with the same verdict.

use crate::ir::{Attribute, BlockId, Module, OpKind, Operation, RegionId, Type};
use crate::registry::{registry, AttrKind, OpSpec};
use rexc_common::{CompilerError, SourceLocation};

/// Verify the structural invariants of a module
pub fn verify(module: &Module) -> Result<(), CompilerError> {
    let verifier = Verifier { module };
    for func in &module.functions {
        verifier.verify_region(func.body, &func.location)?;
    }
    Ok(())
}

struct Verifier<'m> {
    module: &'m Module,
}

impl Verifier<'_> {
    fn verify_region(
        &self,
        region: RegionId,
        owner_location: &SourceLocation,
    ) -> Result<(), CompilerError> {
        let region = self.module.region(region);
        if region.blocks.is_empty() {
            return Err(CompilerError::verification(
                "region has no blocks".to_string(),
                owner_location.clone(),
            ));
        }
        for &block in &region.blocks {
            self.verify_block(block)?;
        }
        Ok(())
    }

    fn verify_block(&self, block: BlockId) -> Result<(), CompilerError> {
        let block_data = self.module.block(block);
        for (pos, &op_id) in block_data.ops.iter().enumerate() {
            let op = self.module.op(op_id);
            let Some(spec) = registry().spec(op.kind) else {
                return Err(CompilerError::verification(
                    format!("operation kind {} is not registered", op.kind),
                    op.location.clone(),
                ));
            };

            if spec.is_terminator && pos + 1 != block_data.ops.len() {
                return Err(CompilerError::verification(
                    format!("terminator {} is not the last operation in its block", op.kind),
                    op.location.clone(),
                ));
            }

            for &operand in &op.operands {
                if !self.module.dominates(operand, block, pos) {
                    return Err(CompilerError::verification(
                        format!("operand {} of {} does not dominate its use", operand, op.kind),
                        op.location.clone(),
                    ));
                }
            }

            self.verify_attributes(op, spec)?;
            self.verify_kind(op)?;

            for &region in &op.regions {
                self.verify_region(region, &op.location)?;
            }
        }
        Ok(())
    }

    fn verify_attributes(&self, op: &Operation, spec: &OpSpec) -> Result<(), CompilerError> {
        for &(name, kind) in spec.required_attrs {
            let matches = match (op.attributes.get(name), kind) {
                (None, _) => false,
                (Some(Attribute::Int(_)), AttrKind::Int) => true,
                (Some(Attribute::Str(_)), AttrKind::Str) => true,
                (Some(_), AttrKind::Any) => true,
                (Some(_), _) => false,
            };
            if !matches {
                return Err(CompilerError::verification(
                    format!("{} requires a {:?} attribute `{}`", op.kind, kind, name),
                    op.location.clone(),
                ));
            }
        }
        Ok(())
    }

    fn verify_kind(&self, op: &Operation) -> Result<(), CompilerError> {
        match op.kind {
            OpKind::Constant => self.verify_constant(op),
            OpKind::Call => self.verify_call(op),
            OpKind::Spmd => self.verify_spmd(op),
            OpKind::For => self.verify_for(op),
        }
    }

    fn verify_constant(&self, op: &Operation) -> Result<(), CompilerError> {
        if !op.operands.is_empty() || op.results.len() != 1 {
            return Err(CompilerError::verification(
                format!(
                    "{} takes no operands and produces exactly one result",
                    op.kind
                ),
                op.location.clone(),
            ));
        }
        let result_type = self.module.value_type(op.results[0]);
        let compatible = match op.attributes.get("value") {
            Some(Attribute::Int(_)) => result_type.is_integer_like(),
            Some(Attribute::Str(_)) => result_type == Type::Str,
            None => false,
        };
        if !compatible {
            return Err(CompilerError::verification(
                format!(
                    "`value` attribute does not match result type {}",
                    result_type
                ),
                op.location.clone(),
            ));
        }
        Ok(())
    }

    fn verify_call(&self, op: &Operation) -> Result<(), CompilerError> {
        let Some(Attribute::Str(callee)) = op.attributes.get("callee") else {
            // Presence already checked against the registry spec.
            return Ok(());
        };

        let params: Vec<Type> = if let Some(func) = self.module.get_function(callee) {
            func.params.clone()
        } else if let Some(decl) = self.module.get_declaration(callee) {
            decl.params.clone()
        } else {
            return Err(CompilerError::verification(
                format!("call target `{}` is not declared in this module", callee),
                op.location.clone(),
            ));
        };

        if op.operands.len() != params.len() {
            return Err(CompilerError::verification(
                format!(
                    "call to `{}` passes {} arguments, expected {}",
                    callee,
                    op.operands.len(),
                    params.len()
                ),
                op.location.clone(),
            ));
        }
        for (index, (&operand, &expected)) in op.operands.iter().zip(&params).enumerate() {
            let actual = self.module.value_type(operand);
            if actual != expected {
                return Err(CompilerError::verification(
                    format!(
                        "argument {} of call to `{}` has type {}, expected {}",
                        index, callee, actual, expected
                    ),
                    op.location.clone(),
                ));
            }
        }
        if op.results.len() > 1 {
            return Err(CompilerError::verification(
                format!("{} produces at most one result", op.kind),
                op.location.clone(),
            ));
        }
        Ok(())
    }

    fn verify_spmd(&self, op: &Operation) -> Result<(), CompilerError> {
        if op.operands.len() != 1 || op.regions.len() != 1 || !op.results.is_empty() {
            return Err(CompilerError::verification(
                format!(
                    "{} takes one operand, owns one region and produces no results",
                    op.kind
                ),
                op.location.clone(),
            ));
        }
        let count_type = self.module.value_type(op.operands[0]);
        if !count_type.is_integer_like() {
            return Err(CompilerError::verification(
                format!("participant count has type {}, expected an integer", count_type),
                op.location.clone(),
            ));
        }
        Ok(())
    }

    fn verify_for(&self, op: &Operation) -> Result<(), CompilerError> {
        if op.operands.len() != 3 || op.regions.len() != 1 {
            return Err(CompilerError::verification(
                format!("{} takes bounds and step operands and owns one region", op.kind),
                op.location.clone(),
            ));
        }
        for (name, &operand) in ["lower bound", "upper bound", "step"]
            .iter()
            .zip(&op.operands)
        {
            let ty = self.module.value_type(operand);
            if ty != Type::Index {
                return Err(CompilerError::verification(
                    format!("loop {} has type {}, expected index", name, ty),
                    op.location.clone(),
                ));
            }
        }

        let Some(entry) = self.module.region(op.regions[0]).entry_block() else {
            // Region emptiness is reported by verify_region.
            return Ok(());
        };
        let args = &self.module.block(entry).args;
        if args.len() != 1 + op.results.len() {
            return Err(CompilerError::verification(
                format!(
                    "loop body takes {} arguments, expected induction variable \
                     plus {} loop-carried values",
                    args.len(),
                    op.results.len()
                ),
                op.location.clone(),
            ));
        }
        if self.module.value_type(args[0]) != Type::Index {
            return Err(CompilerError::verification(
                "induction variable must have type index".to_string(),
                op.location.clone(),
            ));
        }
        for (index, (&arg, &result)) in args[1..].iter().zip(&op.results).enumerate() {
            let arg_type = self.module.value_type(arg);
            let result_type = self.module.value_type(result);
            if arg_type != result_type {
                return Err(CompilerError::verification(
                    format!(
                        "loop-carried value {} has body type {} but result type {}",
                        index, arg_type, result_type
                    ),
                    op.location.clone(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IrBuilder;
    use rexc_common::SourceLocation;

    fn loc() -> SourceLocation {
        SourceLocation::unknown()
    }

    #[test]
    fn test_empty_module_verifies() {
        assert!(verify(&Module::new()).is_ok());
    }

    #[test]
    fn test_well_formed_function_verifies() {
        let mut builder = IrBuilder::new();
        builder.declare_function("printf", vec![Type::Str], loc());
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);
        let text = builder.build_str_constant("hi", loc()).unwrap();
        builder.build_call("printf", vec![text], vec![], loc()).unwrap();

        assert!(verify(&builder.finish()).is_ok());
    }

    #[test]
    fn test_unresolved_callee_reported_with_location() {
        let mut builder = IrBuilder::new();
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);
        let text = builder.build_str_constant("hi", loc()).unwrap();
        let call_location = SourceLocation::new("test.rex", 5, 3);
        builder
            .build_call("nowhere", vec![text], vec![], call_location.clone())
            .unwrap();

        let err = verify(&builder.finish()).unwrap_err();
        match err {
            CompilerError::VerificationError { location, message } => {
                assert_eq!(location, call_location);
                assert!(message.contains("nowhere"));
            }
            other => panic!("expected verification error, got {:?}", other),
        }
    }

    #[test]
    fn test_call_arity_mismatch() {
        let mut builder = IrBuilder::new();
        builder.declare_function("printf", vec![Type::Str], loc());
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);
        builder.build_call("printf", vec![], vec![], loc()).unwrap();

        let err = verify(&builder.finish()).unwrap_err();
        assert!(matches!(err, CompilerError::VerificationError { .. }));
    }

    #[test]
    fn test_call_argument_type_mismatch() {
        let mut builder = IrBuilder::new();
        builder.declare_function("printf", vec![Type::Str], loc());
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);
        let number = builder.build_int_constant(1, 32, loc()).unwrap();
        builder.build_call("printf", vec![number], vec![], loc()).unwrap();

        let err = verify(&builder.finish()).unwrap_err();
        assert!(matches!(err, CompilerError::VerificationError { .. }));
    }

    #[test]
    fn test_empty_spmd_region_rejected() {
        let mut builder = IrBuilder::new();
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);
        let threads = builder.build_int_constant(4, 32, loc()).unwrap();
        // Raw creation bypasses build_spmd, so the body block is missing.
        builder
            .create_operation(
                OpKind::Spmd,
                vec![threads],
                vec![],
                std::collections::BTreeMap::new(),
                loc(),
            )
            .unwrap();

        let err = verify(&builder.finish()).unwrap_err();
        match err {
            CompilerError::VerificationError { message, .. } => {
                assert!(message.contains("no blocks"));
            }
            other => panic!("expected verification error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_index_loop_bound_rejected() {
        let mut builder = IrBuilder::new();
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);
        let lb = builder.build_int_constant(0, 32, loc()).unwrap();
        let ub = builder.build_index_constant(10, loc()).unwrap();
        let step = builder.build_index_constant(1, loc()).unwrap();
        builder.build_for(lb, ub, step, vec![], loc()).unwrap();

        let err = verify(&builder.finish()).unwrap_err();
        assert!(matches!(err, CompilerError::VerificationError { .. }));
    }

    #[test]
    fn test_verifier_is_idempotent() {
        let mut builder = IrBuilder::new();
        let func = builder.create_function("foo", vec![], loc());
        let entry = builder.entry_block(func).unwrap();
        builder.set_insertion_point_to_end(entry);
        let text = builder.build_str_constant("hi", loc()).unwrap();
        builder.build_call("nowhere", vec![text], vec![], loc()).unwrap();
        let module = builder.finish();

        let first = verify(&module);
        let second = verify(&module);
        assert_eq!(first, second);
    }
}
