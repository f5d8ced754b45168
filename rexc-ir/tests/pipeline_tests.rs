//! End-to-end tests for the parse -> generate -> verify -> print pipeline

use pretty_assertions::assert_eq;
use rexc_common::{CompilerError, SourceLocation};
use rexc_frontend::parse_source;
use rexc_ir::{generate, print_module, verify, IrBuilder, Type};

const NESTED_SOURCE: &str = r#"extern fn printf(str);

fn foo() {
    parallel 6 {
        for i in 0 .. 10 step 1 {
            printf("This is a test.\n");
        }
    }
}
"#;

#[test]
fn test_nested_program_generates_verifies_and_prints() {
    let program = parse_source(NESTED_SOURCE, "test.rex").expect("parse");
    let result = generate(&program);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    verify(&result.module).expect("module verifies");

    let expected = concat!(
        "module {\n",
        "  extern @printf(str)\n",
        "  func @foo() {\n",
        "    %0 = rex.constant {value = 6} : i32\n",
        "    rex.spmd(%0) {\n",
        "      %1 = rex.constant {value = 0} : index\n",
        "      %2 = rex.constant {value = 10} : index\n",
        "      %3 = rex.constant {value = 1} : index\n",
        "      rex.for(%1, %2, %3) {\n",
        "      ^bb0(%4: index):\n",
        "        %5 = rex.constant {value = \"This is a test.\\n\"} : str\n",
        "        rex.call(%5) {callee = \"printf\"}\n",
        "      }\n",
        "    }\n",
        "  }\n",
        "}\n",
    );
    assert_eq!(print_module(&result.module), expected);
}

#[test]
fn test_printing_twice_is_byte_identical() {
    let program = parse_source(NESTED_SOURCE, "test.rex").expect("parse");
    let result = generate(&program);
    assert_eq!(print_module(&result.module), print_module(&result.module));
}

#[test]
fn test_verifying_twice_gives_same_answer() {
    let program = parse_source(NESTED_SOURCE, "test.rex").expect("parse");
    let result = generate(&program);
    assert!(verify(&result.module).is_ok());
    assert!(verify(&result.module).is_ok());
}

#[test]
fn test_call_to_undeclared_callee_fails_verification() {
    let source = r#"fn foo() {
    missing_fn("x");
}
"#;
    let program = parse_source(source, "test.rex").expect("parse");
    let result = generate(&program);
    // Generation does not resolve callees; the verifier does.
    assert!(result.errors.is_empty(), "{:?}", result.errors);

    let err = verify(&result.module).expect_err("undeclared callee");
    assert!(matches!(err, CompilerError::VerificationError { .. }));
    assert!(err.to_string().contains("missing_fn"), "{}", err);
    let location = err.location().expect("error carries a location");
    assert_eq!(location.filename, "test.rex");
    assert_eq!(location.line, 2);
}

#[test]
fn test_value_from_sibling_region_is_rejected() {
    let mut builder = IrBuilder::new();
    let func = builder.create_function("foo", vec![], SourceLocation::unknown());
    let entry = builder.entry_block(func).unwrap();
    builder.set_insertion_point_to_end(entry);

    let threads = builder
        .build_int_constant(2, 32, SourceLocation::unknown())
        .unwrap();

    let first = builder.build_spmd(threads, SourceLocation::unknown()).unwrap();
    let first_region = builder.module().op(first).regions[0];
    let first_block = builder
        .module()
        .region(first_region)
        .entry_block()
        .unwrap();
    let inner = {
        let mut guard = builder.insertion_guard();
        guard.set_insertion_point_to_end(first_block);
        guard
            .build_index_constant(7, SourceLocation::unknown())
            .unwrap()
    };

    let second = builder.build_spmd(threads, SourceLocation::unknown()).unwrap();
    let second_region = builder.module().op(second).regions[0];
    let second_block = builder
        .module()
        .region(second_region)
        .entry_block()
        .unwrap();
    builder.set_insertion_point_to_end(second_block);

    // A value defined inside the first region is invisible to the second.
    let err = builder
        .build_call("f", vec![inner], vec![], SourceLocation::unknown())
        .expect_err("sibling region value");
    assert!(matches!(err, CompilerError::DominanceViolation { .. }));

    // The failed insertion left the target block untouched.
    assert!(builder.module().block(second_block).ops.is_empty());
}

#[test]
fn test_failed_function_is_excluded_but_module_still_verifies() {
    let source = r#"extern fn printf(str);

fn bad() {
    printf(missing);
}

fn good() {
    printf("ok\n");
}
"#;
    let program = parse_source(source, "test.rex").expect("parse");
    let result = generate(&program);
    assert_eq!(result.errors.len(), 1);
    assert!(result.module.get_function("bad").is_none());
    assert!(result.module.get_function("good").is_some());
    verify(&result.module).expect("surviving functions verify");
}

#[test]
fn test_function_parameters_print_in_signature() {
    let mut builder = IrBuilder::new();
    builder.create_function(
        "bar",
        vec![Type::Int { width: 32 }, Type::Str],
        SourceLocation::unknown(),
    );
    let printed = print_module(&builder.finish());
    assert!(printed.contains("func @bar(%0: i32, %1: str) {"), "{}", printed);
}
