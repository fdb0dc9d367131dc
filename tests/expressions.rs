mod common;

use common::*;
use zen2feb::ast::*;
use zen2feb::feb::Opcode;
use zen2feb::symbols::{Storage, Symbol, VariableSymbol};
use zen2feb::translate::DiagnosticKind;

fn opcodes(body: &DecodedBody) -> Vec<Opcode> {
    body.instructions.iter().map(|insn| insn.opcode).collect()
}

#[test]
fn compound_assignment_to_instance_field() {
    let mut harness = TestHarness::new();
    harness.define_field("count", false, None);
    let scope = harness.function_scope(false, 1);

    // count += 1
    harness.add_function(
        "increment",
        scope,
        &[],
        vec![Statement::Expression(Expression::Assignment(Box::new(
            AssignmentExpression {
                target: var("count"),
                operator: Some(BinaryOperator::Add),
                value: int(1),
            },
        )))],
    );

    let (entity, diagnostics) = harness.translate();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let body = function_body(&entity, "increment");
    assert_eq!(
        opcodes(&body),
        vec![
            Opcode::LoadA,
            Opcode::Duplicate,
            Opcode::LoadInstanceField,
            Opcode::LoadCpr,
            Opcode::InvokeStatic,
            Opcode::LoadCpr,
            Opcode::InvokeStatic,
            Opcode::DuplicateX1,
            Opcode::StoreInstanceField,
            Opcode::Pop,
            Opcode::PushNull,
            Opcode::ReturnA,
        ]
    );
    assert_eq!(body.max_stack_size, 4);
    assert_eq!(body.invocations_of(&function_indices(&entity, "evaluate")), 1);
    assert_eq!(body.invocations_of(&function_indices(&entity, "newInstance")), 1);
    assert!(utf8_index(&entity, "+").is_some());
}

#[test]
fn short_circuit_and() {
    let mut harness = TestHarness::new();
    let scope = harness.function_scope(true, 2);
    harness.define_local(scope, "a", 0);
    harness.define_local(scope, "b", 1);

    // return a && b
    harness.add_function(
        "both",
        scope,
        &["a", "b"],
        vec![Statement::Return(ReturnStatement {
            value: Some(Expression::Logical(Box::new(LogicalExpression {
                operator: LogicalOperator::And,
                left: var("a"),
                right: var("b"),
            }))),
            span: at(1),
        })],
    );

    let (entity, _) = harness.translate();
    let body = function_body(&entity, "both");
    assert_eq!(
        opcodes(&body),
        vec![
            Opcode::LoadA,
            Opcode::Duplicate,
            Opcode::InvokeStatic,
            Opcode::JumpEq0I,
            Opcode::Pop,
            Opcode::LoadA,
            Opcode::ReturnA,
        ]
    );
    let short_circuit = body.with_opcode(Opcode::JumpEq0I)[0];
    let return_insn = body.with_opcode(Opcode::ReturnA)[0];
    assert_eq!(
        short_circuit.jump_target().unwrap() as usize,
        return_insn.offset
    );
}

#[test]
fn dynamic_calls_and_literals() {
    let mut harness = TestHarness::new();
    let scope = harness.function_scope(true, 1);
    harness.define_local(scope, "object", 0);

    // object.update([1, "two"], true)
    let list = Expression::List(
        vec![
            int(1),
            Expression::Literal(Literal::String(String::from("two")), at(1)),
        ],
        at(1),
    );
    let boolean = Expression::Literal(Literal::Boolean(true), at(1));
    harness.add_function(
        "poke",
        scope,
        &["object"],
        vec![Statement::Expression(Expression::call(
            Expression::member(var("object"), ident("update")),
            vec![list, boolean],
        ))],
    );

    let (entity, diagnostics) = harness.translate();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let body = function_body(&entity, "poke");
    assert_eq!(body.count(Opcode::InvokeDynamic), 1);
    assert_eq!(body.count(Opcode::New), 1);
    assert_eq!(body.invocations_of(&function_indices(&entity, "add")), 2);
    assert_eq!(body.count(Opcode::LoadStaticField), 1);
    assert!(class_index(&entity, "zen/core/List").is_some());
    assert!(utf8_index(&entity, "TRUE").is_some());
    assert_eq!(function_indices(&entity, "update").len(), 1);
}

#[test]
fn invalid_references_are_reported() {
    let mut harness = TestHarness::new();
    harness.define_field("total", false, None);
    harness.define_static_function("helper", 0);
    let scope = harness.function_scope(true, 1);
    harness.symbols.define(
        scope,
        "limit",
        Symbol::Constant(VariableSymbol {
            storage: Storage::Local(0),
        }),
    );

    harness.add_function(
        "broken",
        scope,
        &["limit"],
        vec![
            // limit = 1
            Statement::Expression(Expression::assign(var("limit"), int(1))),
            // total
            Statement::Expression(var("total")),
            // helper(1)
            call("helper", vec![int(1)]),
            // missing
            Statement::Expression(var("missing")),
            // 1 = 2
            Statement::Expression(Expression::assign(int(1), int(2))),
        ],
    );

    let (entity, diagnostics) = harness.translate();
    let kinds: Vec<DiagnosticKind> = diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::AssignmentToConstant,
            DiagnosticKind::InstanceReferenceFromStatic,
            DiagnosticKind::NoMatchingOverload,
            DiagnosticKind::UnresolvedSymbol,
            DiagnosticKind::InvalidAssignmentTarget,
        ]
    );

    // Translation carries on with placeholders, keeping the stack balanced
    let body = function_body(&entity, "broken");
    assert_eq!(body.count(Opcode::Pop), 5);
    assert_eq!(body.count(Opcode::StoreA), 0);
    assert!(body.max_stack_size <= 2);
}
