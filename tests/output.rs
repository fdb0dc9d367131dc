mod common;

use common::*;
use zen2feb::ast::*;
use zen2feb::feb::{self, Constant, Opcode};
use zen2feb::translate::{DiagnosticKind, EntityGenerator, Error, Settings};

#[test]
fn entity_written_under_qualified_name() {
    let mut harness = TestHarness::new();
    harness.define_field("count", true, Some(int(0)));
    harness.define_field("total", false, Some(int(1)));
    let scope = harness.function_scope(true, 0);
    harness.add_function("main", scope, &[], vec![]);

    let directory = scratch_directory("written");
    let (summary, diagnostics) = harness.generate(&directory);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(summary.error_count, 0);
    assert!(summary.suppressed.is_empty());

    let path = directory.join("demo").join("Main.feb");
    assert_eq!(summary.written, vec![path.clone()]);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], &[0xFE, 0xB7, 0x20, 0x00]);
    // Version 1.0, no stream flags
    assert_eq!(&bytes[4..8], &[0x00, 0x01, 0x00, 0x00]);
    assert_eq!(&bytes[8..10], &[0x00, 0x00]);

    let _ = std::fs::remove_dir_all(&directory);
}

#[test]
fn implicit_initializers() {
    let mut harness = TestHarness::new();
    harness.define_field("count", true, Some(int(0)));
    harness.define_field("total", false, Some(int(1)));

    let (entity, diagnostics) = harness.translate();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(entity.fields.len(), 2);
    assert_eq!(entity.functions.len(), 2);

    // super.<initialize>(), then `this.total = 1`
    let initializer = function_body(&entity, "<initialize>");
    let opcodes: Vec<Opcode> = initializer.instructions.iter().map(|insn| insn.opcode).collect();
    assert_eq!(
        opcodes,
        vec![
            Opcode::LoadA,
            Opcode::InvokeSpecial,
            Opcode::LoadA,
            Opcode::LoadCpr,
            Opcode::InvokeStatic,
            Opcode::StoreInstanceField,
            Opcode::Return,
        ]
    );
    assert_eq!(initializer.local_variable_count, 1);

    let static_initializer = function_body(&entity, "<staticInitializer>");
    assert_eq!(static_initializer.count(Opcode::StoreStaticField), 1);
    assert_eq!(static_initializer.count(Opcode::StoreInstanceField), 0);
    assert_eq!(static_initializer.local_variable_count, 0);
}

#[test]
fn no_static_initializer_without_static_fields() {
    let mut harness = TestHarness::new();
    harness.define_field("total", false, None);

    let (entity, _) = harness.translate();
    assert_eq!(entity.functions.len(), 1);
    assert!(utf8_index(&entity, "<staticInitializer>").is_none());
}

#[test]
fn output_suppressed_after_errors() {
    let mut harness = TestHarness::new();
    let scope = harness.function_scope(true, 0);
    harness.add_function(
        "broken",
        scope,
        &[],
        vec![Statement::Break(BreakStatement {
            label: None,
            span: at(3),
        })],
    );

    let directory = scratch_directory("suppressed");
    let (summary, diagnostics) = harness.generate(&directory);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::BreakOutsideLoop);
    assert_eq!(summary.error_count, 1);
    assert!(summary.written.is_empty());
    assert_eq!(summary.suppressed.len(), 1);
    assert_eq!(summary.suppressed[0].to_string(), "demo/Main");
    assert!(!directory.join("demo").join("Main.feb").exists());
}

#[test]
fn each_class_gets_its_own_pool() {
    let mut harness = TestHarness::new();
    harness.define_field("count", true, Some(int(0)));
    harness.add_class("Other", &[("limit", 5)]);

    let (entities, diagnostics) = harness.translate_all();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(entities.len(), 2);

    for (translated, name) in entities.iter().zip(["demo/Main", "demo/Other"]) {
        let entity = &translated.entity;
        assert_eq!(translated.name.to_string(), name);

        // Both pools start over: the entity's own name, then its class constant
        assert_eq!(entity.constants[0], Constant::Utf8(name.to_owned()));
        assert_eq!((entity.this_entity.0).0, 2);
        assert_eq!(class_index(entity, name), Some(2));
        assert!(utf8_index(entity, "zen/core/Integer").is_some());
    }

    let (main, other) = (&entities[0].entity, &entities[1].entity);
    assert!(utf8_index(main, "demo/Other").is_none());
    assert!(utf8_index(main, "limit").is_none());
    assert!(utf8_index(other, "demo/Main").is_none());
    assert!(utf8_index(other, "count").is_none());
}

#[test]
fn every_class_is_written() {
    let mut harness = TestHarness::new();
    harness.add_class("Other", &[("limit", 5)]);

    let directory = scratch_directory("two-classes");
    let (summary, diagnostics) = harness.generate(&directory);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(
        summary.written,
        vec![
            directory.join("demo").join("Main.feb"),
            directory.join("demo").join("Other.feb"),
        ]
    );
    for path in &summary.written {
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[0..4], &[0xFE, 0xB7, 0x20, 0x00]);
    }

    let _ = std::fs::remove_dir_all(&directory);
}

#[test]
fn generator_recovers_from_failed_class() {
    let mut harness = TestHarness::new();
    harness.add_class("Other", &[("limit", 5)]);

    // No local slot is left for the loop's iterator
    let scope = harness.function_scope(true, 256);
    harness.add_function(
        "crowded",
        scope,
        &[],
        vec![Statement::For(ForStatement {
            label: None,
            variable: ident("x"),
            iterable: Expression::List(vec![], at(2)),
            body: Block::new(vec![]),
        })],
    );

    init_logging();
    let mut generator = EntityGenerator::new(Settings::new(std::env::temp_dir()), &harness.symbols);
    match generator.translate_unit(&harness.class_unit("Main")).err() {
        Some(Error::EntityGen(feb::Error::LocalsOverflow(256))) => (),
        other => panic!("expected a locals overflow, got {:?}", other),
    }

    let entities = generator
        .translate_unit(&harness.class_unit("Other"))
        .unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].name.to_string(), "demo/Other");
    assert_eq!(entities[0].error_count, 0);
    assert_eq!(entities[0].entity.constants[0], Constant::Utf8("demo/Other".to_owned()));
}
