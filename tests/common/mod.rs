//! Builds resolved units by hand and decodes the entities generated for them

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use zen2feb::ast::*;
use zen2feb::feb::*;
use zen2feb::symbols::*;
use zen2feb::translate::*;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn at(line: u32) -> Span {
    Span::new(line, 1)
}

pub fn ident(text: &str) -> Identifier {
    Identifier::new(text, at(1))
}

pub fn var(text: &str) -> Expression {
    Expression::identifier(text, at(1))
}

pub fn call(name: &str, arguments: Vec<Expression>) -> Statement {
    Statement::Expression(Expression::call(var(name), arguments))
}

pub fn int(value: i32) -> Expression {
    Expression::Literal(Literal::Integer(value), at(1))
}

/// Class `demo/Main` under construction, along with its scopes
///
/// Other classes of the same unit can be added with [`TestHarness::add_class`].
pub struct TestHarness {
    pub symbols: SymbolTable,
    pub unit_scope: ScopeId,
    pub class_scope: ScopeId,
    pub class_name: BinaryName,
    members: Vec<Member>,
    other_classes: Vec<ClassDeclaration>,
}

impl TestHarness {
    pub fn new() -> TestHarness {
        let mut symbols = SymbolTable::new();
        let unit_scope = symbols.add_scope(ScopeKind::Unit, None);
        let class_name = BinaryName::qualify(vec!["demo"], "Main").unwrap();
        let class_scope = symbols.add_scope(
            ScopeKind::Class {
                qualified_name: class_name.clone(),
            },
            Some(unit_scope),
        );
        symbols.define(
            unit_scope,
            "Main",
            Symbol::Class(ClassSymbol {
                qualified_name: class_name.clone(),
            }),
        );

        TestHarness {
            symbols,
            unit_scope,
            class_scope,
            class_name,
            members: vec![],
            other_classes: vec![],
        }
    }

    /// Make another class `demo/<name>` visible to the unit
    pub fn define_class(&mut self, name: &str) -> BinaryName {
        let qualified_name = BinaryName::qualify(vec!["demo"], name).unwrap();
        self.symbols.define(
            self.unit_scope,
            name,
            Symbol::Class(ClassSymbol {
                qualified_name: qualified_name.clone(),
            }),
        );
        qualified_name
    }

    /// Static function of the class which tests call but never declare
    pub fn define_static_function(&mut self, name: &str, arity: usize) {
        self.symbols.define(
            self.class_scope,
            name,
            Symbol::Function(FunctionSymbol {
                class: self.class_name.clone(),
                is_static: true,
                parameter_counts: vec![arity],
            }),
        );
    }

    /// Add a class `demo/<name>` after `demo/Main`, with static fields set to integers
    pub fn add_class(&mut self, name: &str, static_fields: &[(&str, i32)]) -> BinaryName {
        let qualified_name = self.define_class(name);
        let scope = self.symbols.add_scope(
            ScopeKind::Class {
                qualified_name: qualified_name.clone(),
            },
            Some(self.unit_scope),
        );

        let mut members = vec![];
        for (field, value) in static_fields {
            self.symbols
                .define(scope, *field, Symbol::field(qualified_name.clone(), true));
            members.push(Member::Field(FieldDeclaration {
                modifiers: Modifiers::PUBLIC | Modifiers::STATIC,
                constant: false,
                declarators: vec![VariableDeclarator {
                    name: ident(field),
                    initializer: Some(int(*value)),
                }],
            }));
        }
        self.other_classes.push(ClassDeclaration {
            name: ident(name),
            modifiers: Modifiers::PUBLIC,
            superclasses: vec![],
            members,
            scope,
        });
        qualified_name
    }

    pub fn define_field(&mut self, name: &str, is_static: bool, initializer: Option<Expression>) {
        self.symbols.define(
            self.class_scope,
            name,
            Symbol::field(self.class_name.clone(), is_static),
        );
        let modifiers = if is_static {
            Modifiers::PUBLIC | Modifiers::STATIC
        } else {
            Modifiers::PUBLIC
        };
        self.members.push(Member::Field(FieldDeclaration {
            modifiers,
            constant: false,
            declarators: vec![VariableDeclarator {
                name: ident(name),
                initializer,
            }],
        }));
    }

    pub fn function_scope(&mut self, is_static: bool, local_variable_count: u16) -> ScopeId {
        self.symbols.add_scope(
            ScopeKind::Function {
                is_static,
                local_variable_count,
            },
            Some(self.class_scope),
        )
    }

    pub fn local_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.symbols.add_scope(ScopeKind::Local, Some(parent))
    }

    pub fn define_local(&mut self, scope: ScopeId, name: &str, slot: u16) {
        self.symbols.define(scope, name, Symbol::local(slot));
    }

    /// Declare a function of the class with a body
    pub fn add_function(
        &mut self,
        name: &str,
        scope: ScopeId,
        parameters: &[&str],
        body: Vec<Statement>,
    ) {
        let is_static = matches!(
            self.symbols.kind(scope),
            ScopeKind::Function {
                is_static: true,
                ..
            }
        );
        self.symbols.define(
            self.class_scope,
            name,
            Symbol::Function(FunctionSymbol {
                class: self.class_name.clone(),
                is_static,
                parameter_counts: vec![parameters.len()],
            }),
        );
        let mut modifiers = Modifiers::PUBLIC;
        if is_static {
            modifiers |= Modifiers::STATIC;
        }
        self.members.push(Member::Function(FunctionDeclaration {
            name: ident(name),
            kind: FunctionKind::Function,
            modifiers,
            parameters: parameters.iter().map(|parameter| ident(parameter)).collect(),
            body: Some(Block::new(body)),
            scope,
        }));
    }

    /// Unit holding `demo/Main` followed by every added class
    pub fn unit(&self) -> CompilationUnit {
        let mut classes = vec![ClassDeclaration {
            name: ident("Main"),
            modifiers: Modifiers::PUBLIC,
            superclasses: vec![],
            members: self.members.clone(),
            scope: self.class_scope,
        }];
        classes.extend(self.other_classes.iter().cloned());
        CompilationUnit {
            classes,
            scope: self.unit_scope,
        }
    }

    /// Unit holding only the class called `name`
    pub fn class_unit(&self, name: &str) -> CompilationUnit {
        let mut unit = self.unit();
        unit.classes.retain(|class| class.name.as_str() == name);
        assert_eq!(unit.classes.len(), 1, "no class called '{}'", name);
        unit
    }

    /// Translate every class without writing anything
    pub fn translate_all(&self) -> (Vec<TranslatedEntity>, Vec<Diagnostic>) {
        init_logging();
        let settings = Settings::new(std::env::temp_dir());
        let mut generator = EntityGenerator::new(settings, &self.symbols);
        let entities = generator.translate_unit(&self.unit()).unwrap();
        let diagnostics = generator.diagnostics().iter().cloned().collect();
        (entities, diagnostics)
    }

    /// Translate the unit without writing anything, keeping only `demo/Main`
    pub fn translate(&self) -> (EntityFile, Vec<Diagnostic>) {
        let (mut entities, diagnostics) = self.translate_all();
        (entities.remove(0).entity, diagnostics)
    }

    /// Translate and write the class under `directory`
    pub fn generate(&self, directory: &Path) -> (GenerationSummary, Vec<Diagnostic>) {
        init_logging();
        let settings = Settings::new(directory);
        let mut generator = EntityGenerator::new(settings, &self.symbols);
        let summary = generator.generate(&self.unit()).unwrap();
        let diagnostics = generator.diagnostics().iter().cloned().collect();
        (summary, diagnostics)
    }
}

/// Fresh directory for output files
pub fn scratch_directory(test_name: &str) -> PathBuf {
    let directory = std::env::temp_dir().join(format!(
        "zen2feb-{}-{}",
        test_name,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&directory);
    directory
}

/// Index of a UTF-8 constant
pub fn utf8_index(entity: &EntityFile, text: &str) -> Option<u16> {
    entity
        .constants
        .iter()
        .position(|constant| *constant == Constant::Utf8(text.to_owned()))
        .map(|position| position as u16 + 1)
}

/// Index of the class constant naming `name`
pub fn class_index(entity: &EntityFile, name: &str) -> Option<u16> {
    let utf8 = utf8_index(entity, name)?;
    entity
        .constants
        .iter()
        .position(|constant| match constant {
            Constant::Class(class_name) => (class_name.0).0 == utf8,
            _ => false,
        })
        .map(|position| position as u16 + 1)
}

/// Indices of every function constant called `name`
pub fn function_indices(entity: &EntityFile, name: &str) -> Vec<u16> {
    let utf8 = match utf8_index(entity, name) {
        Some(utf8) => utf8,
        None => return vec![],
    };
    entity
        .constants
        .iter()
        .enumerate()
        .filter_map(|(position, constant)| match constant {
            Constant::Function { name, .. } if (name.0).0 == utf8 => Some(position as u16 + 1),
            _ => None,
        })
        .collect()
}

/// Instruction attribute of a function, decoded
#[derive(Debug)]
pub struct DecodedBody {
    pub max_stack_size: u16,
    pub local_variable_count: u16,
    pub code_length: usize,
    pub instructions: Vec<Instruction>,

    /// `[start, stop, handler, class]`
    pub exception_table: Vec<[u16; 4]>,
}

impl DecodedBody {
    pub fn count(&self, opcode: Opcode) -> usize {
        self.instructions
            .iter()
            .filter(|insn| insn.opcode == opcode)
            .count()
    }

    pub fn with_opcode(&self, opcode: Opcode) -> Vec<&Instruction> {
        self.instructions
            .iter()
            .filter(|insn| insn.opcode == opcode)
            .collect()
    }

    /// Number of invocations of any of the given function constants
    pub fn invocations_of(&self, functions: &[u16]) -> usize {
        self.instructions
            .iter()
            .filter(|insn| insn.opcode.is_invoke() && functions.contains(&insn.operands[0]))
            .count()
    }

    pub fn instruction_at(&self, offset: usize) -> Option<&Instruction> {
        self.instructions.iter().find(|insn| insn.offset == offset)
    }

    /// Every jump lands on an instruction boundary (or the very end)
    pub fn assert_jumps_closed(&self) {
        for insn in &self.instructions {
            if let Some(target) = insn.jump_target() {
                let target = target as usize;
                assert!(
                    target == self.code_length || self.instruction_at(target).is_some(),
                    "{} jumps into the middle of an instruction",
                    insn
                );
            }
        }
    }

    /// Every handler site covers a non-empty range and points at an instruction
    pub fn assert_sites_well_formed(&self) {
        for [start, stop, handler, _] in &self.exception_table {
            assert!(start < stop, "empty range [{}, {})", start, stop);
            assert!(*stop as usize <= self.code_length);
            assert!(self.instruction_at(*handler as usize).is_some());
        }
    }
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// Decode the instruction attribute of the function named `name`
pub fn function_body(entity: &EntityFile, name: &str) -> DecodedBody {
    let name_index = utf8_index(entity, name).expect("function name not in the pool");
    let function = entity
        .functions
        .iter()
        .find(|function| (function.name_index.0).0 == name_index)
        .expect("no such function");
    let info = &function.attributes[0].info;

    let max_stack_size = read_u16(info, 0);
    let local_variable_count = read_u16(info, 2);
    let code_length = u32::from_be_bytes([info[4], info[5], info[6], info[7]]) as usize;
    let code = &info[8..8 + code_length];
    let instructions = decode_instructions(code).unwrap();

    let mut cursor = 8 + code_length;
    let site_count = read_u16(info, cursor) as usize;
    cursor += 2;
    let mut exception_table = vec![];
    for _ in 0..site_count {
        exception_table.push([
            read_u16(info, cursor),
            read_u16(info, cursor + 2),
            read_u16(info, cursor + 4),
            read_u16(info, cursor + 6),
        ]);
        cursor += 8;
    }
    assert_eq!(cursor, info.len());

    DecodedBody {
        max_stack_size,
        local_variable_count,
        code_length,
        instructions,
        exception_table,
    }
}
