//! Typed, resolved syntax tree consumed by the generator
//!
//! Parsing and name resolution happen before generation, so every node that opens a scope
//! carries the [`ScopeId`] the resolver assigned to it. Identifiers keep their source position
//! for diagnostics.

mod expression;
mod statement;

pub use expression::*;
pub use statement::*;

use crate::symbols::ScopeId;
use bitflags::bitflags;
use std::fmt;

/// Position of a token in its source file (1-based)
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub const fn new(line: u32, column: u32) -> Span {
        Span { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Name token
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Identifier {
    pub text: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(text: impl Into<String>, span: Span) -> Identifier {
        Identifier {
            text: text.into(),
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

bitflags! {
    /// Declaration modifiers written in source
    pub struct Modifiers: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const SECRET = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
    }
}

/// One source file
///
/// Qualified class names come from the class scopes, where the resolver recorded them.
#[derive(Clone, PartialEq, Debug)]
pub struct CompilationUnit {
    pub classes: Vec<ClassDeclaration>,
    pub scope: ScopeId,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ClassDeclaration {
    pub name: Identifier,
    pub modifiers: Modifiers,

    /// Superclass names, resolved in the scope enclosing the class
    pub superclasses: Vec<Identifier>,
    pub members: Vec<Member>,
    pub scope: ScopeId,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Member {
    Field(FieldDeclaration),
    Function(FunctionDeclaration),
}

/// Fields declared together (`var a = 1, b`) share their modifiers
#[derive(Clone, PartialEq, Debug)]
pub struct FieldDeclaration {
    pub modifiers: Modifiers,
    pub constant: bool,
    pub declarators: Vec<VariableDeclarator>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FunctionKind {
    Function,

    /// Instance initializer, emitted as `<initialize>`
    Initializer,
}

#[derive(Clone, PartialEq, Debug)]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub kind: FunctionKind,
    pub modifiers: Modifiers,
    pub parameters: Vec<Identifier>,

    /// Abstract and native functions have no body
    pub body: Option<Block>,
    pub scope: ScopeId,
}

impl FunctionDeclaration {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }
}

/// Sequence of statements, optionally opening a scope of its own
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub scope: Option<ScopeId>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Block {
        Block {
            statements,
            scope: None,
        }
    }

    pub fn scoped(statements: Vec<Statement>, scope: ScopeId) -> Block {
        Block {
            statements,
            scope: Some(scope),
        }
    }
}
