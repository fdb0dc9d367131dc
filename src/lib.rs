//! Backend of the Zen compiler: turns resolved syntax trees into `.feb` entity files
//!
//! The pipeline runs one [`ast::CompilationUnit`] at a time:
//!
//!   * [`translate::EntityGenerator`] walks every class of the unit, with names looked up in the
//!     [`symbols::SymbolTable`] built by the resolver
//!   * function bodies are lowered by [`translate::FunctionTranslator`] into bytecode on a
//!     [`feb::ChannelSet`], referring to a per-class [`feb::ConstantPool`]
//!   * the resulting [`feb::EntityFile`] is serialized to `<qualified-name>.feb`
//!
//! Problems in the source program are collected as [`translate::Diagnostic`]s instead of
//! stopping generation, and entities of classes with errors are not written.

pub mod ast;
pub mod feb;
pub mod symbols;
pub mod translate;
