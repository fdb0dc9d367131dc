//! Translate resolved syntax trees into Zen binary entities
//!
//! Each class of a [`CompilationUnit`](crate::ast::CompilationUnit) becomes one entity. Function
//! bodies are translated by a [`FunctionTranslator`], which lowers structured control flow into
//! jumps and exception handler sites, and operators into calls to the runtime kernel.

mod control_frame;
mod diagnostics;
mod errors;
mod expression;
mod function;
mod generator;
mod handlers;
mod runtime;
mod settings;

pub use control_frame::*;
pub use diagnostics::*;
pub use errors::*;
pub use expression::*;
pub use function::*;
pub use generator::*;
pub use runtime::*;
pub use settings::*;
