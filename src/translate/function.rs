use super::{
    ClassLayout, DiagnosticKind, Diagnostics, Error, LoopStack, RuntimeField, RuntimeFunction,
};
use crate::ast::{
    Block, BreakStatement, ContinueStatement, FieldDeclaration, ForStatement, Identifier,
    IfStatement, Modifiers, ReturnStatement, Span, Statement, VariableDeclaration, WhileStatement,
};
use crate::feb::{
    self, CodeBuilder, ConstantPool, ConstantsWriter, FieldRef, FieldType, FunctionDescriptor,
    FunctionRef, InstructionAttribute, Name, Opcode, UnqualifiedName,
};
use crate::symbols::{ScopeId, Storage, Symbol, SymbolTable};

/// Unit-wide state shared by every function of the class being translated
pub struct TranslationContext<'a> {
    pub constants: &'a mut ConstantPool,
    pub diagnostics: &'a mut Diagnostics,
    pub symbols: &'a SymbolTable,
    pub class: &'a ClassLayout,
}

/// Shape of the function about to be translated
#[derive(Copy, Clone, Debug)]
pub struct FunctionContext {
    /// Scope names are first resolved in
    pub scope: ScopeId,
    pub is_static: bool,

    /// `<initialize>` returns nothing
    pub is_initializer: bool,

    /// Local slots already taken by `this`, the parameters and declared locals
    pub locals_base: u16,
}

/// Local slots the generator allocates for itself (iterators, locks, caught exceptions, ...)
///
/// They sit above every slot the resolver assigned, and are released in LIFO order once the
/// statement which needed them is translated.
#[derive(Debug)]
pub struct LocalsLayout {
    next: u16,
    max: u16,
}

impl LocalsLayout {
    pub fn new(base: u16) -> LocalsLayout {
        LocalsLayout {
            next: base,
            max: base,
        }
    }

    pub fn push_private(&mut self) -> Result<u16, feb::Error> {
        let slot = self.next;
        if slot > CodeBuilder::MAX_LOCAL {
            return Err(feb::Error::LocalsOverflow(slot as usize));
        }
        self.next += 1;
        self.max = self.max.max(self.next);
        Ok(slot)
    }

    pub fn pop_private(&mut self) {
        self.next -= 1;
    }

    /// Number of slots needed by the function
    pub fn local_variable_count(&self) -> u16 {
        self.max
    }
}

/// Context for translating the body of one function
///
/// Statements are translated here. Expressions live in `expression.rs` and the constructs that
/// build exception tables (`try`, `synchronize`, `with`) in `handlers.rs`.
pub struct FunctionTranslator<'a> {
    pub(super) code: CodeBuilder<'a>,
    pub(super) context: TranslationContext<'a>,

    /// Scope of the innermost block being translated
    pub(super) scope: ScopeId,
    pub(super) is_static: bool,
    pub(super) is_initializer: bool,
    pub(super) locals: LocalsLayout,
    pub(super) loops: LoopStack,
}

impl<'a> FunctionTranslator<'a> {
    pub fn new(
        code: CodeBuilder<'a>,
        context: TranslationContext<'a>,
        function: FunctionContext,
    ) -> FunctionTranslator<'a> {
        FunctionTranslator {
            code,
            context,
            scope: function.scope,
            is_static: function.is_static,
            is_initializer: function.is_initializer,
            locals: LocalsLayout::new(function.locals_base),
            loops: LoopStack::new(),
        }
    }

    /// Close the function body, adding an implicit return if the end is reachable
    pub fn finish(mut self) -> Result<InstructionAttribute, Error> {
        if self.code.is_reachable() {
            if self.is_initializer {
                self.code.push_instruction(Opcode::Return, &[])?;
            } else {
                self.code.push_instruction(Opcode::PushNull, &[])?;
                self.code.push_instruction(Opcode::ReturnA, &[])?;
            }
        }
        assert_eq!(
            self.loops.pending_breaks(),
            0,
            "break records outlived their loops"
        );
        self.code
            .set_local_variable_count(self.locals.local_variable_count());
        Ok(self.code.result()?)
    }

    /// Call the superclass initializer, then run the instance field initializers
    pub fn initialize_instance(&mut self, fields: &[&FieldDeclaration]) -> Result<(), Error> {
        let super_initialize = FunctionRef {
            class: self.context.class.superclass.clone(),
            name: UnqualifiedName::INITIALIZE,
            descriptor: FunctionDescriptor::initializer(0),
            table_index: 0,
        };
        let super_index = super_initialize.constant_index(self.context.constants)?;
        self.code.push_instruction(Opcode::LoadA, &[0])?;
        self.code
            .push_invoke(Opcode::InvokeSpecial, super_index, &super_initialize.descriptor)?;

        self.initialize_fields(fields, false)
    }

    /// Store the initial value of every field (of the given staticness) which has one
    ///
    /// Initializers are resolved in the class scope.
    pub fn initialize_fields(
        &mut self,
        fields: &[&FieldDeclaration],
        is_static: bool,
    ) -> Result<(), Error> {
        let saved_scope = self.scope;
        self.scope = self.context.class.scope;

        for declaration in fields {
            if declaration.modifiers.contains(Modifiers::STATIC) != is_static {
                continue;
            }
            for declarator in &declaration.declarators {
                let initializer = match &declarator.initializer {
                    Some(initializer) => initializer,
                    None => continue,
                };
                let field = FieldRef {
                    class: self.context.class.name.clone(),
                    name: unqualified(&declarator.name)?,
                    descriptor: FieldType::OBJECT,
                }
                .constant_index(self.context.constants)?;

                if is_static {
                    self.translate_expression(initializer)?;
                    self.code
                        .push_instruction(Opcode::StoreStaticField, &[(field.0).0])?;
                } else {
                    self.code.push_instruction(Opcode::LoadA, &[0])?;
                    self.translate_expression(initializer)?;
                    self.code
                        .push_instruction(Opcode::StoreInstanceField, &[(field.0).0])?;
                }
            }
        }

        self.scope = saved_scope;
        Ok(())
    }

    pub fn translate_block(&mut self, block: &Block) -> Result<(), Error> {
        let saved_scope = self.scope;
        if let Some(scope) = block.scope {
            self.scope = scope;
        }
        for statement in &block.statements {
            self.translate_statement(statement)?;
        }
        self.scope = saved_scope;
        Ok(())
    }

    fn translate_statement(&mut self, statement: &Statement) -> Result<(), Error> {
        match statement {
            Statement::Block(block) => self.translate_block(block),
            Statement::Variable(declaration) => self.translate_variable(declaration),
            Statement::Expression(expression) => {
                self.translate_expression(expression)?;
                self.code.push_instruction(Opcode::Pop, &[])?;
                Ok(())
            }
            Statement::If(if_statement) => self.translate_if(if_statement),
            Statement::While(while_statement) => self.translate_while(while_statement),
            Statement::For(for_statement) => self.translate_for(for_statement),
            Statement::Break(break_statement) => self.translate_break(break_statement),
            Statement::Continue(continue_statement) => self.translate_continue(continue_statement),
            Statement::Return(return_statement) => self.translate_return(return_statement),
            Statement::Throw(throw) => {
                self.translate_expression(&throw.exception)?;
                self.code.push_instruction(Opcode::Throw, &[])?;
                Ok(())
            }
            Statement::Try(try_statement) => self.translate_try(try_statement),
            Statement::Synchronize(synchronize) => self.translate_synchronize(synchronize),
            Statement::With(with) => self.translate_with(with),
            Statement::Empty => Ok(()),
        }
    }

    fn translate_variable(&mut self, declaration: &VariableDeclaration) -> Result<(), Error> {
        for declarator in &declaration.declarators {
            match &declarator.initializer {
                Some(initializer) => self.translate_expression(initializer)?,
                None => self.code.push_instruction(Opcode::PushNull, &[])?,
            }
            self.store_declared(self.scope, &declarator.name)?;
        }
        Ok(())
    }

    /// Pop the top of the stack into a local declared in `scope`
    pub(super) fn store_declared(&mut self, scope: ScopeId, name: &Identifier) -> Result<(), Error> {
        let symbols = self.context.symbols;
        match symbols.resolve(scope, name.as_str()) {
            Some(Symbol::Variable(variable)) | Some(Symbol::Constant(variable)) => {
                if let Storage::Local(slot) = variable.storage {
                    self.code.push_instruction(Opcode::StoreA, &[slot])?;
                    return Ok(());
                }
            }
            _ => (),
        }
        self.report(
            DiagnosticKind::UnresolvedSymbol,
            name.span,
            format!("'{}' is not a local variable", name.as_str()),
        );
        self.code.push_instruction(Opcode::Pop, &[])?;
        Ok(())
    }

    /// `if`/`else if`/`else` ladder
    ///
    /// Each clause's condition skips to the next clause when false; each clause body except the
    /// last jumps past the whole ladder.
    fn translate_if(&mut self, if_statement: &IfStatement) -> Result<(), Error> {
        let after_ladder = self.code.fresh_label();
        let clause_count = if_statement.clauses.len();

        for (idx, clause) in if_statement.clauses.iter().enumerate() {
            let next_clause = self.code.fresh_label();
            self.translate_condition(&clause.condition, next_clause)?;
            self.translate_block(&clause.body)?;

            let is_last = idx + 1 == clause_count && if_statement.else_clause.is_none();
            if !is_last {
                self.code.push_jump(Opcode::Jump, after_ladder)?;
            }
            self.code.place_label(next_clause)?;
        }

        if let Some(else_clause) = &if_statement.else_clause {
            self.translate_block(else_clause)?;
        }
        self.code.place_label(after_ladder)?;
        Ok(())
    }

    fn translate_while(&mut self, while_statement: &WhileStatement) -> Result<(), Error> {
        let start = self.code.fresh_label();
        let exit = self.code.fresh_label();

        self.code.place_label(start)?;
        self.translate_condition(&while_statement.condition, exit)?;

        let label = while_statement.label.as_ref().map(|label| label.text.clone());
        self.loops.push(label, start);
        self.translate_block(&while_statement.body)?;
        self.code.push_jump(Opcode::Jump, start)?;

        self.code.place_label(exit)?;
        self.resolve_breaks()
    }

    /// `for (x : iterable)` runs over `iterable.getIterator()` with `hasNext`/`getNext`
    fn translate_for(&mut self, for_statement: &ForStatement) -> Result<(), Error> {
        self.translate_expression(&for_statement.iterable)?;
        self.call_runtime(RuntimeFunction::GetIterator)?;
        let iterator = self.locals.push_private()?;
        self.code.push_instruction(Opcode::StoreA, &[iterator])?;

        let start = self.code.fresh_label();
        let exit = self.code.fresh_label();

        self.code.place_label(start)?;
        self.code.push_instruction(Opcode::LoadA, &[iterator])?;
        self.call_runtime(RuntimeFunction::HasNext)?;
        self.call_runtime(RuntimeFunction::IsTrue)?;
        self.code.push_jump(Opcode::JumpEq0I, exit)?;

        self.code.push_instruction(Opcode::LoadA, &[iterator])?;
        self.call_runtime(RuntimeFunction::GetNext)?;
        let body_scope = for_statement.body.scope.unwrap_or(self.scope);
        self.store_declared(body_scope, &for_statement.variable)?;

        let label = for_statement.label.as_ref().map(|label| label.text.clone());
        self.loops.push(label, start);
        self.translate_block(&for_statement.body)?;
        self.code.push_jump(Opcode::Jump, start)?;

        self.code.place_label(exit)?;
        self.resolve_breaks()?;
        self.locals.pop_private();
        Ok(())
    }

    /// Leave the innermost loop, pointing its breaks at the current offset
    fn resolve_breaks(&mut self) -> Result<(), Error> {
        let exit_offset = self.code.current_offset()?;
        for record in self.loops.pop() {
            log::trace!(
                "Patching break at {} to {} (loop {})",
                record.patch_offset,
                exit_offset,
                record.loop_identifier
            );
            self.code.patch_jump(record.patch_offset, exit_offset);
        }
        Ok(())
    }

    fn translate_break(&mut self, break_statement: &BreakStatement) -> Result<(), Error> {
        let label = break_statement.label.as_ref();
        let target = self.loops.find(label.map(Identifier::as_str)).map(|frame| frame.identifier);
        match target {
            Some(loop_identifier) => {
                let placeholder = self.code.push_jump_placeholder(Opcode::Jump)?;
                self.loops.record_break(loop_identifier, placeholder);
            }
            None => self.report_missing_loop("break", label, break_statement.span),
        }
        Ok(())
    }

    fn translate_continue(&mut self, continue_statement: &ContinueStatement) -> Result<(), Error> {
        let label = continue_statement.label.as_ref();
        let target = self.loops.find(label.map(Identifier::as_str)).map(|frame| frame.continue_label);
        match target {
            Some(continue_label) => self.code.push_jump(Opcode::Jump, continue_label)?,
            None => self.report_missing_loop("continue", label, continue_statement.span),
        }
        Ok(())
    }

    fn report_missing_loop(&mut self, keyword: &str, label: Option<&Identifier>, span: Span) {
        match label {
            Some(label) if !self.loops.is_empty() => self.report(
                DiagnosticKind::UnknownLoopLabel,
                label.span,
                format!("no enclosing loop is labeled '{}'", label.as_str()),
            ),
            _ => {
                let kind = if keyword == "break" {
                    DiagnosticKind::BreakOutsideLoop
                } else {
                    DiagnosticKind::ContinueOutsideLoop
                };
                self.report(kind, span, format!("'{}' outside of a loop", keyword));
            }
        }
    }

    fn translate_return(&mut self, return_statement: &ReturnStatement) -> Result<(), Error> {
        if self.is_initializer {
            if let Some(value) = &return_statement.value {
                self.report(
                    DiagnosticKind::ReturnValueFromInitializer,
                    return_statement.span,
                    "initializers cannot return a value",
                );
                self.translate_expression(value)?;
                self.code.push_instruction(Opcode::Pop, &[])?;
            }
            self.code.push_instruction(Opcode::Return, &[])?;
        } else {
            match &return_statement.value {
                Some(value) => self.translate_expression(value)?,
                None => self.code.push_instruction(Opcode::PushNull, &[])?,
            }
            self.code.push_instruction(Opcode::ReturnA, &[])?;
        }
        Ok(())
    }

    /// Invoke a runtime function, whose arguments are already on the stack
    pub(super) fn call_runtime(&mut self, function: RuntimeFunction) -> Result<(), Error> {
        let function_ref = function.function_ref();
        let index = function_ref.constant_index(self.context.constants)?;
        self.code
            .push_invoke(function.invoke_type(), index, &function_ref.descriptor)?;
        Ok(())
    }

    pub(super) fn load_runtime_field(&mut self, field: RuntimeField) -> Result<(), Error> {
        let index = field.field_ref().constant_index(self.context.constants)?;
        self.code
            .push_instruction(Opcode::LoadStaticField, &[(index.0).0])?;
        Ok(())
    }

    pub(super) fn report(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        self.context.diagnostics.report(kind, span, message);
    }
}

/// Use a source identifier as a field or function name
pub(super) fn unqualified(identifier: &Identifier) -> Result<UnqualifiedName, Error> {
    UnqualifiedName::from_string(identifier.text.clone()).map_err(Error::MalformedName)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_locals_are_stacked() {
        let mut locals = LocalsLayout::new(3);
        assert_eq!(locals.push_private().unwrap(), 3);
        assert_eq!(locals.push_private().unwrap(), 4);
        locals.pop_private();
        assert_eq!(locals.push_private().unwrap(), 4);
        locals.pop_private();
        locals.pop_private();
        assert_eq!(locals.local_variable_count(), 5);
    }

    #[test]
    fn private_locals_overflow() {
        let mut locals = LocalsLayout::new(CodeBuilder::MAX_LOCAL);
        assert_eq!(locals.push_private().unwrap(), CodeBuilder::MAX_LOCAL);
        assert!(matches!(
            locals.push_private(),
            Err(feb::Error::LocalsOverflow(256))
        ));
    }
}
