//! Statements which add exception handler sites
//!
//! `finally` bodies are emitted twice: once on the normal path (falling out of the `try` body or
//! a catch clause), and once as a catch-all handler which saves the propagating exception, runs
//! the body, and rethrows. `synchronize` and `with` are lowered the same way, with `release` and
//! `close` standing in for the `finally` body.
//!
//! A handler site is only added when its protected range is non-empty, and always after the
//! handler code it points to has been emitted.

use super::{DiagnosticKind, Error, FunctionTranslator, RuntimeFunction};
use crate::ast::{CatchClause, SynchronizeStatement, TryStatement, WithStatement};
use crate::feb::{ClassConstantIndex, ConstantsWriter, Opcode};
use crate::symbols::Symbol;

impl<'a> FunctionTranslator<'a> {
    pub(super) fn translate_try(&mut self, try_statement: &TryStatement) -> Result<(), Error> {
        let exit = self.code.fresh_label();
        let normal_finally = try_statement.finally.as_ref().map(|_| self.code.fresh_label());
        let after_handlers = normal_finally.unwrap_or(exit);

        let try_start = self.code.current_offset()?;
        self.translate_block(&try_statement.body)?;
        let try_stop = self.code.current_offset()?;
        if !try_statement.catches.is_empty() {
            self.code.push_jump(Opcode::Jump, after_handlers)?;
        }

        // Catch clauses, each covering the `try` body for its filters
        let mut catch_ranges: Vec<(u16, u16)> = vec![];
        let catch_count = try_statement.catches.len();
        for (idx, catch) in try_statement.catches.iter().enumerate() {
            let filters = self.catch_filters(catch)?;

            let handler = self.code.current_offset()?;
            self.code.enter_handler();
            let body_scope = catch.body.scope.unwrap_or(self.scope);
            self.store_declared(body_scope, &catch.parameter)?;
            self.translate_block(&catch.body)?;
            let handler_stop = self.code.current_offset()?;
            if idx + 1 != catch_count {
                self.code.push_jump(Opcode::Jump, after_handlers)?;
            }

            if try_start < try_stop {
                for filter in filters {
                    self.code
                        .add_exception_handler(try_start, try_stop, handler, filter);
                }
            }
            catch_ranges.push((handler, handler_stop));
        }

        if let (Some(finally), Some(normal_finally)) = (&try_statement.finally, normal_finally) {
            // First copy: normal completion
            self.code.place_label(normal_finally)?;
            self.translate_block(finally)?;
            self.code.push_jump(Opcode::Jump, exit)?;

            // Second copy: propagating exception
            let handler = self.code.current_offset()?;
            self.code.enter_handler();
            let exception = self.locals.push_private()?;
            self.code.push_instruction(Opcode::StoreA, &[exception])?;
            self.translate_block(finally)?;
            self.code.push_instruction(Opcode::LoadA, &[exception])?;
            self.code.push_instruction(Opcode::Throw, &[])?;
            self.locals.pop_private();

            if try_start < try_stop {
                self.code
                    .add_exception_handler(try_start, try_stop, handler, None);
            }
            for (start, stop) in catch_ranges {
                self.code.add_exception_handler(start, stop, handler, None);
            }
        }

        self.code.place_label(exit)?;
        Ok(())
    }

    /// Exception classes caught by a clause (`None` catches everything)
    fn catch_filters(
        &mut self,
        catch: &CatchClause,
    ) -> Result<Vec<Option<ClassConstantIndex>>, Error> {
        if catch.filters.is_empty() {
            return Ok(vec![None]);
        }

        let symbols = self.context.symbols;
        let mut filters = vec![];
        for filter in &catch.filters {
            match symbols.resolve(self.scope, filter.as_str()) {
                Some(Symbol::Class(class)) => {
                    let index = class.qualified_name.constant_index(self.context.constants)?;
                    filters.push(Some(index));
                }
                _ => self.report(
                    DiagnosticKind::MalformedCatchFilter,
                    filter.span,
                    format!("'{}' is not an exception class", filter.as_str()),
                ),
            }
        }
        Ok(filters)
    }

    /// `synchronize (lock) body`
    ///
    /// The lock is released on the normal path, and by a handler covering the body. That handler
    /// also covers its own `release` call.
    ///
    /// `return`, `break` and `continue` leave the body directly, without releasing the lock. The
    /// monitor stays held until the runtime releases it some other way.
    pub(super) fn translate_synchronize(
        &mut self,
        synchronize: &SynchronizeStatement,
    ) -> Result<(), Error> {
        let exit = self.code.fresh_label();

        self.translate_expression(&synchronize.lock)?;
        self.code.push_instruction(Opcode::Duplicate, &[])?;
        let lock = self.locals.push_private()?;
        self.code.push_instruction(Opcode::StoreA, &[lock])?;
        self.call_runtime(RuntimeFunction::Acquire)?;

        let body_start = self.code.current_offset()?;
        self.translate_block(&synchronize.body)?;
        let body_stop = self.code.current_offset()?;
        self.code.push_instruction(Opcode::LoadA, &[lock])?;
        self.call_runtime(RuntimeFunction::Release)?;
        self.code.push_jump(Opcode::Jump, exit)?;

        let handler = self.code.current_offset()?;
        self.code.enter_handler();
        let exception = self.locals.push_private()?;
        self.code.push_instruction(Opcode::StoreA, &[exception])?;
        self.code.push_instruction(Opcode::LoadA, &[lock])?;
        self.call_runtime(RuntimeFunction::Release)?;
        let handler_stop = self.code.current_offset()?;
        self.code.push_instruction(Opcode::LoadA, &[exception])?;
        self.code.push_instruction(Opcode::Throw, &[])?;
        self.locals.pop_private();
        self.locals.pop_private();

        if body_start < body_stop {
            self.code
                .add_exception_handler(body_start, body_stop, handler, None);
        }
        self.code
            .add_exception_handler(handler, handler_stop, handler, None);

        self.code.place_label(exit)?;
        Ok(())
    }

    /// `with (r1, r2, ...) body`
    ///
    /// Resources are closed in reverse order. Each resource gets two handlers: the first closes
    /// it when an exception escapes, the second catches an exception from that `close` and
    /// suppresses it in favour of the original. The two slots holding those exceptions are shared
    /// by every resource of the statement.
    ///
    /// As with `synchronize`, jumping out of the body with `return`, `break` or `continue` skips
    /// the `close` calls.
    pub(super) fn translate_with(&mut self, with: &WithStatement) -> Result<(), Error> {
        let primary_exception = self.locals.push_private()?;
        let close_exception = self.locals.push_private()?;

        let body_scope = with.body.scope.unwrap_or(self.scope);
        let mut resources: Vec<(u16, u16)> = vec![];
        for resource in &with.resources {
            self.translate_expression(&resource.expression)?;
            if let Some(binding) = &resource.binding {
                self.code.push_instruction(Opcode::Duplicate, &[])?;
                self.store_declared(body_scope, binding)?;
            }
            let slot = self.locals.push_private()?;
            self.code.push_instruction(Opcode::StoreA, &[slot])?;
            resources.push((slot, self.code.current_offset()?));
        }

        self.translate_block(&with.body)?;

        for (slot, start) in resources.into_iter().rev() {
            let stop = self.code.current_offset()?;
            let after = self.code.fresh_label();

            self.code.push_instruction(Opcode::LoadA, &[slot])?;
            self.close_resource()?;
            self.code.push_jump(Opcode::Jump, after)?;

            // Close on the way out of an exception
            let close_handler = self.code.current_offset()?;
            self.code.enter_handler();
            self.code
                .push_instruction(Opcode::StoreA, &[primary_exception])?;
            self.code.push_instruction(Opcode::LoadA, &[slot])?;
            self.close_resource()?;
            let close_stop = self.code.current_offset()?;
            self.code
                .push_instruction(Opcode::LoadA, &[primary_exception])?;
            self.code.push_instruction(Opcode::Throw, &[])?;

            // `close` itself failed
            let suppress_handler = self.code.current_offset()?;
            self.code.enter_handler();
            self.code.push_instruction(Opcode::StoreA, &[close_exception])?;
            self.code
                .push_instruction(Opcode::LoadA, &[primary_exception])?;
            self.code.push_instruction(Opcode::LoadA, &[close_exception])?;
            self.call_runtime(RuntimeFunction::Suppress)?;
            self.code
                .push_instruction(Opcode::LoadA, &[primary_exception])?;
            self.code.push_instruction(Opcode::Throw, &[])?;

            if start < stop {
                self.code
                    .add_exception_handler(start, stop, close_handler, None);
            }
            self.code
                .add_exception_handler(close_handler, close_stop, suppress_handler, None);

            self.code.place_label(after)?;
            self.locals.pop_private();
        }

        self.locals.pop_private();
        self.locals.pop_private();
        Ok(())
    }

    /// `close` the resource on top of the stack, discarding its result
    fn close_resource(&mut self) -> Result<(), Error> {
        self.call_runtime(RuntimeFunction::Close)?;
        self.code.push_instruction(Opcode::Pop, &[])?;
        Ok(())
    }
}
