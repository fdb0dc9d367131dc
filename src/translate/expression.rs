use super::function::unqualified;
use super::{DiagnosticKind, Error, FunctionTranslator, RuntimeField, RuntimeFunction};
use crate::ast::{
    AssignmentExpression, BinaryOperator, CallExpression, ConditionalExpression, Expression,
    Identifier, Literal, LogicalExpression, LogicalOperator, MemberExpression, NewExpression,
    Span, UnaryExpression,
};
use crate::feb::{
    BinaryName, ConstantData, ConstantIndex, ConstantsWriter, FieldConstantIndex, FieldRef,
    FieldType, FunctionDescriptor, FunctionRef, Label, Opcode, UnqualifiedName,
};
use crate::symbols::{FunctionSymbol, Storage, Symbol, VariableSymbol};

/// Whether an expression is being translated for its value or as the target of an assignment
///
/// The same syntax (`a`, `a.b`, `a[b]`) denotes both; only the final load or store differs.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EvaluationMode {
    Read,
    Write,
}

/// Storage location denoted by an expression
///
/// Translating the access pushes whatever the location needs on the stack (receiver, member
/// name, index) but not the load or store itself.
#[derive(Copy, Clone, Debug)]
enum AccessTarget {
    Local(u16),
    StaticField(FieldConstantIndex),

    /// Receiver is on the stack
    InstanceField(FieldConstantIndex),

    /// Object and member name string are on the stack
    DynamicMember,

    /// Object and index are on the stack
    Subscript,

    /// Read-only value, already on the stack
    Value,

    /// Erroneous access which has been reported (nothing is on the stack)
    Invalid,
}

impl AccessTarget {
    /// Number of stack slots pushed to address the location
    fn address_size(&self) -> usize {
        match self {
            AccessTarget::InstanceField(_) => 1,
            AccessTarget::DynamicMember | AccessTarget::Subscript => 2,
            _ => 0,
        }
    }
}

impl<'a> FunctionTranslator<'a> {
    /// Translate an expression, leaving its value on the stack
    pub fn translate_expression(&mut self, expression: &Expression) -> Result<(), Error> {
        match expression {
            Expression::Identifier(_)
            | Expression::This(_)
            | Expression::Member(_)
            | Expression::Subscript(_) => {
                let target = self.translate_access(expression, EvaluationMode::Read)?;
                self.load(target)
            }
            Expression::Assignment(assignment) => self.translate_assignment(assignment),
            Expression::Conditional(conditional) => self.translate_conditional(conditional),
            Expression::Logical(logical) => self.translate_logical(logical),
            Expression::Binary(binary) => {
                self.translate_expression(&binary.left)?;
                self.translate_expression(&binary.right)?;
                self.evaluate_binary(binary.operator)
            }
            Expression::Unary(unary) => self.translate_unary(unary),
            Expression::Literal(literal, _) => self.translate_literal(literal),
            Expression::List(elements, _) => {
                self.construct(BinaryName::LIST, RuntimeFunction::ListInitialize)?;
                for element in elements {
                    self.code.push_instruction(Opcode::Duplicate, &[])?;
                    self.translate_expression(element)?;
                    self.call_runtime(RuntimeFunction::ListAdd)?;
                }
                Ok(())
            }
            Expression::Map(entries, _) => {
                self.construct(BinaryName::MAP, RuntimeFunction::MapInitialize)?;
                for (key, value) in entries {
                    self.code.push_instruction(Opcode::Duplicate, &[])?;
                    self.translate_expression(key)?;
                    self.translate_expression(value)?;
                    self.call_runtime(RuntimeFunction::MapPut)?;
                }
                Ok(())
            }
            Expression::Call(call) => self.translate_call(call),
            Expression::New(new) => self.translate_new(new),
        }
    }

    /// Translate a condition, jumping to `false_label` when it doesn't hold
    pub fn translate_condition(
        &mut self,
        condition: &Expression,
        false_label: Label,
    ) -> Result<(), Error> {
        self.translate_expression(condition)?;
        self.call_runtime(RuntimeFunction::IsTrue)?;
        self.code.push_jump(Opcode::JumpEq0I, false_label)?;
        Ok(())
    }

    /// Work out what location an expression denotes, pushing its address
    fn translate_access(
        &mut self,
        expression: &Expression,
        mode: EvaluationMode,
    ) -> Result<AccessTarget, Error> {
        match expression {
            Expression::Identifier(identifier) => self.access_identifier(identifier, mode),

            Expression::This(span) => {
                if mode == EvaluationMode::Write {
                    self.report_invalid_target(*span);
                    Ok(AccessTarget::Invalid)
                } else if self.is_static {
                    self.report(
                        DiagnosticKind::InstanceReferenceFromStatic,
                        *span,
                        "'this' used in a static context",
                    );
                    Ok(AccessTarget::Invalid)
                } else {
                    self.code.push_instruction(Opcode::LoadA, &[0])?;
                    Ok(AccessTarget::Value)
                }
            }

            Expression::Member(member) => self.access_member(member),

            Expression::Subscript(subscript) => {
                self.translate_expression(&subscript.object)?;
                self.translate_expression(&subscript.index)?;
                Ok(AccessTarget::Subscript)
            }

            _ => {
                if mode == EvaluationMode::Write {
                    self.report_invalid_target(expression.span());
                    Ok(AccessTarget::Invalid)
                } else {
                    self.translate_expression(expression)?;
                    Ok(AccessTarget::Value)
                }
            }
        }
    }

    fn access_identifier(
        &mut self,
        identifier: &Identifier,
        mode: EvaluationMode,
    ) -> Result<AccessTarget, Error> {
        let symbols = self.context.symbols;
        let symbol = match symbols.resolve(self.scope, identifier.as_str()) {
            Some(symbol) => symbol,
            None => {
                self.report(
                    DiagnosticKind::UnresolvedSymbol,
                    identifier.span,
                    format!("cannot resolve '{}'", identifier.as_str()),
                );
                return Ok(AccessTarget::Invalid);
            }
        };

        match symbol {
            Symbol::Constant(_) if mode == EvaluationMode::Write => {
                self.report(
                    DiagnosticKind::AssignmentToConstant,
                    identifier.span,
                    format!("cannot assign to constant '{}'", identifier.as_str()),
                );
                Ok(AccessTarget::Invalid)
            }
            Symbol::Variable(variable) | Symbol::Constant(variable) => {
                self.access_variable(identifier, variable)
            }
            Symbol::Function(function) => {
                if mode == EvaluationMode::Write {
                    self.report_invalid_target(identifier.span);
                    Ok(AccessTarget::Invalid)
                } else if function.is_overloaded() {
                    self.report(
                        DiagnosticKind::OverloadedFunctionReference,
                        identifier.span,
                        format!(
                            "'{}' is overloaded and cannot be used as a value",
                            identifier.as_str()
                        ),
                    );
                    Ok(AccessTarget::Invalid)
                } else {
                    let arity = function.parameter_counts.first().copied().unwrap_or(0);
                    let function_ref = self.function_ref(function, identifier, arity)?;
                    let index = function_ref.constant_index(self.context.constants)?;
                    self.load_constant(index.into())?;
                    Ok(AccessTarget::Value)
                }
            }
            Symbol::Class(class) => {
                if mode == EvaluationMode::Write {
                    self.report_invalid_target(identifier.span);
                    Ok(AccessTarget::Invalid)
                } else {
                    let index = class.qualified_name.constant_index(self.context.constants)?;
                    self.load_constant(index.into())?;
                    Ok(AccessTarget::Value)
                }
            }
        }
    }

    fn access_variable(
        &mut self,
        identifier: &Identifier,
        variable: &VariableSymbol,
    ) -> Result<AccessTarget, Error> {
        match &variable.storage {
            Storage::Local(slot) => Ok(AccessTarget::Local(*slot)),
            Storage::Field { class, is_static } => {
                let field = FieldRef {
                    class: class.clone(),
                    name: unqualified(identifier)?,
                    descriptor: FieldType::OBJECT,
                }
                .constant_index(self.context.constants)?;

                if *is_static {
                    Ok(AccessTarget::StaticField(field))
                } else if self.is_static {
                    self.report(
                        DiagnosticKind::InstanceReferenceFromStatic,
                        identifier.span,
                        format!(
                            "instance field '{}' used in a static context",
                            identifier.as_str()
                        ),
                    );
                    Ok(AccessTarget::Invalid)
                } else {
                    self.code.push_instruction(Opcode::LoadA, &[0])?;
                    Ok(AccessTarget::InstanceField(field))
                }
            }
        }
    }

    /// `this.field` and `Class.field` are resolved statically, everything else goes through
    /// the runtime's `loadField`/`storeField`
    fn access_member(&mut self, member: &MemberExpression) -> Result<AccessTarget, Error> {
        let symbols = self.context.symbols;
        match &member.object {
            Expression::This(_) if !self.is_static => {
                let class_scope = self.context.class.scope;
                if let Some(Symbol::Variable(variable)) =
                    symbols.resolve(class_scope, member.name.as_str())
                {
                    if matches!(variable.storage, Storage::Field { .. }) {
                        return self.access_variable(&member.name, variable);
                    }
                }
            }
            Expression::Identifier(identifier) => {
                if let Some(Symbol::Class(class)) = symbols.resolve(self.scope, identifier.as_str())
                {
                    let field = FieldRef {
                        class: class.qualified_name.clone(),
                        name: unqualified(&member.name)?,
                        descriptor: FieldType::OBJECT,
                    }
                    .constant_index(self.context.constants)?;
                    return Ok(AccessTarget::StaticField(field));
                }
            }
            _ => (),
        }

        self.translate_expression(&member.object)?;
        self.load_string(member.name.as_str())?;
        Ok(AccessTarget::DynamicMember)
    }

    /// Load the value at a location whose address has been pushed
    fn load(&mut self, target: AccessTarget) -> Result<(), Error> {
        match target {
            AccessTarget::Local(slot) => self.code.push_instruction(Opcode::LoadA, &[slot])?,
            AccessTarget::StaticField(field) => self
                .code
                .push_instruction(Opcode::LoadStaticField, &[(field.0).0])?,
            AccessTarget::InstanceField(field) => self
                .code
                .push_instruction(Opcode::LoadInstanceField, &[(field.0).0])?,
            AccessTarget::DynamicMember => self.call_runtime(RuntimeFunction::LoadField)?,
            AccessTarget::Subscript => self.call_runtime(RuntimeFunction::LoadSubscript)?,
            AccessTarget::Value => (),
            AccessTarget::Invalid => self.code.push_instruction(Opcode::PushNull, &[])?,
        }
        Ok(())
    }

    /// Store the value on top of the stack into a location whose address is underneath it
    ///
    /// The stored value is left on the stack, since assignments are expressions.
    fn store(&mut self, target: AccessTarget) -> Result<(), Error> {
        match target {
            AccessTarget::Local(slot) => {
                self.code.push_instruction(Opcode::Duplicate, &[])?;
                self.code.push_instruction(Opcode::StoreA, &[slot])?;
            }
            AccessTarget::StaticField(field) => {
                self.code.push_instruction(Opcode::Duplicate, &[])?;
                self.code
                    .push_instruction(Opcode::StoreStaticField, &[(field.0).0])?;
            }
            AccessTarget::InstanceField(field) => {
                self.code.push_instruction(Opcode::DuplicateX1, &[])?;
                self.code
                    .push_instruction(Opcode::StoreInstanceField, &[(field.0).0])?;
            }
            AccessTarget::DynamicMember => self.call_runtime(RuntimeFunction::StoreField)?,
            AccessTarget::Subscript => self.call_runtime(RuntimeFunction::StoreSubscript)?,
            AccessTarget::Value | AccessTarget::Invalid => (),
        }
        Ok(())
    }

    /// `target = value` and `target op= value`
    ///
    /// For compound assignments, the address of the target is duplicated so that it can be used
    /// for both the load and the store.
    fn translate_assignment(&mut self, assignment: &AssignmentExpression) -> Result<(), Error> {
        let target = self.translate_access(&assignment.target, EvaluationMode::Write)?;
        match assignment.operator {
            None => self.translate_expression(&assignment.value)?,
            Some(operator) => {
                match target.address_size() {
                    0 => (),
                    1 => self.code.push_instruction(Opcode::Duplicate, &[])?,
                    _ => self.code.push_instruction(Opcode::Duplicate2, &[])?,
                }
                self.load(target)?;
                self.translate_expression(&assignment.value)?;
                self.evaluate_binary(operator)?;
            }
        }
        self.store(target)
    }

    fn translate_conditional(&mut self, conditional: &ConditionalExpression) -> Result<(), Error> {
        let otherwise = self.code.fresh_label();
        let end = self.code.fresh_label();

        self.translate_condition(&conditional.condition, otherwise)?;
        self.translate_expression(&conditional.then)?;
        self.code.push_jump(Opcode::Jump, end)?;

        self.code.place_label(otherwise)?;
        self.translate_expression(&conditional.otherwise)?;
        self.code.place_label(end)?;
        Ok(())
    }

    /// `a && b` keeps `a` if it is false, `a || b` keeps `a` if it is true
    fn translate_logical(&mut self, logical: &LogicalExpression) -> Result<(), Error> {
        let end = self.code.fresh_label();
        let short_circuit = match logical.operator {
            LogicalOperator::And => Opcode::JumpEq0I,
            LogicalOperator::Or => Opcode::JumpNe0I,
        };

        self.translate_expression(&logical.left)?;
        self.code.push_instruction(Opcode::Duplicate, &[])?;
        self.call_runtime(RuntimeFunction::IsTrue)?;
        self.code.push_jump(short_circuit, end)?;
        self.code.push_instruction(Opcode::Pop, &[])?;
        self.translate_expression(&logical.right)?;
        self.code.place_label(end)?;
        Ok(())
    }

    fn translate_unary(&mut self, unary: &UnaryExpression) -> Result<(), Error> {
        self.translate_expression(&unary.operand)?;
        self.load_string(unary.operator.symbol())?;
        self.call_runtime(RuntimeFunction::EvaluateUnary)
    }

    /// Both operands are on the stack
    fn evaluate_binary(&mut self, operator: BinaryOperator) -> Result<(), Error> {
        self.load_string(operator.symbol())?;
        self.call_runtime(RuntimeFunction::EvaluateBinary)
    }

    fn translate_literal(&mut self, literal: &Literal) -> Result<(), Error> {
        let (data, boxing) = match literal {
            Literal::Integer(integer) => {
                (ConstantData::Integer(*integer), RuntimeFunction::NewInteger)
            }
            Literal::Long(long) => (ConstantData::Long(*long), RuntimeFunction::NewLong),
            Literal::Float(float) => (ConstantData::Float(*float), RuntimeFunction::NewFloat),
            Literal::Double(double) => {
                (ConstantData::Double(*double), RuntimeFunction::NewDouble)
            }
            Literal::String(string) => return self.load_string(string),
            Literal::Boolean(true) => return self.load_runtime_field(RuntimeField::True),
            Literal::Boolean(false) => return self.load_runtime_field(RuntimeField::False),
            Literal::Null => {
                self.code.push_instruction(Opcode::PushNull, &[])?;
                return Ok(());
            }
        };
        let index = data.constant_index(self.context.constants)?;
        self.load_constant(index)?;
        self.call_runtime(boxing)
    }

    fn translate_call(&mut self, call: &CallExpression) -> Result<(), Error> {
        let symbols = self.context.symbols;
        let arity = call.arguments.len();

        match &call.callee {
            Expression::Identifier(identifier) => {
                match symbols.resolve(self.scope, identifier.as_str()) {
                    Some(Symbol::Function(function)) => {
                        return self.call_function(function, identifier, &call.arguments)
                    }
                    None => {
                        self.report(
                            DiagnosticKind::UnresolvedSymbol,
                            identifier.span,
                            format!("cannot resolve function '{}'", identifier.as_str()),
                        );
                        self.code.push_instruction(Opcode::PushNull, &[])?;
                        return Ok(());
                    }
                    Some(_) => (),
                }
            }
            Expression::Member(member) => {
                let class_symbol = match &member.object {
                    Expression::This(_) => {
                        symbols.resolve(self.context.class.scope, member.name.as_str())
                    }
                    Expression::Identifier(identifier) => {
                        match symbols.resolve(self.scope, identifier.as_str()) {
                            Some(Symbol::Class(class)) => {
                                let function_ref = FunctionRef {
                                    class: class.qualified_name.clone(),
                                    name: unqualified(&member.name)?,
                                    descriptor: FunctionDescriptor::dynamic(arity),
                                    table_index: self.table_index(
                                        &class.qualified_name,
                                        member.name.as_str(),
                                        arity,
                                    ),
                                };
                                return self.invoke(
                                    Opcode::InvokeStatic,
                                    &function_ref,
                                    &call.arguments,
                                );
                            }
                            _ => None,
                        }
                    }
                    _ => None,
                };
                if let Some(Symbol::Function(function)) = class_symbol {
                    if !function.is_static {
                        return self.call_function(function, &member.name, &call.arguments);
                    }
                }

                // Dispatched on the receiver at runtime
                self.translate_expression(&member.object)?;
                let function_ref = FunctionRef {
                    class: BinaryName::OBJECT,
                    name: unqualified(&member.name)?,
                    descriptor: FunctionDescriptor::dynamic(arity),
                    table_index: 0,
                };
                return self.invoke(Opcode::InvokeDynamic, &function_ref, &call.arguments);
            }
            _ => (),
        }

        // Calling an arbitrary value
        self.translate_expression(&call.callee)?;
        for argument in &call.arguments {
            self.translate_expression(argument)?;
        }
        self.call_runtime(RuntimeFunction::Invoke(arity))
    }

    /// Call a function of a known class
    fn call_function(
        &mut self,
        function: &FunctionSymbol,
        name: &Identifier,
        arguments: &[Expression],
    ) -> Result<(), Error> {
        let arity = arguments.len();
        if !function.accepts(arity) {
            self.report(
                DiagnosticKind::NoMatchingOverload,
                name.span,
                format!(
                    "no overload of '{}' takes {} argument(s)",
                    name.as_str(),
                    arity
                ),
            );
            self.code.push_instruction(Opcode::PushNull, &[])?;
            return Ok(());
        }

        let function_ref = self.function_ref(function, name, arity)?;
        if function.is_static {
            self.invoke(Opcode::InvokeStatic, &function_ref, arguments)
        } else if self.is_static {
            self.report(
                DiagnosticKind::InstanceReferenceFromStatic,
                name.span,
                format!(
                    "instance function '{}' called from a static context",
                    name.as_str()
                ),
            );
            self.code.push_instruction(Opcode::PushNull, &[])?;
            Ok(())
        } else {
            self.code.push_instruction(Opcode::LoadA, &[0])?;
            self.invoke(Opcode::InvokeVirtual, &function_ref, arguments)
        }
    }

    /// Push the arguments and invoke (any receiver is already on the stack)
    fn invoke(
        &mut self,
        opcode: Opcode,
        function_ref: &FunctionRef,
        arguments: &[Expression],
    ) -> Result<(), Error> {
        for argument in arguments {
            self.translate_expression(argument)?;
        }
        let index = function_ref.constant_index(self.context.constants)?;
        self.code
            .push_invoke(opcode, index, &function_ref.descriptor)?;
        Ok(())
    }

    fn function_ref(
        &self,
        function: &FunctionSymbol,
        name: &Identifier,
        arity: usize,
    ) -> Result<FunctionRef, Error> {
        Ok(FunctionRef {
            class: function.class.clone(),
            name: unqualified(name)?,
            descriptor: FunctionDescriptor::dynamic(arity),
            table_index: self.table_index(&function.class, name.as_str(), arity),
        })
    }

    /// Functions of the class being generated have known slots, others are bound at load time
    fn table_index(&self, class: &BinaryName, name: &str, arity: usize) -> u16 {
        if *class == self.context.class.name {
            self.context.class.table_index(name, arity).unwrap_or(0)
        } else {
            0
        }
    }

    fn translate_new(&mut self, new: &NewExpression) -> Result<(), Error> {
        let symbols = self.context.symbols;
        let class = match symbols.resolve(self.scope, new.class.as_str()) {
            Some(Symbol::Class(class)) => class.qualified_name.clone(),
            _ => {
                self.report(
                    DiagnosticKind::UnresolvedSymbol,
                    new.class.span,
                    format!("cannot resolve class '{}'", new.class.as_str()),
                );
                self.code.push_instruction(Opcode::PushNull, &[])?;
                return Ok(());
            }
        };

        let class_index = class.constant_index(self.context.constants)?;
        self.code.push_instruction(Opcode::New, &[(class_index.0).0])?;
        self.code.push_instruction(Opcode::Duplicate, &[])?;
        let initialize = FunctionRef {
            class,
            name: UnqualifiedName::INITIALIZE,
            descriptor: FunctionDescriptor::initializer(new.arguments.len()),
            table_index: 0,
        };
        self.invoke(Opcode::InvokeSpecial, &initialize, &new.arguments)
    }

    /// Instantiate a runtime collection with its no-argument initializer
    fn construct(&mut self, class: BinaryName, initialize: RuntimeFunction) -> Result<(), Error> {
        let class_index = class.constant_index(self.context.constants)?;
        self.code.push_instruction(Opcode::New, &[(class_index.0).0])?;
        self.code.push_instruction(Opcode::Duplicate, &[])?;
        self.call_runtime(initialize)
    }

    fn load_constant(&mut self, index: ConstantIndex) -> Result<(), Error> {
        self.code.push_instruction(Opcode::LoadCpr, &[index.0])?;
        Ok(())
    }

    fn load_string(&mut self, string: &str) -> Result<(), Error> {
        let index = ConstantData::String(string.to_owned()).constant_index(self.context.constants)?;
        self.load_constant(index)
    }

    fn report_invalid_target(&mut self, span: Span) {
        self.report(
            DiagnosticKind::InvalidAssignmentTarget,
            span,
            "expression cannot be assigned to",
        );
    }
}
