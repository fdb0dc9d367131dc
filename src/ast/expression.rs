use super::{Identifier, Span};

#[derive(Clone, PartialEq, Debug)]
pub enum Expression {
    Assignment(Box<AssignmentExpression>),
    Conditional(Box<ConditionalExpression>),
    Logical(Box<LogicalExpression>),
    Binary(Box<BinaryExpression>),
    Unary(Box<UnaryExpression>),
    Identifier(Identifier),
    Literal(Literal, Span),
    This(Span),
    List(Vec<Expression>, Span),
    Map(Vec<(Expression, Expression)>, Span),
    Member(Box<MemberExpression>),
    Subscript(Box<SubscriptExpression>),
    Call(Box<CallExpression>),
    New(Box<NewExpression>),
}

impl Expression {
    /// Position used when reporting a problem with the whole expression
    pub fn span(&self) -> Span {
        match self {
            Expression::Assignment(assignment) => assignment.target.span(),
            Expression::Conditional(conditional) => conditional.condition.span(),
            Expression::Logical(logical) => logical.left.span(),
            Expression::Binary(binary) => binary.left.span(),
            Expression::Unary(unary) => unary.span,
            Expression::Identifier(identifier) => identifier.span,
            Expression::Literal(_, span)
            | Expression::This(span)
            | Expression::List(_, span)
            | Expression::Map(_, span) => *span,
            Expression::Member(member) => member.name.span,
            Expression::Subscript(subscript) => subscript.object.span(),
            Expression::Call(call) => call.callee.span(),
            Expression::New(new) => new.class.span,
        }
    }

    pub fn identifier(text: impl Into<String>, span: Span) -> Expression {
        Expression::Identifier(Identifier::new(text, span))
    }

    pub fn call(callee: Expression, arguments: Vec<Expression>) -> Expression {
        Expression::Call(Box::new(CallExpression { callee, arguments }))
    }

    pub fn member(object: Expression, name: Identifier) -> Expression {
        Expression::Member(Box::new(MemberExpression { object, name }))
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
        Expression::Binary(Box::new(BinaryExpression {
            operator,
            left,
            right,
        }))
    }

    pub fn assign(target: Expression, value: Expression) -> Expression {
        Expression::Assignment(Box::new(AssignmentExpression {
            target,
            operator: None,
            value,
        }))
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Literal {
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// `target = value`, or `target op= value` when `operator` is set
#[derive(Clone, PartialEq, Debug)]
pub struct AssignmentExpression {
    pub target: Expression,
    pub operator: Option<BinaryOperator>,
    pub value: Expression,
}

/// `condition ? then : otherwise`
#[derive(Clone, PartialEq, Debug)]
pub struct ConditionalExpression {
    pub condition: Expression,
    pub then: Expression,
    pub otherwise: Expression,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Clone, PartialEq, Debug)]
pub struct LogicalExpression {
    pub operator: LogicalOperator,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    ShiftLeft,
    ShiftRight,
    ShiftRightUnsigned,
    BitAnd,
    BitOr,
    BitXor,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Is,
}

impl BinaryOperator {
    /// Symbol passed to the kernel's `evaluate`
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
            BinaryOperator::ShiftRightUnsigned => ">>>",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::Is => "is",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct BinaryExpression {
    pub operator: BinaryOperator,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
    BitNot,
}

impl UnaryOperator {
    /// Symbol passed to the kernel's `evaluate`
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Plus => "+",
            UnaryOperator::Minus => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Expression,
    pub span: Span,
}

/// `object.name`
#[derive(Clone, PartialEq, Debug)]
pub struct MemberExpression {
    pub object: Expression,
    pub name: Identifier,
}

/// `object[index]`
#[derive(Clone, PartialEq, Debug)]
pub struct SubscriptExpression {
    pub object: Expression,
    pub index: Expression,
}

#[derive(Clone, PartialEq, Debug)]
pub struct CallExpression {
    pub callee: Expression,
    pub arguments: Vec<Expression>,
}

/// `new Class(arguments)`
#[derive(Clone, PartialEq, Debug)]
pub struct NewExpression {
    pub class: Identifier,
    pub arguments: Vec<Expression>,
}
