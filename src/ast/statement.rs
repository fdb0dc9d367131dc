use super::{Block, Expression, Identifier, Span};

#[derive(Clone, PartialEq, Debug)]
pub enum Statement {
    Block(Block),
    Variable(VariableDeclaration),
    Expression(Expression),
    If(IfStatement),
    While(WhileStatement),
    For(ForStatement),
    Break(BreakStatement),
    Continue(ContinueStatement),
    Return(ReturnStatement),
    Throw(ThrowStatement),
    Try(TryStatement),
    Synchronize(SynchronizeStatement),
    With(WithStatement),
    Empty,
}

/// `var a = 1, b` (or `let` for constants)
#[derive(Clone, PartialEq, Debug)]
pub struct VariableDeclaration {
    pub constant: bool,
    pub declarators: Vec<VariableDeclarator>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct VariableDeclarator {
    pub name: Identifier,
    pub initializer: Option<Expression>,
}

/// `if` clause, any number of `else if` clauses, and an optional `else`
#[derive(Clone, PartialEq, Debug)]
pub struct IfStatement {
    /// The `if` clause followed by the `else if` clauses
    pub clauses: Vec<IfClause>,
    pub else_clause: Option<Block>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct IfClause {
    pub condition: Expression,
    pub body: Block,
}

#[derive(Clone, PartialEq, Debug)]
pub struct WhileStatement {
    pub label: Option<Identifier>,
    pub condition: Expression,
    pub body: Block,
}

/// `for (variable : iterable) body`
#[derive(Clone, PartialEq, Debug)]
pub struct ForStatement {
    pub label: Option<Identifier>,

    /// Loop variable, resolved in the scope of the body
    pub variable: Identifier,
    pub iterable: Expression,
    pub body: Block,
}

#[derive(Clone, PartialEq, Debug)]
pub struct BreakStatement {
    pub label: Option<Identifier>,
    pub span: Span,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ContinueStatement {
    pub label: Option<Identifier>,
    pub span: Span,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub span: Span,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ThrowStatement {
    pub exception: Expression,
    pub span: Span,
}

#[derive(Clone, PartialEq, Debug)]
pub struct TryStatement {
    pub body: Block,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Block>,
}

/// `catch (A | B e) body`
#[derive(Clone, PartialEq, Debug)]
pub struct CatchClause {
    /// Exception classes caught (empty catches anything)
    pub filters: Vec<Identifier>,

    /// Exception variable, resolved in the scope of the body
    pub parameter: Identifier,
    pub body: Block,
}

#[derive(Clone, PartialEq, Debug)]
pub struct SynchronizeStatement {
    pub lock: Expression,
    pub body: Block,
}

/// `with (r1, x = r2) body`
#[derive(Clone, PartialEq, Debug)]
pub struct WithStatement {
    pub resources: Vec<WithResource>,
    pub body: Block,
}

#[derive(Clone, PartialEq, Debug)]
pub struct WithResource {
    /// Variable the resource is also stored in, resolved in the scope of the body
    pub binding: Option<Identifier>,
    pub expression: Expression,
}
