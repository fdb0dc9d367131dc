use crate::ast::Span;
use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Severity {
    Warning,
    Error,
}

/// Problems with the source program noticed during generation
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DiagnosticKind {
    /// Name which the resolver could not bind
    UnresolvedSymbol,
    BreakOutsideLoop,
    ContinueOutsideLoop,

    /// `break`/`continue` naming a label which no enclosing loop carries
    UnknownLoopLabel,

    /// Overloaded function used as a value, so no single signature can be picked
    OverloadedFunctionReference,

    /// Call whose argument count matches no overload
    NoMatchingOverload,
    InvalidAssignmentTarget,
    AssignmentToConstant,

    /// `this`, an instance field, or an instance function used from a static context
    InstanceReferenceFromStatic,

    /// Catch filter which does not name a class
    MalformedCatchFilter,

    /// `return value` inside an initializer (the value is discarded)
    ReturnValueFromInitializer,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::ReturnValueFromInitializer => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity() {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", self.span, severity, self.message)
    }
}

/// Sink collecting every diagnostic reported during generation
///
/// Each diagnostic is also logged as soon as it is reported.
#[derive(Debug, Default)]
pub struct Diagnostics {
    reported: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn report(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            span,
            message: message.into(),
        };
        match diagnostic.severity() {
            Severity::Warning => log::warn!("{}", diagnostic),
            Severity::Error => log::error!("{}", diagnostic),
        }
        self.reported.push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.reported
            .iter()
            .filter(|diagnostic| diagnostic.severity() == Severity::Error)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.reported.iter()
    }

    pub fn len(&self) -> usize {
        self.reported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }
}
