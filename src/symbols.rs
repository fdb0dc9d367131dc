//! Resolved scopes and symbols
//!
//! The resolver that fills this in runs before generation; the generator only queries it. Local
//! slots are assigned by the resolver too: each function scope records how many slots its
//! parameters (and `this`, for instance functions) and declared locals occupy, and the generator
//! allocates its own private slots above that.

use crate::feb::BinaryName;
use std::collections::HashMap;

/// Handle to a scope in a [`SymbolTable`]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(usize);

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ScopeKind {
    /// Top-level scope of a compilation unit
    Unit,

    Class {
        qualified_name: BinaryName,
    },

    Function {
        is_static: bool,

        /// Slots used by `this`, the parameters, and every local declared in the function
        local_variable_count: u16,
    },

    /// Block, loop body, catch clause, etc.
    Local,
}

/// Where the value of a variable lives
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Storage {
    /// Slot in the function's local variables
    Local(u16),

    Field { class: BinaryName, is_static: bool },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VariableSymbol {
    pub storage: Storage,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FunctionSymbol {
    /// Entity declaring the function
    pub class: BinaryName,
    pub is_static: bool,

    /// Parameter count of every overload
    pub parameter_counts: Vec<usize>,
}

impl FunctionSymbol {
    pub fn is_overloaded(&self) -> bool {
        self.parameter_counts.len() > 1
    }

    pub fn accepts(&self, arity: usize) -> bool {
        self.parameter_counts.contains(&arity)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ClassSymbol {
    pub qualified_name: BinaryName,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Symbol {
    Variable(VariableSymbol),
    Constant(VariableSymbol),
    Function(FunctionSymbol),
    Class(ClassSymbol),
}

impl Symbol {
    pub fn local(slot: u16) -> Symbol {
        Symbol::Variable(VariableSymbol {
            storage: Storage::Local(slot),
        })
    }

    pub fn field(class: BinaryName, is_static: bool) -> Symbol {
        Symbol::Variable(VariableSymbol {
            storage: Storage::Field { class, is_static },
        })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Symbol::Variable(_))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Symbol::Constant(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Function(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Symbol::Class(_))
    }

    /// Static members (and classes) don't need a receiver
    pub fn is_static(&self) -> bool {
        match self {
            Symbol::Variable(variable) | Symbol::Constant(variable) => match variable.storage {
                Storage::Local(_) => false,
                Storage::Field { is_static, .. } => is_static,
            },
            Symbol::Function(function) => function.is_static,
            Symbol::Class(_) => true,
        }
    }
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

/// Tree of scopes produced by name resolution
#[derive(Debug, Default)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    pub fn add_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent,
            symbols: HashMap::new(),
        });
        id
    }

    /// Define a name in a scope, returning whatever was previously defined there
    pub fn define(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        symbol: Symbol,
    ) -> Option<Symbol> {
        self.scopes[scope.0].symbols.insert(name.into(), symbol)
    }

    pub fn kind(&self, scope: ScopeId) -> &ScopeKind {
        &self.scopes[scope.0].kind
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Scopes from `scope` outwards to the root
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), move |scope| self.parent(*scope))
    }

    /// Look a name up in `scope` and then in each enclosing scope
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.ancestors(scope)
            .find_map(|scope| self.scopes[scope.0].symbols.get(name))
    }

    /// Name of the closest enclosing class
    pub fn enclosing_class(&self, scope: ScopeId) -> Option<&BinaryName> {
        self.ancestors(scope)
            .find_map(|scope| match &self.scopes[scope.0].kind {
                ScopeKind::Class { qualified_name } => Some(qualified_name),
                _ => None,
            })
    }

    /// Closest enclosing function scope
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<ScopeId> {
        self.ancestors(scope)
            .find(|scope| matches!(self.scopes[scope.0].kind, ScopeKind::Function { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_walks_outwards() {
        let mut table = SymbolTable::new();
        let unit = table.add_scope(ScopeKind::Unit, None);
        let class = table.add_scope(
            ScopeKind::Class {
                qualified_name: BinaryName::OBJECT,
            },
            Some(unit),
        );
        let function = table.add_scope(
            ScopeKind::Function {
                is_static: false,
                local_variable_count: 2,
            },
            Some(class),
        );
        let block = table.add_scope(ScopeKind::Local, Some(function));

        table.define(class, "x", Symbol::field(BinaryName::OBJECT, false));
        table.define(function, "x", Symbol::local(1));

        assert_eq!(table.resolve(block, "x"), Some(&Symbol::local(1)));
        assert!(!table.resolve(class, "x").unwrap().is_static());
        assert_eq!(table.resolve(block, "y"), None);
        assert_eq!(table.enclosing_function(block), Some(function));
        assert_eq!(table.enclosing_class(block), Some(&BinaryName::OBJECT));
        assert_eq!(table.enclosing_function(class), None);
    }

    #[test]
    fn symbol_queries() {
        let function = Symbol::Function(FunctionSymbol {
            class: BinaryName::OBJECT,
            is_static: true,
            parameter_counts: vec![0, 1],
        });
        assert!(function.is_function() && function.is_static());
        assert!(!function.is_variable() && !function.is_class());
        assert!(Symbol::Class(ClassSymbol {
            qualified_name: BinaryName::LIST
        })
        .is_class());
    }
}
