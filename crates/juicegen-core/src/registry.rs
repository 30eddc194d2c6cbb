use std::collections::BTreeMap;

use crate::diagnostics::Diagnostic;
use crate::model::Statement;

/// Resolves `namespace.method` keys to statements.
pub trait StatementRegistry {
    fn lookup(&self, key: &str) -> Result<&Statement, Diagnostic>;
}

/// Statements held in memory, keyed by `namespace.id`.
#[derive(Debug, Clone, Default)]
pub struct StatementSet {
    statements: BTreeMap<String, Statement>,
}

impl StatementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, statement: Statement) -> Result<(), Diagnostic> {
        if self.statements.contains_key(&statement.key) {
            return Err(Diagnostic::config(format!(
                "duplicate statement: {}",
                statement.key
            )));
        }
        self.statements.insert(statement.key.clone(), statement);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Statement> {
        self.statements.values_mut()
    }
}

impl FromIterator<Statement> for StatementSet {
    /// Later statements replace earlier ones with the same key.
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        let mut set = StatementSet::new();
        for s in iter {
            set.statements.insert(s.key.clone(), s);
        }
        set
    }
}

impl StatementRegistry for StatementSet {
    fn lookup(&self, key: &str) -> Result<&Statement, Diagnostic> {
        self.statements
            .get(key)
            .ok_or_else(|| Diagnostic::lookup(format!("statement not found: {key}")))
    }
}
