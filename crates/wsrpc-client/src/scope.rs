//! Subscription scopes.
//!
//! A scope groups handler registrations (and pending calls) that belong to
//! one consumer, e.g. one UI view. Revoking the scope silences all of them
//! at once without touching anybody else's registrations.

use std::collections::HashSet;
use std::fmt;

/// Opaque scope identifier of the form `prefix-N`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(String);

impl ScopeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues scope identifiers and tracks which are still active.
///
/// The counter is never reset, so a revoked id string is never issued again.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    counter: u64,
    active: HashSet<ScopeId>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh scope and mark it active
    pub fn new_scope(&mut self, prefix: &str) -> ScopeId {
        let scope = ScopeId(format!("{}-{}", prefix, self.counter));
        self.counter += 1;
        self.active.insert(scope.clone());
        scope
    }

    /// Deactivate a scope. Unknown or already revoked scopes are ignored.
    pub fn revoke(&mut self, scope: &ScopeId) {
        self.active.remove(scope);
    }

    /// `None` is the global scope and is always active
    pub fn is_active(&self, scope: Option<&ScopeId>) -> bool {
        match scope {
            None => true,
            Some(scope) => self.active.contains(scope),
        }
    }

    /// Revoke every scope
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Number of currently active scopes
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
