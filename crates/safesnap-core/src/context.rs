//! Per-call execution context.

use crate::crypto::Principal;

/// Identity of the principal issuing a call.
///
/// Supplied by the host for every call and trusted by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Principal,
}

impl CallContext {
    /// Build a context for the given caller.
    pub const fn new(caller: Principal) -> Self {
        Self { caller }
    }

    /// Whether the caller is `principal`.
    pub fn is(&self, principal: &Principal) -> bool {
        &self.caller == principal
    }
}

impl From<Principal> for CallContext {
    fn from(caller: Principal) -> Self {
        Self::new(caller)
    }
}
