use crate::storage::CredentialPair;

/// Result of one refresh exchange, shared by every caller waiting on it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RefreshOutcome {
    Renewed(CredentialPair),
    Failed,
    /// The session was cleared after the caller's request went out; never recorded.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}
