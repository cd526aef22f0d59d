//! Errors returned by store operations.

#[derive(Debug)]
pub enum StoreError {
    /// A search is already in flight and the caller asked not to wait.
    Busy,
    /// The search service failed. The store kept its previous results.
    Service(anyhow::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "A search is already in progress"),
            Self::Service(err) => write!(f, "Search failed: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Busy => None,
            Self::Service(err) => Some(err.as_ref()),
        }
    }
}
