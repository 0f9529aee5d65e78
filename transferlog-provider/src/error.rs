/// Coarse classification of provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The wallet or network declined a request, or the input was malformed.
    UserOrNetworkRejection,
    /// A read-only contract query failed; cached state is unchanged.
    ReadFailure,
    /// Another send is still in flight.
    SendInProgress,
}

/// Errors returned by [`crate::WalletTransactionProvider`].
///
/// A missing wallet is not an error: the provider shows a notice and the
/// operation returns `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("wallet unavailable")]
    WalletUnavailable(#[source] anyhow::Error),
    #[error("failed to read from the transactions contract")]
    ReadFailure(#[source] anyhow::Error),
    #[error("a transaction is already being sent")]
    SendInProgress,
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::WalletUnavailable(_) => ErrorKind::UserOrNetworkRejection,
            ProviderError::ReadFailure(_) => ErrorKind::ReadFailure,
            ProviderError::SendInProgress => ErrorKind::SendInProgress,
        }
    }
}
