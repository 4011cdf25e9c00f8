//! Transfer error type for retry classification.

/// Error produced while opening or reading an HTTP transfer.
/// Kept as a typed error so we can classify and decide retries before
/// converting to a failure message.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Transport-level failure (connect, DNS, timeout, broken stream).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    /// HTTP response had a non-2xx status. Never retried.
    #[error("server error {0}")]
    Http(u16),
}
