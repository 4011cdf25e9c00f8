//! Classify transport errors and HTTP statuses into retry policy error kinds.

use super::error::TransferError;
use super::policy::ErrorKind;

/// Classify a transport error for retry decisions.
pub fn classify_transport_error(e: &reqwest::Error) -> ErrorKind {
    if e.is_timeout() {
        return ErrorKind::Timeout;
    }
    if e.is_connect() {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify a transfer error into an ErrorKind. HTTP statuses are always
/// `Other`: the downloader surfaces them as attempt failures instead of
/// retrying at this layer.
pub fn classify(e: &TransferError) -> ErrorKind {
    match e {
        TransferError::Transport(te) => classify_transport_error(te),
        TransferError::Http(_) => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_statuses_are_never_retryable() {
        assert_eq!(classify(&TransferError::Http(404)), ErrorKind::Other);
        assert_eq!(classify(&TransferError::Http(500)), ErrorKind::Other);
        assert_eq!(classify(&TransferError::Http(503)), ErrorKind::Other);
    }
}
