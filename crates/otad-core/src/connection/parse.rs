//! Parse the total size out of a `Content-Range` header value.

/// Parse `bytes <start>-<end>/<total>` and return the total. Returns `None`
/// when the value is malformed or the total is `*` (unknown), so callers can
/// fall back to `downloaded + content_length`.
pub(crate) fn content_range_total(value: &str) -> Option<u64> {
    let rest = value.trim().strip_prefix("bytes ")?;
    let (_, total) = rest.split_once('/')?;
    total.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_total_from_resumed_range() {
        assert_eq!(content_range_total("bytes 400-999/1000"), Some(1000));
        assert_eq!(content_range_total("bytes 0-0/1"), Some(1));
    }

    #[test]
    fn unknown_total_is_none() {
        assert_eq!(content_range_total("bytes 400-999/*"), None);
    }

    #[test]
    fn malformed_values_are_none() {
        assert_eq!(content_range_total(""), None);
        assert_eq!(content_range_total("bytes"), None);
        assert_eq!(content_range_total("bytes 400-999"), None);
        assert_eq!(content_range_total("items 400-999/1000"), None);
        assert_eq!(content_range_total("bytes 400-999/abc"), None);
    }
}
