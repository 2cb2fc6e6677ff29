//! Helpers shared by the reqwest adapters.

use reqwest::StatusCode;

const PREVIEW_CHAR_LIMIT: usize = 160;

/// Whitespace-collapsed, length-capped view of a response body for logs and
/// error messages.
pub(crate) fn body_preview(body: &[u8]) -> String {
    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

/// `status N` or `status N: <preview>` when the body has content.
pub(crate) fn status_message(status: StatusCode, body: &[u8]) -> String {
    let preview = body_preview(body);
    if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), preview)
    }
}

/// Statuses that mean the upstream gave up waiting.
pub(crate) fn is_timeout_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn preview_collapses_whitespace() {
        assert_eq!(body_preview(b"  a \n\t b  "), "a b");
    }

    #[rstest]
    fn preview_is_capped() {
        let body = "x".repeat(PREVIEW_CHAR_LIMIT + 10);
        let preview = body_preview(body.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), PREVIEW_CHAR_LIMIT + 3);
    }

    #[rstest]
    #[case(b"".as_slice(), "status 502")]
    #[case(b"bad gateway".as_slice(), "status 502: bad gateway")]
    fn status_message_includes_preview(#[case] body: &[u8], #[case] expected: &str) {
        assert_eq!(status_message(StatusCode::BAD_GATEWAY, body), expected);
    }
}
