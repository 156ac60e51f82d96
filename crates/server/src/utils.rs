use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::state::ErrorResponse;

pub fn json_error(
    status: StatusCode,
    message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn json_error_response(status: StatusCode, message: impl Into<String>) -> Response {
    json_error(status, message).into_response()
}

/// `attachment; filename="..."` with quotes, backslashes and control characters
/// replaced so the value stays a single well-formed header.
pub fn attachment_disposition(file_name: &str) -> HeaderValue {
    let mut safe = String::with_capacity(file_name.len());
    for ch in file_name.chars() {
        match ch {
            '"' | '\\' | '/' => safe.push('_'),
            c if c.is_control() => safe.push('_'),
            c => safe.push(c),
        }
    }
    let trimmed = safe.trim();
    let name = if trimmed.is_empty() { "download" } else { trimmed };
    let value = format!("attachment; filename=\"{}\"", name);
    HeaderValue::from_bytes(value.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Path ids are numeric; anything else can never name a row.
pub fn parse_id(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::{attachment_disposition, parse_id};

    #[test]
    fn disposition_quotes_file_name() {
        assert_eq!(
            attachment_disposition("Dawn.zip"),
            "attachment; filename=\"Dawn.zip\""
        );
        assert_eq!(
            attachment_disposition("Say \"Hi\"/B\\side\n.zip"),
            "attachment; filename=\"Say _Hi__B_side_.zip\""
        );
        assert_eq!(
            attachment_disposition("  "),
            "attachment; filename=\"download\""
        );
    }

    #[test]
    fn disposition_keeps_unicode_names() {
        let value = attachment_disposition("Café.zip");
        assert_eq!(
            value.as_bytes(),
            "attachment; filename=\"Café.zip\"".as_bytes()
        );
    }

    #[test]
    fn parses_numeric_ids_only() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id(" 7 "), Some(7));
        assert_eq!(parse_id("abc"), None);
        assert_eq!(parse_id(""), None);
    }
}
