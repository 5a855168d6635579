//! Maps HTTP failures onto [`RemoteError`] once, at the API boundary.

use crate::application::ports::remote_api::RemoteError;
use serde_json::Value;

const USAGE_LIMIT_MARKERS: [&str; 5] = [
    "usage limit",
    "limit reached",
    "quota exceeded",
    "upgrade your plan",
    "usage_limit",
];

const MAX_MESSAGE_LEN: usize = 300;

/// Classifies a non-success response.
///
/// Order matters: auth and missing targets win over body sniffing, usage
/// limits win over the generic 4xx/5xx split, and an HTML body (a proxy or
/// load balancer error page) is always transient.
pub fn classify_failure(status: u16, body: &str) -> RemoteError {
    let message = extract_message(status, body);
    match status {
        401 => RemoteError::Unauthorized(message),
        404 => RemoteError::NotFound(message),
        _ if is_usage_limit(status, body) => RemoteError::UsageLimit(message),
        _ if looks_like_html(body) => {
            RemoteError::Transient(format!("HTTP {status} from an intermediary"))
        }
        408 | 429 | 500..=599 => RemoteError::Transient(message),
        _ => RemoteError::Permanent(message),
    }
}

/// Classifies a non-success response from object storage behind a presigned
/// URL. Storage speaks for the bucket, never for the project or the session,
/// so it never yields `NotFound` or `Unauthorized`.
pub fn classify_storage_failure(status: u16, body: &str) -> RemoteError {
    let message = format!("storage rejected upload: {}", extract_message(status, body));
    match status {
        408 | 429 | 500..=599 => RemoteError::Transient(message),
        _ if looks_like_html(body) => RemoteError::Transient(message),
        _ => RemoteError::Permanent(message),
    }
}

/// Connection, timeout and TLS failures never reached the backend.
pub fn transport_failure(err: reqwest::Error) -> RemoteError {
    RemoteError::Transient(err.to_string())
}

fn is_usage_limit(status: u16, body: &str) -> bool {
    if status == 402 {
        return true;
    }
    let lower = body.to_ascii_lowercase();
    USAGE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start();
    let lower = head.get(..64).unwrap_or(head).to_ascii_lowercase();
    lower.starts_with("<!doctype html") || lower.starts_with("<html")
}

fn extract_message(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for field in ["detail", "message", "error"] {
            if let Some(Value::String(text)) = map.get(field)
                && !text.trim().is_empty()
            {
                return truncate(text.trim());
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || looks_like_html(trimmed) {
        format!("HTTP {status}")
    } else {
        truncate(trimmed)
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
