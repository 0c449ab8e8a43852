//! Response discrimination and cookie helpers.

use reqwest::header::HeaderValue;

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
    Other,
}

impl ContentKind {
    pub fn classify(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return Self::Other;
        };
        let lower = content_type.to_ascii_lowercase();
        if lower.contains("text/html") {
            Self::Html
        } else if lower.contains("json") {
            Self::Json
        } else {
            Self::Other
        }
    }

    pub fn from_header(value: Option<&HeaderValue>) -> Self {
        Self::classify(value.and_then(|v| v.to_str().ok()))
    }
}

/// Finds `name` in a `Cookie` header line (`a=1; b=2`).
pub fn cookie_value(cookie_line: &str, name: &str) -> Option<String> {
    cookie_line
        .split(';')
        .map(str::trim)
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}
