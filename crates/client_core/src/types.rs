use reqwest::multipart::Form;
use shared::protocol::ActionResult;

use crate::transport::DEFAULT_CSRF_COOKIE;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub csrf_cookie: String,
}

impl ClientSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_string(),
        }
    }
}

/// Ordered name/value pairs collected from a form, sent as multipart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    entries: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_multipart(&self) -> Form {
        self.entries
            .iter()
            .fold(Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            })
    }
}

#[derive(Debug, Clone)]
pub enum LoginResponse {
    /// The server rendered the authenticated page; the client should reload.
    Authenticated(String),
    Result(ActionResult),
}
