use std::{fs, path::Path};

use anyhow::Context;
use client_core::{transport::DEFAULT_CSRF_COOKIE, ClientSettings};
use serde::Deserialize;
use view_core::FlowSettings;

pub const DEFAULT_CONFIG_FILE: &str = "cantina.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub csrf_cookie: String,
    pub eager_availcheck_listeners: bool,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/".into(),
            csrf_cookie: DEFAULT_CSRF_COOKIE.into(),
            eager_availcheck_listeners: false,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn client(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.base_url.clone(),
            csrf_cookie: self.csrf_cookie.clone(),
        }
    }

    pub fn flows(&self) -> FlowSettings {
        FlowSettings {
            eager_availcheck_listeners: self.eager_availcheck_listeners,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    csrf_cookie: Option<String>,
    eager_availcheck_listeners: Option<bool>,
    log_filter: Option<String>,
}

/// Defaults, then the config file, then the process environment.
///
/// An explicitly named file must exist; the default `cantina.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let raw = match path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

pub(crate) fn settings_from(
    raw: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(raw) = raw {
        let file_cfg: FileSettings = toml::from_str(raw).context("parsing config file")?;
        if let Some(v) = file_cfg.base_url {
            settings.base_url = v;
        }
        if let Some(v) = file_cfg.csrf_cookie {
            settings.csrf_cookie = v;
        }
        if let Some(v) = file_cfg.eager_availcheck_listeners {
            settings.eager_availcheck_listeners = v;
        }
        if let Some(v) = file_cfg.log_filter {
            settings.log_filter = v;
        }
    }

    if let Some(v) = env("CANTINA_BASE_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("APP__CSRF_COOKIE") {
        settings.csrf_cookie = v;
    }

    if let Some(v) = env("APP__EAGER_AVAILCHECK_LISTENERS") {
        if let Some(parsed) = parse_flag(&v) {
            settings.eager_availcheck_listeners = parsed;
        }
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    Ok(settings)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
