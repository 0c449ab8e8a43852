use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    cookie::{CookieStore, Jar},
    header::CONTENT_TYPE,
    Client, StatusCode, Url,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{AvailCheckId, UserId, UserRef},
    protocol::{
        ActionResult, AvailCheckRecord, ProfileResponse, StandinRegFormResponse,
        UserRegFormResponse,
    },
};
use tracing::{debug, warn};

pub mod error;
pub mod transport;
pub mod types;

pub use error::ClientError;
pub use transport::ContentKind;
pub use types::{ClientSettings, FormData, LoginResponse};

use transport::{cookie_value, CSRF_HEADER};

pub type Result<T> = std::result::Result<T, ClientError>;

/// Backend endpoints the view layer consumes.
#[async_trait]
pub trait CantinaBackend: Send + Sync {
    async fn fetch_page(&self) -> Result<String>;
    async fn register_user_form(&self) -> Result<UserRegFormResponse>;
    async fn submit_register_user(&self, form: &FormData) -> Result<ActionResult<UserRef>>;
    async fn register_standin_form(&self, user_id: UserId) -> Result<StandinRegFormResponse>;
    async fn submit_register_standin(
        &self,
        user_id: UserId,
        form: &FormData,
    ) -> Result<ActionResult>;
    async fn login(&self, form: &FormData) -> Result<LoginResponse>;
    async fn profile(&self) -> Result<ProfileResponse>;
    async fn update_profile(&self, form: &FormData) -> Result<ActionResult>;
    async fn availchecks(&self, user_id: UserId) -> Result<Vec<AvailCheckRecord>>;
    async fn accept_availcheck(&self, id: AvailCheckId) -> Result<serde_json::Value>;
}

struct RawResponse {
    path: String,
    status: StatusCode,
    kind: ContentKind,
    content_type: String,
    body: String,
}

pub struct CantinaClient {
    http: Client,
    base_url: Url,
    cookies: Arc<Jar>,
    csrf_cookie: String,
}

impl CantinaClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let base_url = normalize_base_url(&settings.base_url)?;
        let cookies = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .build()?;
        Ok(Self {
            http,
            base_url,
            cookies,
            csrf_cookie: settings.csrf_cookie,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Current CSRF token from the cookie store.
    pub fn csrf_token(&self) -> Result<String> {
        self.cookies
            .cookies(&self.base_url)
            .and_then(|line| {
                line.to_str()
                    .ok()
                    .and_then(|line| cookie_value(line, &self.csrf_cookie))
            })
            .ok_or_else(|| ClientError::MissingCsrfToken {
                cookie: self.csrf_cookie.clone(),
            })
    }

    async fn get_raw(&self, path: &str) -> Result<RawResponse> {
        debug!(path, "GET");
        let res = self
            .http
            .get(self.endpoint(path)?)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        read_raw(path, res).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let raw = self.get_raw(path).await?;
        if !raw.status.is_success() {
            warn!(path, status = raw.status.as_u16(), "GET failed");
            return Err(ClientError::Status {
                method: "GET",
                path: raw.path,
                status: raw.status.as_u16(),
            });
        }
        decode(&raw)
    }

    async fn post_form(&self, path: &str, form: &FormData) -> Result<RawResponse> {
        let token = self.csrf_token()?;
        debug!(path, fields = form.entries().len(), "POST");
        let res = self
            .http
            .post(self.endpoint(path)?)
            .header(CSRF_HEADER, token)
            .multipart(form.to_multipart())
            .send()
            .await?;
        read_raw(path, res).await
    }

    async fn post_action<E: DeserializeOwned>(
        &self,
        path: &str,
        form: &FormData,
    ) -> Result<ActionResult<E>> {
        let raw = self.post_form(path, form).await?;
        action_result(raw)
    }
}

#[async_trait]
impl CantinaBackend for CantinaClient {
    async fn fetch_page(&self) -> Result<String> {
        let raw = self.get_raw("").await?;
        if !raw.status.is_success() {
            return Err(ClientError::Status {
                method: "GET",
                path: raw.path,
                status: raw.status.as_u16(),
            });
        }
        Ok(raw.body)
    }

    async fn register_user_form(&self) -> Result<UserRegFormResponse> {
        self.get_json("register_user").await
    }

    async fn submit_register_user(&self, form: &FormData) -> Result<ActionResult<UserRef>> {
        self.post_action("register_user", form).await
    }

    async fn register_standin_form(&self, user_id: UserId) -> Result<StandinRegFormResponse> {
        self.get_json(&format!("register_standin/{user_id}")).await
    }

    async fn submit_register_standin(
        &self,
        user_id: UserId,
        form: &FormData,
    ) -> Result<ActionResult> {
        self.post_action(&format!("register_standin/{user_id}/"), form)
            .await
    }

    async fn login(&self, form: &FormData) -> Result<LoginResponse> {
        let raw = self.post_form("login", form).await?;
        match raw.kind {
            ContentKind::Html => Ok(LoginResponse::Authenticated(raw.body)),
            _ => action_result(raw).map(LoginResponse::Result),
        }
    }

    async fn profile(&self) -> Result<ProfileResponse> {
        self.get_json("profile").await
    }

    async fn update_profile(&self, form: &FormData) -> Result<ActionResult> {
        self.post_action("profile", form).await
    }

    async fn availchecks(&self, user_id: UserId) -> Result<Vec<AvailCheckRecord>> {
        self.get_json(&format!("load_availchecks/{user_id}")).await
    }

    async fn accept_availcheck(&self, id: AvailCheckId) -> Result<serde_json::Value> {
        self.get_json(&format!("accept_availcheck/{id}")).await
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut base = raw.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(Url::parse(&base)?)
}

async fn read_raw(path: &str, res: reqwest::Response) -> Result<RawResponse> {
    let status = res.status();
    let kind = ContentKind::from_header(res.headers().get(CONTENT_TYPE));
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = res.text().await?;
    Ok(RawResponse {
        path: path.to_string(),
        status,
        kind,
        content_type,
        body,
    })
}

fn decode<T: DeserializeOwned>(raw: &RawResponse) -> Result<T> {
    serde_json::from_str(&raw.body).map_err(|source| ClientError::Decode {
        path: raw.path.clone(),
        source,
    })
}

/// JSON bodies are decoded whatever the status code; Django reports form errors that way.
fn action_result<E: DeserializeOwned>(raw: RawResponse) -> Result<ActionResult<E>> {
    match raw.kind {
        ContentKind::Json => decode(&raw),
        _ if !raw.status.is_success() => Err(ClientError::Status {
            method: "POST",
            path: raw.path,
            status: raw.status.as_u16(),
        }),
        _ => Err(ClientError::UnexpectedContentType {
            path: raw.path,
            content_type: raw.content_type,
        }),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
