//! reqwest-backed connection to a OneView appliance.
//!
//! Provides session login, API version headers and the 202-Accepted task
//! handshake used by asynchronous writes.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{Connection, TaskAndBody};
use crate::config::ClientConfig;
use crate::error::{OneViewError, Result};
use crate::tasks::model::TASKS_CATEGORY;
use crate::tasks::Task;

pub(crate) const LOGIN_SESSIONS_URI: &str = "/rest/login-sessions";
const AUTH_HEADER: &str = "auth";
const API_VERSION_HEADER: &str = "x-api-version";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user_name: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_login_domain: Option<String>,
}

impl Credentials {
    fn login_body(&self) -> Value {
        let mut body = json!({
            "userName": self.user_name,
            "password": self.password,
        });
        if let Some(domain) = &self.auth_login_domain {
            body["authLoginDomain"] = Value::String(domain.clone());
        }
        body
    }
}

pub struct HttpConnection {
    client: Client,
    base_url: Url,
    api_version: u32,
    session_id: RwLock<Option<String>>,
}

impl HttpConnection {
    /// Create a connection with timeouts taken from the configuration.
    /// Does not contact the appliance.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("oneview/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_version: config.api_version,
            session_id: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Open a login session and use its token on every following request.
    pub fn login(&self, credentials: &Credentials) -> Result<()> {
        let (_, body) = self.post(LOGIN_SESSIONS_URI, &credentials.login_body())?;
        let session_id = body
            .get("sessionID")
            .and_then(Value::as_str)
            .ok_or_else(|| OneViewError::Http {
                status: 401,
                message: "login response did not contain a sessionID".to_string(),
                error_code: None,
            })?;

        *self.session_id.write().unwrap_or_else(|e| e.into_inner()) =
            Some(session_id.to_string());
        debug!(user = %credentials.user_name, "logged in");
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        if self.session_id().is_none() {
            return Ok(());
        }
        self.delete(LOGIN_SESSIONS_URI)?;
        *self.session_id.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }

    fn url(&self, uri: &str) -> Result<Url> {
        Ok(self.base_url.join(uri)?)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_VERSION_HEADER, HeaderValue::from(self.api_version));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en_US"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(session_id) = self.session_id() {
            if let Ok(value) = HeaderValue::from_str(&session_id) {
                headers.insert(AUTH_HEADER, value);
            }
        }
        headers
    }

    fn send(&self, request: RequestBuilder) -> Result<(StatusCode, HeaderMap, Value)> {
        let response = request.headers(self.headers()).send()?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = read_body(response)?;

        if status.is_client_error() || status.is_server_error() {
            return Err(http_error(status, &body));
        }
        Ok((status, headers, body))
    }

    fn write(&self, request: RequestBuilder) -> Result<TaskAndBody> {
        let (status, headers, body) = self.send(request)?;
        let task = match accepted_task(status, &headers, &body) {
            Some(AcceptedTask::Location(location)) => Some(Task::from_value(self.get(location)?)?),
            Some(AcceptedTask::Body) => Some(Task::from_value(body.clone())?),
            None => None,
        };
        Ok((task, body))
    }
}

/// Where a write reply points at the task the appliance started.
#[derive(Debug, PartialEq, Eq)]
enum AcceptedTask<'a> {
    Location(&'a str),
    Body,
}

/// Only `202 Accepted` replies carry a task: behind the `Location` header,
/// or as the body itself when it is a task document.
fn accepted_task<'a>(
    status: StatusCode,
    headers: &'a HeaderMap,
    body: &Value,
) -> Option<AcceptedTask<'a>> {
    if status != StatusCode::ACCEPTED {
        return None;
    }
    if let Some(location) = headers.get(LOCATION).and_then(|v| v.to_str().ok()) {
        return Some(AcceptedTask::Location(location));
    }
    if body.get("category").and_then(Value::as_str) == Some(TASKS_CATEGORY) {
        return Some(AcceptedTask::Body);
    }
    None
}

impl Connection for HttpConnection {
    fn get(&self, uri: &str) -> Result<Value> {
        debug!(uri, "GET");
        let (_, _, body) = self.send(self.client.get(self.url(uri)?))?;
        Ok(body)
    }

    fn post(&self, uri: &str, body: &Value) -> Result<TaskAndBody> {
        debug!(uri, "POST");
        self.write(self.client.post(self.url(uri)?).json(body))
    }

    fn put(&self, uri: &str, body: &Value) -> Result<TaskAndBody> {
        debug!(uri, "PUT");
        self.write(self.client.put(self.url(uri)?).json(body))
    }

    fn delete(&self, uri: &str) -> Result<TaskAndBody> {
        debug!(uri, "DELETE");
        self.write(self.client.delete(self.url(uri)?))
    }
}

/// Read a JSON body; empty bodies become `null`.
fn read_body(response: Response) -> Result<Value> {
    let text = response.text()?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(text)),
    }
}

/// Build a descriptive error from a failed response's status and body.
fn http_error(status: StatusCode, body: &Value) -> OneViewError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });
    let error_code = body
        .get("errorCode")
        .and_then(Value::as_str)
        .map(str::to_string);

    OneViewError::Http {
        status: status.as_u16(),
        message,
        error_code,
    }
}
