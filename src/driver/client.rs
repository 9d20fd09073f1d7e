//! WebDriver client for Appium/Selendroid
//!
//! Issues the handful of HTTP commands the scenarios need and maps server
//! failures onto the crate error kinds.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::common::config::ServerConfig;
use crate::common::{Error, Result};

use super::protocol::{
    self, FindElementRequest, NewSessionRequest, OrientationRequest, WireFailure, WireResponse,
};
use super::{DeviceConnector, DeviceSession, ElementRef, Locator, Orientation, SessionCapabilities};

/// Shared HTTP plumbing for the connector and its sessions
#[derive(Debug, Clone)]
struct Endpoint {
    http: reqwest::Client,
    base_url: String,
}

impl Endpoint {
    fn new(server: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(server.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: server.url.trim_end_matches('/').to_string(),
        })
    }

    /// Send one command and decode the response envelope
    ///
    /// Transport failures are errors here; failures reported by the server
    /// are left in the envelope for the caller to interpret.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<WireResponse> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("WebDriver >>> {} {}", method, url);

        let mut request = self.http.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("WebDriver <<< {} {}", status, text);

        serde_json::from_str(&text).map_err(|e| {
            Error::driver(
                &format!("{} {}", method, path),
                &format!("HTTP {} with unreadable body ({}): {}", status, e, text),
            )
        })
    }

    async fn status(&self) -> Result<Value> {
        self.send::<()>(Method::GET, "/status", None)
            .await?
            .into_result()
            .map_err(|f| Error::driver("status", &f.message))
    }
}

/// Opens sessions against a WebDriver endpoint
#[derive(Debug, Clone)]
pub struct WebDriverConnector {
    endpoint: Endpoint,
}

impl WebDriverConnector {
    pub fn new(server: &ServerConfig) -> Result<Self> {
        Ok(Self {
            endpoint: Endpoint::new(server)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.endpoint.base_url
    }

    /// Query `GET /status` on the server
    pub async fn server_status(&self) -> Result<Value> {
        self.endpoint.status().await.map_err(|e| match e {
            Error::Http(e) if e.is_connect() => Error::Session(format!(
                "Automation server unreachable at {}: {}",
                self.endpoint.base_url, e
            )),
            other => other,
        })
    }

    /// Open a session and return the concrete type
    pub async fn connect(&self, capabilities: &SessionCapabilities) -> Result<WebDriverSession> {
        let body = NewSessionRequest::new(capabilities.to_json());

        tracing::info!(
            "Opening session on {} for {} ({})",
            self.endpoint.base_url,
            capabilities.device_name,
            capabilities.app_package
        );

        let wire = self
            .endpoint
            .send(Method::POST, "/session", Some(&body))
            .await
            .map_err(|e| match e {
                Error::Http(e) => Error::Session(format!(
                    "Automation server unreachable at {}: {}",
                    self.endpoint.base_url, e
                )),
                other => Error::Session(other.to_string()),
            })?;

        let session_id = wire.new_session_id();
        let value = wire.into_result().map_err(|f| {
            Error::Session(format!("Application failed to launch: {}", f.message))
        })?;
        let session_id = session_id
            .ok_or_else(|| Error::Session("Server did not return a session id".to_string()))?;

        tracing::info!("Session {} opened", session_id);

        Ok(WebDriverSession {
            endpoint: self.endpoint.clone(),
            session_id,
            granted: protocol::granted_capabilities(value),
            closed: false,
        })
    }
}

#[async_trait]
impl DeviceConnector for WebDriverConnector {
    async fn open(&self, capabilities: &SessionCapabilities) -> Result<Box<dyn DeviceSession>> {
        Ok(Box::new(self.connect(capabilities).await?))
    }
}

/// One live WebDriver session
#[derive(Debug)]
pub struct WebDriverSession {
    endpoint: Endpoint,
    session_id: String,
    /// Capabilities returned by `POST /session`
    granted: Map<String, Value>,
    closed: bool,
}

impl WebDriverSession {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.session_id, suffix)
    }

    async fn command<B: Serialize + ?Sized>(
        &self,
        name: &str,
        method: Method,
        suffix: &str,
        body: Option<&B>,
    ) -> Result<std::result::Result<Value, WireFailure>> {
        if self.closed {
            return Err(Error::Session(format!("Session {} is already closed", self.session_id)));
        }
        let result = self
            .endpoint
            .send(method, &self.path(suffix), body)
            .await?
            .into_result();
        if let Err(failure) = &result {
            tracing::debug!("WebDriver command '{}' failed: {:?}", name, failure);
        }
        Ok(result)
    }

    async fn find(&self, suffix: &str, locator: &Locator) -> Result<ElementRef> {
        let body = FindElementRequest::from(locator);
        let value = self
            .command("find element", Method::POST, suffix, Some(&body))
            .await?
            .map_err(|f| {
                if f.is_no_such_element() {
                    Error::element_not_found(locator)
                } else {
                    Error::driver("find element", &f.message)
                }
            })?;

        protocol::element_ref(&value).ok_or_else(|| {
            Error::driver("find element", &format!("no element reference in response: {}", value))
        })
    }
}

#[async_trait]
impl DeviceSession for WebDriverSession {
    async fn find_element(&mut self, locator: &Locator) -> Result<ElementRef> {
        self.find("/element", locator).await
    }

    async fn find_child(&mut self, parent: &ElementRef, locator: &Locator) -> Result<ElementRef> {
        self.find(&format!("/element/{}/element", parent.as_str()), locator)
            .await
    }

    async fn click(&mut self, element: &ElementRef) -> Result<()> {
        self.command(
            "click",
            Method::POST,
            &format!("/element/{}/click", element.as_str()),
            Some(&Value::Object(Map::new())),
        )
        .await?
        .map_err(|f| Error::driver("click", &f.message))?;
        Ok(())
    }

    async fn attribute(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>> {
        let value = self
            .command::<()>(
                "get attribute",
                Method::GET,
                &format!("/element/{}/attribute/{}", element.as_str(), name),
                None,
            )
            .await?
            .map_err(|f| Error::driver("get attribute", &f.message))?;
        Ok(protocol::attribute_text(value))
    }

    async fn rotate(&mut self, orientation: Orientation) -> Result<()> {
        let body = OrientationRequest {
            orientation: orientation.as_wire(),
        };
        self.command("rotate", Method::POST, "/orientation", Some(&body))
            .await?
            .map_err(|f| Error::driver("rotate", &f.message))?;
        tracing::debug!("Rotated to {}", orientation);
        Ok(())
    }

    async fn capabilities(&mut self) -> Result<Map<String, Value>> {
        let result = self
            .command::<()>("get session", Method::GET, "", None)
            .await?;
        match result {
            Ok(value) => Ok(protocol::granted_capabilities(value)),
            // Servers without GET /session/{id}: fall back to what was granted
            Err(failure) => {
                tracing::debug!("GET session failed ({}), using granted capabilities", failure.message);
                Ok(self.granted.clone())
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.command::<()>("delete session", Method::DELETE, "", None).await;
        self.closed = true;

        match result {
            Ok(Ok(_)) => {
                tracing::info!("Session {} closed", self.session_id);
                Ok(())
            }
            Ok(Err(f)) => Err(Error::Session(format!(
                "Failed to close session {}: {}",
                self.session_id, f.message
            ))),
            Err(e) => Err(Error::Session(format!(
                "Failed to close session {}: {}",
                self.session_id, e
            ))),
        }
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if !self.closed {
            tracing::warn!("Session {} dropped without being closed", self.session_id);
        }
    }
}
