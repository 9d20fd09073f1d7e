//! WebDriver wire types
//!
//! Appium/Selendroid answer with either the legacy JSON wire protocol
//! (`{"sessionId", "status", "value"}`) or the W3C shape (`{"value"}` with an
//! `error` object on failure). Both are accepted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ElementRef, Locator};

/// Key holding the element id in W3C responses
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Key holding the element id in legacy responses
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Legacy status code for "no such element"
const STATUS_NO_SUCH_ELEMENT: i64 = 7;

/// Body of `POST /session`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionRequest {
    pub desired_capabilities: Map<String, Value>,
    pub capabilities: W3cCapabilities,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct W3cCapabilities {
    pub always_match: Map<String, Value>,
}

impl NewSessionRequest {
    pub fn new(capabilities: Map<String, Value>) -> Self {
        Self {
            desired_capabilities: capabilities.clone(),
            capabilities: W3cCapabilities {
                always_match: capabilities,
            },
        }
    }
}

/// Body of the element lookup commands
#[derive(Debug, Serialize)]
pub struct FindElementRequest<'a> {
    pub using: &'static str,
    pub value: &'a str,
}

impl<'a> From<&'a Locator> for FindElementRequest<'a> {
    fn from(locator: &'a Locator) -> Self {
        Self {
            using: locator.strategy(),
            value: locator.value(),
        }
    }
}

/// Body of `POST /session/{id}/orientation`
#[derive(Debug, Serialize)]
pub struct OrientationRequest {
    pub orientation: &'static str,
}

/// Any response from the server
#[derive(Debug, Deserialize)]
pub struct WireResponse {
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub value: Value,
}

/// A failed command as reported by the server
#[derive(Debug, Clone, PartialEq)]
pub struct WireFailure {
    pub status: Option<i64>,
    pub error: Option<String>,
    pub message: String,
}

impl WireFailure {
    pub fn is_no_such_element(&self) -> bool {
        self.status == Some(STATUS_NO_SUCH_ELEMENT) || self.error.as_deref() == Some("no such element")
    }
}

impl WireResponse {
    /// Split into the success value or the server-reported failure
    pub fn into_result(self) -> std::result::Result<Value, WireFailure> {
        let message = || {
            self.value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        if let Some(status) = self.status {
            if status != 0 {
                return Err(WireFailure {
                    status: Some(status),
                    error: None,
                    message: message().unwrap_or_else(|| format!("status {}", status)),
                });
            }
        }

        if let Some(error) = self.value.get("error").and_then(Value::as_str) {
            return Err(WireFailure {
                status: None,
                error: Some(error.to_string()),
                message: message().unwrap_or_else(|| error.to_string()),
            });
        }

        Ok(self.value)
    }

    /// Session id from either protocol dialect
    pub fn new_session_id(&self) -> Option<String> {
        self.session_id.clone().or_else(|| {
            self.value
                .get("sessionId")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
    }
}

/// Extract an element handle from a lookup result
pub fn element_ref(value: &Value) -> Option<ElementRef> {
    value
        .get(W3C_ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(|id| ElementRef(id.to_string()))
}

/// Extract granted capabilities from `GET /session/{id}` or `POST /session`
pub fn granted_capabilities(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(mut map) => match map.remove("capabilities") {
            Some(Value::Object(caps)) => caps,
            Some(other) => {
                map.insert("capabilities".to_string(), other);
                map
            }
            None => map,
        },
        _ => Map::new(),
    }
}

/// Interpret an attribute value; some servers return booleans for `checked`
pub fn attribute_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
