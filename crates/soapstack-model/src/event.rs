//! Inbound event and outbound response shapes.
//!
//! Both follow the API-Gateway proxy integration format so the handler can
//! sit directly behind a FaaS trigger.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content type carried by every response.
pub const CONTENT_TYPE: &str = "application/xml";

/// An HTTP-like request event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoapEvent {
    /// Request path, e.g. `/prod/calculator`.
    pub path: String,
    /// HTTP verb, e.g. `GET` or `POST`.
    pub http_method: String,
    /// Query string parameters, absent when the URL has no query.
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    /// Request headers.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    /// Raw request body.
    #[serde(default)]
    pub body: Option<String>,
    /// Whether `body` is base64-encoded.
    #[serde(default)]
    pub is_base64_encoded: bool,
    /// Fields not modelled above, such as `requestContext`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SoapEvent {
    /// Create an event with the given method and path.
    #[must_use]
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            http_method: http_method.into(),
            ..Self::default()
        }
    }

    /// Set a query string parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The service name addressed by this event.
    ///
    /// This is the last segment of the path once a single trailing slash is
    /// stripped, so `/prod/calculator/` and `/calculator` both resolve to
    /// `calculator`.
    #[must_use]
    pub fn service_name(&self) -> &str {
        let path = self.path.strip_suffix('/').unwrap_or(&self.path);
        path.rsplit('/').next().unwrap_or_default()
    }

    /// Whether a query parameter with the given key is present.
    #[must_use]
    pub fn has_query_param(&self, key: &str) -> bool {
        self.query_string_parameters
            .as_ref()
            .is_some_and(|params| params.contains_key(key))
    }

    /// Look up a header, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    /// Whether the verb matches, ignoring ASCII case.
    #[must_use]
    pub fn is_method(&self, method: &http::Method) -> bool {
        self.http_method.eq_ignore_ascii_case(method.as_str())
    }
}

/// Look up a header on a raw event, ignoring ASCII case.
///
/// Returns `None` when the event has no `headers` object or the value is not
/// a string.
#[must_use]
pub fn event_header<'a>(event: &'a Value, name: &str) -> Option<&'a str> {
    event
        .get("headers")?
        .as_object()?
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .and_then(|(_, v)| v.as_str())
}

/// An HTTP-shaped handler result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    /// XML response body.
    pub body: String,
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
}

impl HttpResponse {
    /// Build an XML response with the standard `Content-Type` header.
    #[must_use]
    pub fn xml(status: http::StatusCode, body: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_owned(), CONTENT_TYPE.to_owned());
        Self {
            body: body.into(),
            status_code: status.as_u16(),
            headers,
        }
    }

    /// The status code as an [`http::StatusCode`].
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        http::StatusCode::from_u16(self.status_code)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}
