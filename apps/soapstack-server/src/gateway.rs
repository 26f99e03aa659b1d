//! hyper service adapting HTTP requests to SOAP events.
//!
//! [`GatewayService`] turns each request into a proxy-style JSON event,
//! hands it to a [`SoapHandler`], and turns the [`HttpResponse`] back into
//! an HTTP response. `GET /_soapstack/health` is answered directly.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::Service;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use soapstack_core::{HttpResponse, SoapHandler};

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/_soapstack/health";

/// Server version reported in health responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The hyper service in front of a [`SoapHandler`].
#[derive(Debug, Clone)]
pub struct GatewayService {
    handler: SoapHandler,
    services: Arc<Vec<String>>,
}

impl GatewayService {
    /// Create a gateway for `handler`, reporting `services` on the health endpoint.
    #[must_use]
    pub fn new(handler: SoapHandler, services: Vec<String>) -> Self {
        Self {
            handler,
            services: Arc::new(services),
        }
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let gateway = self.clone();
        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let (parts, body) = req.into_parts();

            if parts.method == http::Method::GET && parts.uri.path() == HEALTH_PATH {
                return Ok(health_response(&gateway.services));
            }

            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(error = %e, request_id = %request_id, "failed to read request body");
                    return Ok(plain_response(
                        http::StatusCode::BAD_REQUEST,
                        "failed to read request body",
                    ));
                }
            };

            debug!(method = %parts.method, uri = %parts.uri, request_id = %request_id, "processing SOAP request");
            let event = request_to_event(&parts, &body);
            let response = gateway.handler.handle(event).await;
            info!(
                method = %parts.method,
                path = %parts.uri.path(),
                status = response.status_code,
                request_id = %request_id,
                "handled request"
            );

            Ok(into_http_response(response, &request_id))
        })
    }
}

/// Build a proxy-style event from request parts and body.
///
/// Bodies that are not valid UTF-8 are base64-encoded and flagged.
#[must_use]
pub fn request_to_event(parts: &http::request::Parts, body: &Bytes) -> Value {
    let query: Option<HashMap<String, String>> = parts.uri.query().map(|query| {
        form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    });

    let headers: HashMap<String, String> = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    let (body, is_base64_encoded) = if body.is_empty() {
        (None, false)
    } else {
        match std::str::from_utf8(body) {
            Ok(text) => (Some(text.to_owned()), false),
            Err(_) => (Some(BASE64_STANDARD.encode(body)), true),
        }
    };

    json!({
        "path": parts.uri.path(),
        "httpMethod": parts.method.as_str(),
        "queryStringParameters": query,
        "headers": headers,
        "body": body,
        "isBase64Encoded": is_base64_encoded,
    })
}

/// Convert a handler response into an HTTP response.
#[must_use]
pub fn into_http_response(response: HttpResponse, request_id: &str) -> http::Response<Full<Bytes>> {
    let mut builder = http::Response::builder()
        .status(response.status())
        .header("x-request-id", request_id);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|e| {
            error!(error = %e, request_id, "failed to build HTTP response");
            plain_response(
                http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            )
        })
}

fn health_response(services: &[String]) -> http::Response<Full<Bytes>> {
    let services: serde_json::Map<String, Value> = services
        .iter()
        .map(|name| (name.clone(), Value::from("running")))
        .collect();
    let body = json!({
        "status": "running",
        "version": VERSION,
        "services": services,
    });
    let mut response = http::Response::new(Full::new(Bytes::from(body.to_string())));
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("application/json"),
    );
    response
}

fn plain_response(status: http::StatusCode, message: &'static str) -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    response
}
