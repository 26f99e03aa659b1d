//! Request dispatch.
//!
//! [`SoapHandler::handle`] runs one event through the pipeline. Each step
//! either continues or ends the request with a fault:
//!
//! 1. Optional event parser
//! 2. Authorization over the raw event (`403`)
//! 3. Event decoding (`400`)
//! 4. Service resolution from the last path segment (`404`)
//! 5. Verb branch: `GET ?wsdl` returns the stored WSDL, `POST` continues,
//!    anything else is `405`
//! 6. Body decoding, request parsing, operation lookup (`501`), invocation
//!    and success rendering
//!
//! Every fault is logged and rendered through the response builder, so the
//! caller always receives an XML body.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use soapstack_model::{Fault, FaultKind, HttpResponse, SoapEvent};
use soapstack_xml::{RequestParser, ResponseBuilder, SoapRequestParser, SoapResponseBuilder};

use crate::config::{Authorize, EventParser, HandlerOptions, ServerConfig};
use crate::registry::{RegisteredService, RegistryError, ServiceRegistry};

struct ServerInner {
    registry: ServiceRegistry,
    request_parser: Arc<dyn RequestParser>,
    response_builder: Arc<dyn ResponseBuilder>,
    event_parser: Option<EventParser>,
    authorize: Option<Authorize>,
}

/// A validated set of services plus the collaborators used to serve them.
#[derive(Clone)]
pub struct SoapServer {
    inner: Arc<ServerInner>,
}

impl fmt::Debug for SoapServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoapServer")
            .field("services", &self.inner.registry.names())
            .field("authorize", &self.inner.authorize.as_ref().map(|_| "..."))
            .finish_non_exhaustive()
    }
}

impl SoapServer {
    /// Build the registry and collaborators.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError` if any service definition is invalid.
    pub fn new(config: ServerConfig) -> Result<Self, RegistryError> {
        let factory = config.services;
        let registry = ServiceRegistry::from_factory(|| factory())?;
        let options = config.options;

        let request_parser: Arc<dyn RequestParser> = match options.request_parser {
            Some(parser) => parser,
            None => Arc::new(SoapRequestParser::new(options.request_parser_options)),
        };
        let response_builder: Arc<dyn ResponseBuilder> = match options.response_builder {
            Some(builder) => builder,
            None => Arc::new(SoapResponseBuilder::new(options.response_builder_options)),
        };

        info!(services = ?registry.names(), "SOAP server ready");
        Ok(Self {
            inner: Arc::new(ServerInner {
                registry,
                request_parser,
                response_builder,
                event_parser: options.event_parser,
                authorize: options.authorize,
            }),
        })
    }

    /// The registered services.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    /// Create a request handler.
    #[must_use]
    pub fn create_handler(&self, options: HandlerOptions) -> SoapHandler {
        SoapHandler {
            inner: Arc::clone(&self.inner),
            options,
        }
    }
}

/// Turns one event into one XML response. Cheap to clone.
#[derive(Clone)]
pub struct SoapHandler {
    inner: Arc<ServerInner>,
    options: HandlerOptions,
}

impl fmt::Debug for SoapHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoapHandler")
            .field("services", &self.inner.registry.names())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SoapHandler {
    /// Handle a raw event.
    ///
    /// The configured event parser, if any, is applied first. Authorization
    /// sees the result before it is decoded. Never fails: every error becomes
    /// a fault response.
    pub async fn handle(&self, raw: Value) -> HttpResponse {
        let result = self.process(raw).await;
        self.respond(result)
    }

    /// Handle an already-decoded event. The event parser is not applied.
    pub async fn handle_event(&self, event: &SoapEvent) -> HttpResponse {
        let result = self.process_event(event).await;
        self.respond(result)
    }

    async fn process(&self, raw: Value) -> Result<String, Fault> {
        let raw = match &self.inner.event_parser {
            Some(parse) => parse(raw),
            None => raw,
        };
        if self.options.debug {
            debug!(event = %raw, "received event");
        }
        self.check_access(&raw)?;
        let event = decode_event(raw)?;
        self.route(&event).await
    }

    async fn process_event(&self, event: &SoapEvent) -> Result<String, Fault> {
        if self.inner.authorize.is_some() {
            let raw = serde_json::to_value(event).map_err(malformed_event)?;
            self.check_access(&raw)?;
        }
        self.route(event).await
    }

    fn check_access(&self, raw: &Value) -> Result<(), Fault> {
        match &self.inner.authorize {
            Some(authorize) if !authorize(raw) => Err(Fault::access_forbidden()),
            _ => Ok(()),
        }
    }

    async fn route(&self, event: &SoapEvent) -> Result<String, Fault> {
        let name = event.service_name();
        let service = self
            .inner
            .registry
            .get(name)
            .ok_or_else(Fault::service_not_found)?;

        if event.is_method(&Method::GET) && event.has_query_param("wsdl") {
            info!(service = %name, "serving WSDL");
            if self.options.debug {
                debug!(service = %name, wsdl = %service.wsdl(), "WSDL body");
            }
            return Ok(service.wsdl().to_owned());
        }

        if event.is_method(&Method::POST) {
            return self.invoke(service, event).await;
        }

        Err(Fault::method_not_allowed(&event.http_method))
    }

    async fn invoke(&self, service: &RegisteredService, event: &SoapEvent) -> Result<String, Fault> {
        let body = decode_body(event)?;
        if self.options.debug {
            debug!(service = %service.name(), body = %body, "SOAP request body");
        }

        let descriptor = self.inner.request_parser.parse(&body)?;
        if self.options.debug {
            debug!(service = %service.name(), descriptor = ?descriptor, "parsed SOAP request");
        }

        let operation = descriptor.operation.clone();
        if !service.service().supports(&operation) {
            return Err(Fault::not_implemented());
        }

        info!(service = %service.name(), operation = %operation, "invoking operation");
        let result = service
            .service()
            .invoke(&operation, descriptor.into_values())
            .await
            .map_err(|err| Fault::from_error(FaultKind::InvocationFailure, err))?;
        if self.options.debug {
            debug!(service = %service.name(), operation = %operation, result = %result, "operation result");
        }

        self.inner.response_builder.success(&result)
    }

    fn respond(&self, result: Result<String, Fault>) -> HttpResponse {
        match result {
            Ok(body) => {
                if self.options.debug {
                    debug!(body = %body, "SOAP response body");
                }
                HttpResponse::xml(StatusCode::OK, body)
            }
            Err(fault) => {
                if fault.status_code.is_server_error() {
                    error!(
                        kind = %fault.kind,
                        status = fault.status_code.as_u16(),
                        error = %fault.message,
                        "request failed"
                    );
                } else {
                    warn!(
                        kind = %fault.kind,
                        status = fault.status_code.as_u16(),
                        error = %fault.message,
                        "request rejected"
                    );
                }
                HttpResponse::xml(fault.status_code, self.inner.response_builder.fault(&fault))
            }
        }
    }
}

fn decode_event(raw: Value) -> Result<SoapEvent, Fault> {
    serde_json::from_value(raw).map_err(malformed_event)
}

fn malformed_event(err: serde_json::Error) -> Fault {
    Fault::malformed_event(format!("Malformed event: {err}")).with_source(err)
}

fn decode_body(event: &SoapEvent) -> Result<String, Fault> {
    let Some(body) = &event.body else {
        return Ok(String::new());
    };
    if !event.is_base64_encoded {
        return Ok(body.clone());
    }
    let bytes = BASE64_STANDARD.decode(body).map_err(|err| {
        Fault::malformed_event(format!("Invalid base64 request body: {err}")).with_source(err)
    })?;
    String::from_utf8(bytes).map_err(|err| {
        Fault::malformed_event(format!("Request body is not valid UTF-8: {err}")).with_source(err)
    })
}
