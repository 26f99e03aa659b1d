//! Server and handler configuration.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use typed_builder::TypedBuilder;

use soapstack_xml::{RequestParser, RequestParserOptions, ResponseBuilder, ResponseBuilderOptions};

use crate::registry::ServiceDefinition;

/// Produces the services to register. Called once, at construction.
pub type ServiceFactory = Arc<dyn Fn() -> Vec<(String, ServiceDefinition)> + Send + Sync>;

/// Rewrites a raw event before it is decoded.
pub type EventParser = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Decides whether an event may be processed at all.
///
/// Sees the event after the event parser ran and before it is decoded, so
/// every field is visible and malformed events are still subject to it.
pub type Authorize = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Pipeline options shared by every handler of a server.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use serde_json::Value;
/// use soapstack_core::{ServerOptions, event_header};
///
/// let options = ServerOptions::builder()
///     .authorize(Arc::new(|event: &Value| event_header(event, "x-api-key") == Some("secret")))
///     .build();
/// assert!(options.authorize.is_some());
/// assert!(options.event_parser.is_none());
/// ```
#[derive(Clone, Default, TypedBuilder)]
pub struct ServerOptions {
    /// Options for the default request parser.
    #[builder(default)]
    pub request_parser_options: RequestParserOptions,

    /// Options for the default response builder.
    #[builder(default)]
    pub response_builder_options: ResponseBuilderOptions,

    /// Applied to every raw event before decoding.
    #[builder(default, setter(strip_option))]
    pub event_parser: Option<EventParser>,

    /// Requests for which this returns `false` get `403 Access Forbidden`.
    #[builder(default, setter(strip_option))]
    pub authorize: Option<Authorize>,

    /// Replaces the default parser; `request_parser_options` is then ignored.
    #[builder(default, setter(strip_option))]
    pub request_parser: Option<Arc<dyn RequestParser>>,

    /// Replaces the default builder; `response_builder_options` is then ignored.
    #[builder(default, setter(strip_option))]
    pub response_builder: Option<Arc<dyn ResponseBuilder>>,
}

impl fmt::Debug for ServerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerOptions")
            .field("request_parser_options", &self.request_parser_options)
            .field("response_builder_options", &self.response_builder_options)
            .field("event_parser", &self.event_parser.as_ref().map(|_| "..."))
            .field("authorize", &self.authorize.as_ref().map(|_| "..."))
            .field("request_parser", &self.request_parser.as_ref().map(|_| "..."))
            .field("response_builder", &self.response_builder.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Everything needed to build a [`SoapServer`](crate::SoapServer).
#[derive(Clone, TypedBuilder)]
pub struct ServerConfig {
    /// Service factory.
    pub services: ServiceFactory,

    /// Pipeline options.
    #[builder(default)]
    pub options: ServerOptions,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("services", &"...")
            .field("options", &self.options)
            .finish()
    }
}

impl ServerConfig {
    /// A config with default options.
    #[must_use]
    pub fn new<F>(services: F) -> Self
    where
        F: Fn() -> Vec<(String, ServiceDefinition)> + Send + Sync + 'static,
    {
        Self {
            services: Arc::new(services),
            options: ServerOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: ServerOptions) -> Self {
        self.options = options;
        self
    }
}

/// Per-handler options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, TypedBuilder)]
pub struct HandlerOptions {
    /// Log event, WSDL, descriptor, result and response payloads at debug level.
    #[builder(default = false)]
    pub debug: bool,
}
