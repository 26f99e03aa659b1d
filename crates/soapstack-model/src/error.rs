//! SOAP fault types.
//!
//! Every failure in the dispatch pipeline is expressed as a [`Fault`]: an HTTP
//! status plus a human-readable message. Faults raised by service
//! implementations keep their status; any other error type is mapped to
//! `500 Internal Server Error`.

use std::fmt;

/// Boxed error type accepted from service implementations and collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of a fault by the pipeline stage that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum FaultKind {
    /// The configured authorize predicate rejected the event.
    AuthorizationDenied,
    /// No service is registered under the requested name.
    ServiceNotFound,
    /// The verb/query combination has no route.
    MethodNotAllowed,
    /// The inbound event could not be decoded.
    MalformedEvent,
    /// The request body could not be parsed into an operation.
    RequestParseFailure,
    /// The service does not implement the requested operation.
    OperationNotImplemented,
    /// The operation itself failed.
    #[default]
    InvocationFailure,
    /// The success payload could not be rendered.
    ResponseRenderFailure,
}

impl FaultKind {
    /// Returns the short kind name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationDenied => "AuthorizationDenied",
            Self::ServiceNotFound => "ServiceNotFound",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::MalformedEvent => "MalformedEvent",
            Self::RequestParseFailure => "RequestParseFailure",
            Self::OperationNotImplemented => "OperationNotImplemented",
            Self::InvocationFailure => "InvocationFailure",
            Self::ResponseRenderFailure => "ResponseRenderFailure",
        }
    }

    /// Returns the default HTTP status code for this kind.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::AuthorizationDenied => http::StatusCode::FORBIDDEN,
            Self::ServiceNotFound => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::MalformedEvent | Self::RequestParseFailure => http::StatusCode::BAD_REQUEST,
            Self::OperationNotImplemented => http::StatusCode::NOT_IMPLEMENTED,
            Self::InvocationFailure | Self::ResponseRenderFailure => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SOAP fault: status code plus message.
#[derive(Debug)]
pub struct Fault {
    /// Which pipeline stage produced the fault.
    pub kind: FaultKind,
    /// A human-readable message, rendered as the fault string.
    pub message: String,
    /// The HTTP status code of the response carrying this fault.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<BoxError>,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fault({}): {}", self.status_code.as_u16(), self.message)
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl Fault {
    /// Create a fault with an explicit status code.
    ///
    /// This is the constructor service implementations use to pick the
    /// status their callers receive.
    #[must_use]
    pub fn new(status_code: http::StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::InvocationFailure,
            message: message.into(),
            status_code,
            source: None,
        }
    }

    /// Create a fault of the given kind with its default status code.
    #[must_use]
    pub fn with_kind(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            status_code: kind.default_status_code(),
            message: message.into(),
            kind,
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Convert an arbitrary error into a fault.
    ///
    /// A boxed [`Fault`] is returned unchanged so an explicit status survives.
    /// Anything else becomes a `500` fault of the given kind carrying the
    /// error's display text.
    #[must_use]
    pub fn from_error(kind: FaultKind, error: BoxError) -> Self {
        match error.downcast::<Self>() {
            Ok(fault) => *fault,
            Err(other) => Self {
                kind,
                message: other.to_string(),
                status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
                source: Some(other),
            },
        }
    }

    /// The SOAP fault code: `Client` for 4xx statuses, `Server` otherwise.
    #[must_use]
    pub fn fault_code(&self) -> &'static str {
        if self.status_code.is_client_error() {
            "Client"
        } else {
            "Server"
        }
    }

    // -- Convenience constructors --

    /// The authorize predicate rejected the request.
    #[must_use]
    pub fn access_forbidden() -> Self {
        Self::with_kind(FaultKind::AuthorizationDenied, "Access Forbidden")
    }

    /// No service matches the request path.
    #[must_use]
    pub fn service_not_found() -> Self {
        Self::with_kind(FaultKind::ServiceNotFound, "Service not found")
    }

    /// The verb/query combination is not routable.
    #[must_use]
    pub fn method_not_allowed(method: &str) -> Self {
        Self::with_kind(
            FaultKind::MethodNotAllowed,
            format!("Method Not Allowed: {method}"),
        )
    }

    /// The event could not be decoded.
    #[must_use]
    pub fn malformed_event(message: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::MalformedEvent, message)
    }

    /// The SOAP request could not be parsed.
    #[must_use]
    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::RequestParseFailure, message)
    }

    /// The requested operation is absent from the service.
    #[must_use]
    pub fn not_implemented() -> Self {
        Self::with_kind(
            FaultKind::OperationNotImplemented,
            "Operation didn't implemented",
        )
    }

    /// The success payload could not be rendered.
    #[must_use]
    pub fn render_failure(message: impl Into<String>) -> Self {
        Self::with_kind(FaultKind::ResponseRenderFailure, message)
    }
}

/// Create a [`Fault`] with a status code.
///
/// # Examples
///
/// ```
/// use soapstack_model::fault;
///
/// let err = fault!(BAD_REQUEST, "division by zero");
/// assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
/// assert_eq!(err.message, "division by zero");
/// ```
#[macro_export]
macro_rules! fault {
    ($status:ident, $msg:expr) => {
        $crate::error::Fault::new($crate::http::StatusCode::$status, $msg)
    };
}
