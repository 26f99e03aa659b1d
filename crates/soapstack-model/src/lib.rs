//! Shared types for SoapStack.
//!
//! - [`Fault`] and [`FaultKind`]: the single error shape every failure path converges on
//! - [`SoapEvent`] and [`HttpResponse`]: the API-Gateway proxy event/response shapes
//! - [`OperationDescriptor`]: what the request parser extracts from a SOAP envelope

pub mod error;
pub mod event;
pub mod operation;

pub use error::{BoxError, Fault, FaultKind};
pub use event::{CONTENT_TYPE, HttpResponse, SoapEvent, event_header};
pub use operation::{OperationDescriptor, OperationInput};

#[doc(hidden)]
pub use http;
