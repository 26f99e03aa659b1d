//! XML layer for SoapStack.
//!
//! This crate provides the two collaborators the dispatcher talks to, plus the
//! well-formedness check used when WSDL documents are registered.
//!
//! # Key components
//!
//! - [`RequestParser`] trait and [`SoapRequestParser`]: SOAP envelope to [`OperationDescriptor`]
//! - [`ResponseBuilder`] trait and [`SoapResponseBuilder`]: result value or [`Fault`] to SOAP envelope
//! - [`check_well_formed`]: structural XML validation
//!
//! # Envelope conventions
//!
//! - Elements are matched by local name, so any namespace prefix is accepted
//! - The first element inside `Body` names the operation; its children are the inputs
//! - DOCTYPE declarations are rejected and entities are never expanded
//!
//! [`OperationDescriptor`]: soapstack_model::OperationDescriptor
//! [`Fault`]: soapstack_model::Fault

pub mod error;
pub mod request;
pub mod response;
pub mod wellformed;

pub use error::XmlError;
pub use request::{RequestParser, RequestParserOptions, SoapRequestParser};
pub use response::{
    ResponseBuilder, ResponseBuilderOptions, SOAP_11_NAMESPACE, SOAP_12_NAMESPACE,
    SoapResponseBuilder, SoapVersion,
};
pub use wellformed::check_well_formed;
