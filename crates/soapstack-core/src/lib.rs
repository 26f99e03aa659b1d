//! Service registry and request dispatcher for SoapStack.
//!
//! A [`SoapServer`] is built once from a [`ServerConfig`]: every registered
//! service's WSDL is loaded and checked for well-formedness up front. The
//! server then hands out cheap, cloneable [`SoapHandler`]s that turn one
//! inbound event into one XML response.
//!
//! # Architecture
//!
//! ```text
//! raw event (JSON)
//!        |
//!        v
//! event parser -> authorize -> resolve service -> GET ?wsdl / POST
//!                                                      |
//!                                                      v
//!                              RequestParser -> SoapService::invoke
//!                                                      |
//!                                                      v
//!                                             ResponseBuilder
//! ```
//!
//! # Example
//!
//! ```
//! use serde_json::{Value, json};
//! use soapstack_core::{
//!     BoxError, HandlerOptions, OperationTable, ServerConfig, ServiceDefinition, SoapServer, arg,
//! };
//!
//! async fn add(inputs: Vec<Value>) -> Result<Value, BoxError> {
//!     let a: i64 = arg(&inputs, 0)?;
//!     let b: i64 = arg(&inputs, 1)?;
//!     Ok(json!({ "AddResponse": { "result": a + b } }))
//! }
//!
//! let config = ServerConfig::new(|| {
//!     vec![(
//!         "calculator".to_owned(),
//!         ServiceDefinition::from_contents(
//!             "<definitions/>",
//!             OperationTable::new().operation("Add", add),
//!         ),
//!     )]
//! });
//!
//! let server = SoapServer::new(config).unwrap();
//! assert_eq!(server.registry().names(), vec!["calculator"]);
//! let _handler = server.create_handler(HandlerOptions::default());
//! ```

pub mod config;
pub mod dispatch;
pub mod registry;
pub mod service;

pub use config::{Authorize, EventParser, HandlerOptions, ServerConfig, ServerOptions, ServiceFactory};
pub use dispatch::{SoapHandler, SoapServer};
pub use registry::{RegisteredService, RegistryError, ServiceDefinition, ServiceRegistry, WsdlSource};
pub use service::{OperationFuture, OperationTable, SoapService, arg};

pub use soapstack_model::{
    BoxError, Fault, FaultKind, HttpResponse, OperationDescriptor, OperationInput, SoapEvent, event_header,
    fault,
};
