//! Service implementations as capability sets.
//!
//! The dispatcher never inspects a service beyond [`SoapService`]: it asks
//! whether an operation is supported and, if so, invokes it with the
//! positional input values parsed from the request.
//!
//! Most services are written as an [`OperationTable`]:
//!
//! ```
//! use serde_json::{Value, json};
//! use soapstack_core::{BoxError, OperationTable, SoapService, arg};
//!
//! async fn add(inputs: Vec<Value>) -> Result<Value, BoxError> {
//!     let a: i64 = arg(&inputs, 0)?;
//!     let b: i64 = arg(&inputs, 1)?;
//!     Ok(json!({ "AddResponse": { "result": a + b } }))
//! }
//!
//! let service = OperationTable::new().operation("Add", add);
//! assert!(service.supports("Add"));
//! assert!(!service.supports("Divide"));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use soapstack_model::{BoxError, Fault, fault};

/// Future returned by [`SoapService::invoke`].
pub type OperationFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, BoxError>> + Send + 'a>>;

/// A named set of invokable operations.
///
/// Implementations may return any error; a [`Fault`] keeps its status code
/// and anything else is reported as `500`.
pub trait SoapService: Send + Sync + 'static {
    /// Whether `operation` can be invoked.
    fn supports(&self, operation: &str) -> bool;

    /// Names of all supported operations.
    fn operations(&self) -> Vec<&str>;

    /// Invoke `operation` with its input values in request order.
    fn invoke(&self, operation: &str, inputs: Vec<Value>) -> OperationFuture<'_>;
}

type OperationFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>;

/// A [`SoapService`] backed by a map of operation name to async function.
#[derive(Clone, Default)]
pub struct OperationTable {
    operations: BTreeMap<String, OperationFn>,
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationTable")
            .field("operations", &self.operations.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl OperationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation, replacing any previous one with the same name.
    #[must_use]
    pub fn operation<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.operations
            .insert(name.into(), Arc::new(move |inputs| handler(inputs).boxed()));
        self
    }

    /// Number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operations are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl SoapService for OperationTable {
    fn supports(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    fn operations(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }

    fn invoke(&self, operation: &str, inputs: Vec<Value>) -> OperationFuture<'_> {
        match self.operations.get(operation) {
            Some(handler) => handler(inputs),
            None => futures::future::err(Fault::not_implemented().into()).boxed(),
        }
    }
}

/// Deserialize the input at `index` into `T`.
///
/// Inputs coerced to numbers or booleans by the request parser are also
/// accepted as their text, so `<zip>12345</zip>` reads as a `String`.
///
/// # Errors
///
/// Returns a `400` fault when the input is missing or has the wrong shape.
pub fn arg<T: DeserializeOwned>(inputs: &[Value], index: usize) -> Result<T, Fault> {
    let value = inputs
        .get(index)
        .ok_or_else(|| fault!(BAD_REQUEST, format!("Missing input at position {index}")))?;
    T::deserialize(value).or_else(|err| {
        let retry = match value {
            Value::Number(_) | Value::Bool(_) => {
                T::deserialize(Value::String(value.to_string())).ok()
            }
            _ => None,
        };
        retry.ok_or_else(|| {
            fault!(BAD_REQUEST, format!("Invalid input at position {index}: {err}"))
                .with_source(err)
        })
    })
}
