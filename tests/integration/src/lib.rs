//! End-to-end tests for the SoapStack handler.
//!
//! Every test builds a server in-process and drives it through
//! [`SoapHandler::handle`] with proxy-style JSON events.

use std::sync::{Arc, Mutex, Once};

use serde_json::{Value, json};
use soapstack_core::{
    BoxError, HandlerOptions, OperationTable, ServerConfig, ServerOptions, ServiceDefinition,
    SoapHandler, SoapServer, arg, fault,
};

#[cfg(test)]
mod test_dispatch;
#[cfg(test)]
mod test_faults;
#[cfg(test)]
mod test_options;
#[cfg(test)]
mod test_wsdl;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// WSDL registered for the calculator service.
pub const CALCULATOR_WSDL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions name="Calculator" xmlns="http://schemas.xmlsoap.org/wsdl/">
  <portType name="CalculatorPort">
    <operation name="Add"/>
    <operation name="Divide"/>
  </portType>
</definitions>
"#;

/// WSDL registered for the inventory service.
pub const INVENTORY_WSDL: &str =
    r#"<definitions name="Inventory" xmlns="http://schemas.xmlsoap.org/wsdl/"/>"#;

/// Operations invoked on the inventory service, with their inputs.
pub type CallLog = Arc<Mutex<Vec<(String, Vec<Value>)>>>;

async fn add(inputs: Vec<Value>) -> Result<Value, BoxError> {
    let a: i64 = arg(&inputs, 0)?;
    let b: i64 = arg(&inputs, 1)?;
    Ok(json!({ "AddResponse": { "result": a + b } }))
}

async fn divide(inputs: Vec<Value>) -> Result<Value, BoxError> {
    let a: i64 = arg(&inputs, 0)?;
    let b: i64 = arg(&inputs, 1)?;
    if b == 0 {
        return Err(fault!(BAD_REQUEST, "Division by zero").into());
    }
    Ok(json!({ "DivideResponse": { "result": a / b } }))
}

async fn crash(_inputs: Vec<Value>) -> Result<Value, BoxError> {
    Err("database unavailable".into())
}

async fn scalar(_inputs: Vec<Value>) -> Result<Value, BoxError> {
    Ok(json!("not an object"))
}

fn inventory(log: CallLog) -> OperationTable {
    let record = move |operation: &'static str| {
        let log = Arc::clone(&log);
        move |inputs: Vec<Value>| {
            let log = Arc::clone(&log);
            async move {
                if let Ok(mut calls) = log.lock() {
                    calls.push((operation.to_owned(), inputs.clone()));
                }
                Ok::<_, BoxError>(json!({ format!("{operation}Response"): { "items": inputs } }))
            }
        }
    };
    OperationTable::new()
        .operation("Reserve", record("Reserve"))
        .operation("Release", record("Release"))
}

/// A running test server plus the log of inventory calls.
#[derive(Debug)]
pub struct Fixture {
    /// The server under test.
    pub server: SoapServer,
    /// Inventory invocations, in order.
    pub calls: CallLog,
}

impl Fixture {
    /// Build a fixture with the given options.
    #[must_use]
    pub fn with_options(options: ServerOptions) -> Self {
        init_tracing();
        let calls: CallLog = Arc::default();
        let log = Arc::clone(&calls);
        let config = ServerConfig::new(move || {
            vec![
                (
                    "calculator".to_owned(),
                    ServiceDefinition::from_contents(
                        CALCULATOR_WSDL,
                        OperationTable::new()
                            .operation("Add", add)
                            .operation("Divide", divide)
                            .operation("Crash", crash)
                            .operation("Scalar", scalar),
                    ),
                ),
                (
                    "inventory".to_owned(),
                    ServiceDefinition::from_contents(INVENTORY_WSDL, inventory(Arc::clone(&log))),
                ),
            ]
        })
        .with_options(options);
        let server = SoapServer::new(config).unwrap_or_else(|e| panic!("fixture server: {e}"));
        Self { server, calls }
    }

    /// Build a fixture with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ServerOptions::default())
    }

    /// A handler with default options.
    #[must_use]
    pub fn handler(&self) -> SoapHandler {
        self.server.create_handler(HandlerOptions::default())
    }

    /// Number of recorded inventory calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap `body` in a SOAP 1.1 envelope.
#[must_use]
pub fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>{body}</soap:Body></soap:Envelope>"#
    )
}

/// Wrap `body` in a SOAP 1.2 envelope.
#[must_use]
pub fn envelope_12(body: &str) -> String {
    format!(
        r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope"><env:Body>{body}</env:Body></env:Envelope>"#
    )
}

/// A `GET {path}?wsdl` event.
#[must_use]
pub fn wsdl_event(path: &str) -> Value {
    json!({
        "path": path,
        "httpMethod": "GET",
        "queryStringParameters": { "wsdl": "" },
        "body": null
    })
}

/// A `POST {path}` event carrying `body`.
#[must_use]
pub fn post_event(path: &str, body: &str) -> Value {
    json!({
        "path": path,
        "httpMethod": "POST",
        "queryStringParameters": null,
        "body": body
    })
}
