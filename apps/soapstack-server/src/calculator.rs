//! Demo calculator service.
//!
//! Integer arithmetic over `intA`/`intB`, answering with
//! `{Operation}Response/{Operation}Result` in the `http://tempuri.org/`
//! namespace.

use serde_json::{Value, json};
use soapstack_core::{BoxError, OperationTable, arg, fault};

/// Service name the calculator is registered under.
pub const SERVICE_NAME: &str = "calculator";

/// Bundled WSDL describing the calculator.
pub const CALCULATOR_WSDL: &str = include_str!("../wsdl/calculator.wsdl");

const NAMESPACE: &str = "http://tempuri.org/";

/// Build the calculator operation table.
#[must_use]
pub fn service() -> OperationTable {
    OperationTable::new()
        .operation("Add", add)
        .operation("Subtract", subtract)
        .operation("Multiply", multiply)
        .operation("Divide", divide)
}

fn operands(inputs: &[Value]) -> Result<(i64, i64), BoxError> {
    Ok((arg(inputs, 0)?, arg(inputs, 1)?))
}

fn respond(operation: &str, result: i64) -> Value {
    json!({
        format!("{operation}Response"): {
            "@_xmlns": NAMESPACE,
            format!("{operation}Result"): result,
        }
    })
}

fn overflow() -> BoxError {
    fault!(BAD_REQUEST, "Arithmetic overflow").into()
}

async fn add(inputs: Vec<Value>) -> Result<Value, BoxError> {
    let (a, b) = operands(&inputs)?;
    let result = a.checked_add(b).ok_or_else(overflow)?;
    Ok(respond("Add", result))
}

async fn subtract(inputs: Vec<Value>) -> Result<Value, BoxError> {
    let (a, b) = operands(&inputs)?;
    let result = a.checked_sub(b).ok_or_else(overflow)?;
    Ok(respond("Subtract", result))
}

async fn multiply(inputs: Vec<Value>) -> Result<Value, BoxError> {
    let (a, b) = operands(&inputs)?;
    let result = a.checked_mul(b).ok_or_else(overflow)?;
    Ok(respond("Multiply", result))
}

async fn divide(inputs: Vec<Value>) -> Result<Value, BoxError> {
    let (a, b) = operands(&inputs)?;
    if b == 0 {
        return Err(fault!(BAD_REQUEST, "Division by zero").into());
    }
    let result = a.checked_div(b).ok_or_else(overflow)?;
    Ok(respond("Divide", result))
}
