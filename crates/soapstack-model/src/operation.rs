//! Operation descriptor produced by the request parser.

use serde_json::Value;

/// A single named input of an operation, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationInput {
    /// Local name of the input element.
    pub name: String,
    /// Decoded element content.
    pub value: Value,
}

/// The operation a SOAP request addresses, plus its ordered inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    /// Operation name (local name of the first element inside `Body`).
    pub operation: String,
    /// Inputs in the order they appear in the request.
    pub inputs: Vec<OperationInput>,
}

impl OperationDescriptor {
    /// Create a descriptor with no inputs.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            inputs: Vec::new(),
        }
    }

    /// Append an input.
    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.push(OperationInput {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Consume the descriptor, keeping only the input values in order.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.inputs.into_iter().map(|input| input.value).collect()
    }
}
