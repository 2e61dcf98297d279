use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::errors::ApplicationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolName {
    AddToOrder,
    RemoveFromOrder,
}

impl ToolName {
    pub const ALL: [ToolName; 2] = [ToolName::AddToOrder, ToolName::RemoveFromOrder];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddToOrder => "add_to_order",
            Self::RemoveFromOrder => "remove_from_order",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "add_to_order" => Ok(Self::AddToOrder),
            "remove_from_order" => Ok(Self::RemoveFromOrder),
            other => Err(ApplicationError::UnknownTool(other.to_string())),
        }
    }
}

/// A single order mutation requested by the model.
///
/// Quantity positivity is an order invariant, not a schema rule, so an
/// `AddToOrder` may carry zero or a negative value until the order store
/// rejects it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolCall {
    AddToOrder { product_name: String, quantity: i64 },
    RemoveFromOrder { product_name: String },
}

impl ToolCall {
    pub fn add_to_order(
        product_name: impl Into<String>,
        quantity: i64,
    ) -> Result<Self, ApplicationError> {
        Ok(Self::AddToOrder { product_name: required_name(product_name.into())?, quantity })
    }

    pub fn remove_from_order(product_name: impl Into<String>) -> Result<Self, ApplicationError> {
        Ok(Self::RemoveFromOrder { product_name: required_name(product_name.into())? })
    }

    /// Validates a raw invocation (tool name plus decoded JSON arguments).
    pub fn from_arguments(name: &str, arguments: &Value) -> Result<Self, ApplicationError> {
        let tool = name.parse::<ToolName>()?;
        let Some(fields) = arguments.as_object() else {
            return Err(ApplicationError::InvalidArguments(format!(
                "{tool} arguments must be a JSON object"
            )));
        };

        let product_name = fields.get("product_name").and_then(Value::as_str).ok_or_else(|| {
            ApplicationError::InvalidArguments(format!("{tool} requires a string `product_name`"))
        })?;

        match tool {
            ToolName::AddToOrder => {
                let quantity =
                    fields.get("quantity").and_then(Value::as_i64).ok_or_else(|| {
                        ApplicationError::InvalidArguments(format!(
                            "{tool} requires an integer `quantity`"
                        ))
                    })?;
                Self::add_to_order(product_name, quantity)
            }
            ToolName::RemoveFromOrder => Self::remove_from_order(product_name),
        }
    }

    pub fn name(&self) -> ToolName {
        match self {
            Self::AddToOrder { .. } => ToolName::AddToOrder,
            Self::RemoveFromOrder { .. } => ToolName::RemoveFromOrder,
        }
    }

    pub fn product_name(&self) -> &str {
        match self {
            Self::AddToOrder { product_name, .. } | Self::RemoveFromOrder { product_name } => {
                product_name
            }
        }
    }
}

fn required_name(product_name: String) -> Result<String, ApplicationError> {
    if product_name.trim().is_empty() {
        return Err(ApplicationError::InvalidArguments("`product_name` must not be blank".into()));
    }
    Ok(product_name)
}
