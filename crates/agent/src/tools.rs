use serde_json::{json, Value};

use orderdesk_core::domain::tool_call::{ToolCall, ToolName};
use orderdesk_core::errors::ApplicationError;

use crate::llm::{ToolInvocation, ToolSchema};

pub fn order_tool_schemas() -> Vec<ToolSchema> {
    ToolName::ALL.into_iter().map(schema_for).collect()
}

pub fn schema_for(tool: ToolName) -> ToolSchema {
    match tool {
        ToolName::AddToOrder => ToolSchema {
            name: tool.as_str(),
            description: "Add an item to the current order",
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_name": {
                        "type": "string",
                        "description": "Exact name of the product"
                    },
                    "quantity": {
                        "type": "integer",
                        "description": "Number of items to order"
                    }
                },
                "required": ["product_name", "quantity"]
            }),
        },
        ToolName::RemoveFromOrder => ToolSchema {
            name: tool.as_str(),
            description: "Remove an item from the current order",
            parameters: json!({
                "type": "object",
                "properties": {
                    "product_name": {
                        "type": "string",
                        "description": "Exact name of the product to remove"
                    }
                },
                "required": ["product_name"]
            }),
        },
    }
}

/// Decodes and validates a model invocation. Unknown names are rejected
/// before the arguments are looked at.
pub fn parse_invocation(invocation: &ToolInvocation) -> Result<ToolCall, ApplicationError> {
    let tool = invocation.name.parse::<ToolName>()?;
    let arguments: Value = serde_json::from_str(&invocation.arguments).map_err(|error| {
        ApplicationError::InvalidArguments(format!("{tool} arguments are not valid JSON: {error}"))
    })?;
    ToolCall::from_arguments(tool.as_str(), &arguments)
}

#[cfg(test)]
mod tests {
    use orderdesk_core::domain::tool_call::ToolCall;
    use orderdesk_core::errors::ApplicationError;

    use super::{order_tool_schemas, parse_invocation};
    use crate::llm::ToolInvocation;

    fn invocation(name: &str, arguments: &str) -> ToolInvocation {
        ToolInvocation { name: name.to_string(), arguments: arguments.to_string() }
    }

    #[test]
    fn schemas_declare_required_arguments() {
        let schemas = order_tool_schemas();
        let names: Vec<_> = schemas.iter().map(|schema| schema.name).collect();
        assert_eq!(names, vec!["add_to_order", "remove_from_order"]);

        assert_eq!(
            schemas[0].parameters["required"],
            serde_json::json!(["product_name", "quantity"])
        );
        assert_eq!(schemas[0].parameters["properties"]["quantity"]["type"], "integer");
        assert_eq!(schemas[1].parameters["required"], serde_json::json!(["product_name"]));
    }

    #[test]
    fn parses_valid_invocation() {
        let call = parse_invocation(&invocation(
            "add_to_order",
            r#"{"product_name":"Flyer Pack","quantity":3}"#,
        ))
        .expect("valid");
        assert_eq!(
            call,
            ToolCall::AddToOrder { product_name: "Flyer Pack".to_string(), quantity: 3 }
        );
    }

    #[test]
    fn invalid_json_is_invalid_arguments() {
        let result = parse_invocation(&invocation("add_to_order", "{product_name: Flyer"));
        assert!(matches!(result, Err(ApplicationError::InvalidArguments(_))));
    }

    #[test]
    fn unknown_tool_wins_over_bad_arguments() {
        let result = parse_invocation(&invocation("checkout", "not json"));
        assert_eq!(result, Err(ApplicationError::UnknownTool("checkout".to_string())));
    }
}
