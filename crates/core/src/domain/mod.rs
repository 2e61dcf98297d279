pub mod catalog;
pub mod category;
pub mod order;
pub mod tool_call;
