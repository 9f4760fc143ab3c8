//! Response envelope returned for every tool invocation.

use crate::error::DbError;
use rmcp::model::{CallToolResult, Content};

/// Uniform success/error wrapper: exactly one text block plus an error flag.
///
/// Callers branch on `is_error`; failures never surface as protocol faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub text: String,
    pub is_error: bool,
}

impl ToolResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Render an error as `Error: {message}` followed by its diagnostic trace.
    pub fn from_error(err: &DbError) -> Self {
        Self {
            text: format!("Error: {}\nTrace: {}", err, err.trace()),
            is_error: true,
        }
    }
}

impl From<ToolResponse> for CallToolResult {
    fn from(response: ToolResponse) -> Self {
        let content = vec![Content::text(response.text)];
        if response.is_error {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}
