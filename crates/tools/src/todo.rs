//! Run-scoped todo tracking.
//!
//! Lets the model break a task into steps and check them off; the list
//! lives in memory for the duration of the run.

use async_trait::async_trait;
use codewright_core::{Tool, ToolCall, ToolError, ToolResult};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct TodoItem {
    text: String,
    done: bool,
}

/// Add, complete, and list todo items.
pub struct TodoTool {
    items: Mutex<Vec<TodoItem>>,
}

impl TodoTool {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    fn render(items: &[TodoItem]) -> String {
        if items.is_empty() {
            return "(no todos)".into();
        }
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                format!("{}. [{}] {}", i + 1, if item.done { "x" } else { " " }, item.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for TodoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for TodoTool {
    fn name(&self) -> &str {
        "todo"
    }

    fn description(&self) -> &str {
        "Track task steps. action is one of: add (with text), done (with index, 1-based), list."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": { "type": "string", "enum": ["add", "done", "list"] },
                "text": { "type": "string", "description": "Item text (for add)" },
                "index": { "type": "integer", "description": "1-based item number (for done)" }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let action = call.str_arg("action")?;
        let mut items = self
            .items
            .lock()
            .map_err(|_| ToolError::ExecutionFailed {
                tool_name: "todo".into(),
                reason: "todo list poisoned".into(),
            })?;

        match action {
            "add" => {
                let text = call.str_arg("text")?;
                items.push(TodoItem {
                    text: text.to_string(),
                    done: false,
                });
                Ok(ToolResult::ok(&call.id, Self::render(&items)))
            }
            "done" => {
                let index = call
                    .opt_u64_arg("index")
                    .ok_or_else(|| ToolError::InvalidArguments("Missing 'index' argument".into()))?
                    as usize;
                if index == 0 || index > items.len() {
                    return Err(ToolError::InvalidArguments(format!(
                        "No todo item {index} (have {})",
                        items.len()
                    )));
                }
                items[index - 1].done = true;
                Ok(ToolResult::ok(&call.id, Self::render(&items)))
            }
            "list" => Ok(ToolResult::ok(&call.id, Self::render(&items))),
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown todo action: {other}"
            ))),
        }
    }
}
