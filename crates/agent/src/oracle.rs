//! Task completion oracle.
//!
//! Answers one question: does the run's accumulated state look like the
//! task is done? The oracle is read-only and idempotent; asking twice
//! changes nothing. The fast path is a mutation-verb heuristic over the
//! task text; an optional second opinion asks the model a yes/no
//! verification question.

use codewright_core::{AgentState, Message, ModelClient, ModelError, ModelRequest};
use tracing::debug;

/// Verbs whose presence in a task means the workspace must have been
/// mutated before the task can count as complete.
const MUTATION_VERBS: &[&str] = &[
    "add", "append", "change", "create", "delete", "edit", "fix", "generate", "implement",
    "insert", "modify", "move", "refactor", "remove", "rename", "replace", "rewrite", "update",
    "write",
];

/// Heuristic completion judge over run state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskCompletionOracle;

impl TaskCompletionOracle {
    pub fn new() -> Self {
        Self
    }

    /// Whether the task text asks for a workspace mutation.
    pub fn requires_mutation(&self, task: &str) -> bool {
        let lowered = task.to_lowercase();
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| MUTATION_VERBS.contains(&word))
    }

    /// Fast heuristic check: a mutation-demanding task needs at least
    /// one recorded mutation, and a clean run has no accumulated errors.
    pub fn looks_complete(&self, state: &AgentState) -> bool {
        if self.requires_mutation(&state.task) && !state.has_mutations() {
            debug!(task = %state.task, "task demands mutation but none recorded");
            return false;
        }
        state.errors.is_empty()
    }

    /// Ask the model for a verification verdict. Used when the
    /// heuristic alone is not trusted (loop detected mid-run). Falls
    /// back to the heuristic when the reply is unparseable.
    pub async fn verify_with_model(
        &self,
        client: &dyn ModelClient,
        model: &str,
        state: &AgentState,
    ) -> Result<bool, ModelError> {
        let prompt = format!(
            "You are verifying whether a coding task has been completed.\n\
             Task: {}\n\
             Run summary: {}\n\
             Files modified: {}\n\n\
             Reply with exactly one line: COMPLETE: yes or COMPLETE: no",
            state.task,
            state.summarize(),
            if state.files_modified.is_empty() {
                "none".to_string()
            } else {
                let mut paths: Vec<&str> =
                    state.files_modified.iter().map(|s| s.as_str()).collect();
                paths.sort_unstable();
                paths.join(", ")
            },
        );

        let request = ModelRequest::new(model, vec![Message::user(prompt)]);
        let response = client.complete(request).await?;

        Ok(match parse_verdict(&response.content) {
            Some(verdict) => verdict,
            None => {
                debug!(reply = %response.content, "unparseable verification reply");
                self.looks_complete(state)
            }
        })
    }
}

/// Extract a yes/no verdict from a verification reply.
fn parse_verdict(reply: &str) -> Option<bool> {
    let lowered = reply.to_lowercase();
    if lowered.contains("complete: yes") {
        Some(true)
    } else if lowered.contains("complete: no") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codewright_core::ModelResponse;

    fn state_with(task: &str) -> AgentState {
        AgentState::new(task, 8)
    }

    #[test]
    fn mutation_verbs_detected_on_word_boundaries() {
        let oracle = TaskCompletionOracle::new();
        assert!(oracle.requires_mutation("remove the duplicate endpoint"));
        assert!(oracle.requires_mutation("Fix the off-by-one in parse()"));
        assert!(oracle.requires_mutation("create a file named notes.txt"));
        // "addition" and "readdir" must not trip the "add" verb
        assert!(!oracle.requires_mutation("explain the addition in commit abc"));
        assert!(!oracle.requires_mutation("how does readdir work here?"));
        assert!(!oracle.requires_mutation("summarize the architecture"));
    }

    #[test]
    fn mutation_task_without_mutations_incomplete() {
        let oracle = TaskCompletionOracle::new();
        let state = state_with("remove the duplicate endpoint");
        assert!(!oracle.looks_complete(&state));
    }

    #[test]
    fn mutation_task_with_clean_mutation_complete() {
        let oracle = TaskCompletionOracle::new();
        let mut state = state_with("remove the duplicate endpoint");
        state.record_mutation("src/routes.rs");
        assert!(oracle.looks_complete(&state));
    }

    #[test]
    fn accumulated_errors_block_completion() {
        let oracle = TaskCompletionOracle::new();
        let mut state = state_with("fix the bug");
        state.record_mutation("src/lib.rs");
        state.record_error("write_file: permission denied");
        assert!(!oracle.looks_complete(&state));
    }

    #[test]
    fn read_only_task_with_no_errors_complete() {
        let oracle = TaskCompletionOracle::new();
        let state = state_with("summarize the architecture");
        assert!(oracle.looks_complete(&state));
    }

    #[test]
    fn oracle_is_idempotent() {
        let oracle = TaskCompletionOracle::new();
        let mut state = state_with("write a readme");
        state.record_mutation("README.md");
        let first = oracle.looks_complete(&state);
        let second = oracle.looks_complete(&state);
        assert_eq!(first, second);
    }

    #[test]
    fn verdict_parsing() {
        assert_eq!(parse_verdict("COMPLETE: yes"), Some(true));
        assert_eq!(parse_verdict("Complete: No — tests still fail"), Some(false));
        assert_eq!(parse_verdict("I think it is done"), None);
    }

    /// Replies with a fixed verdict line.
    struct VerdictClient(&'static str);

    #[async_trait]
    impl ModelClient for VerdictClient {
        fn name(&self) -> &str {
            "verdict"
        }
        async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse, ModelError> {
            Ok(ModelResponse {
                content: self.0.into(),
                tool_calls: vec![],
                usage: None,
                model: "test".into(),
            })
        }
    }

    #[tokio::test]
    async fn model_verdict_overrides_heuristic() {
        let oracle = TaskCompletionOracle::new();
        let mut state = state_with("fix the bug");
        state.record_mutation("src/lib.rs");
        // heuristic says complete, model says no
        assert!(oracle.looks_complete(&state));
        let verdict = oracle
            .verify_with_model(&VerdictClient("COMPLETE: no"), "m", &state)
            .await
            .unwrap();
        assert!(!verdict);
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back_to_heuristic() {
        let oracle = TaskCompletionOracle::new();
        let mut state = state_with("fix the bug");
        state.record_mutation("src/lib.rs");
        let verdict = oracle
            .verify_with_model(&VerdictClient("hmm, probably"), "m", &state)
            .await
            .unwrap();
        assert!(verdict);
    }
}
