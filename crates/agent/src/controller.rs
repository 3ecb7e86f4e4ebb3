//! The agent control loop: THINK, ACT, OBSERVE, DECIDE.
//!
//! One loop serves every backend. The tool catalog rides in every
//! request; backends without structured calling (per
//! [`ModelClient::supports_tool_calls`]) surface it in their prompt and
//! get their replies run through the recovery parser instead. The loop
//! owns run policy enforcement
//! (iteration cap, wall clock, failure cap), loop detection, context
//! compaction, and completion checking; tools and models stay behind
//! their seams.

use crate::compactor::{ContextCompactor, ScratchStore};
use crate::loop_detect::{LoopDetector, normalize_key};
use crate::nudge;
use crate::oracle::TaskCompletionOracle;
use chrono::Utc;
use codewright_config::PolicyConfig;
use codewright_core::{
    ActionRecord, AgentEvent, AgentState, EventBus, History, Message, ModelClient, ModelError,
    ModelRequest, Phase, ReasoningStep, ToolCall, ToolCallRequest, ToolExecutor, ToolResult,
};
use codewright_protocol::ToolCallProtocolParser;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

const DEFAULT_SYSTEM_PROMPT: &str = "You are an autonomous coding agent working inside a \
    sandboxed workspace. Work on the task step by step using the available tools. Read before \
    you write, make the smallest change that satisfies the task, and verify your work. When the \
    task is done, reply with a concrete final answer and no tool calls.";

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The task looks satisfied and the model gave a final answer.
    Completed,
    /// The iteration cap was reached first.
    IterationCap,
    /// The wall-clock budget ran out.
    WallClockExceeded,
    /// Too many consecutive tool failures.
    TooManyFailures,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Completed => "completed",
            StopReason::IterationCap => "iteration-cap",
            StopReason::WallClockExceeded => "wall-clock",
            StopReason::TooManyFailures => "too-many-failures",
        }
    }
}

/// What a finished run hands back to its caller.
#[derive(Debug)]
pub struct RunOutcome {
    /// The final assistant answer (or run summary when the model never
    /// produced one).
    pub answer: String,
    pub stop_reason: StopReason,
    pub iterations: u32,
    /// Final run state, for reporting and delegation.
    pub state: AgentState,
}

/// The control loop. One instance can run many tasks; each run owns
/// fresh state, history, and scratch storage.
pub struct AgentLoopController {
    client: Arc<dyn ModelClient>,
    executor: Arc<dyn ToolExecutor>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: String,
    policy: PolicyConfig,
    events: Arc<EventBus>,
    parser: ToolCallProtocolParser,
    oracle: TaskCompletionOracle,
}

impl AgentLoopController {
    pub fn new(
        client: Arc<dyn ModelClient>,
        executor: Arc<dyn ToolExecutor>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            executor,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            policy: PolicyConfig::default(),
            events: Arc::new(EventBus::default()),
            parser: ToolCallProtocolParser::default(),
            oracle: TaskCompletionOracle::new(),
        }
    }

    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Run one task to completion or to a policy stop.
    ///
    /// Fatal model errors (unreachable endpoint, bad credentials)
    /// propagate as `Err`; everything else resolves to a [`RunOutcome`].
    pub async fn run(&self, task: &str) -> Result<RunOutcome, ModelError> {
        let mut state = AgentState::new(task, self.policy.loop_window);
        let mut history = History::new();
        history.push(Message::user(task));

        let mut scratch = ScratchStore::new();
        let compactor = ContextCompactor::new(
            self.policy.compact_threshold,
            self.policy.keep_recent,
            self.policy.evict_over_chars,
            self.policy.preview_chars,
        );
        let detector = LoopDetector::new(self.policy.loop_window, self.policy.loop_repeat_threshold);
        let deadline = Instant::now() + Duration::from_secs(self.policy.wall_clock_secs);

        let mut consecutive_failures: u32 = 0;
        let mut generic_nudged = false;
        let mut completion_nudged = false;

        self.events.publish(AgentEvent::RunStarted {
            task_preview: task.chars().take(80).collect(),
            timestamp: Utc::now(),
        });

        for iteration in 1..=self.policy.max_iterations {
            if Instant::now() >= deadline {
                return Ok(self.finish(
                    StopReason::WallClockExceeded,
                    answer_from(&history, &state),
                    iteration - 1,
                    state,
                ));
            }

            if let Some(report) = compactor.compact(&mut history) {
                self.events.publish(AgentEvent::HistoryCompacted {
                    messages_before: report.messages_before,
                    messages_after: report.messages_after,
                    timestamp: Utc::now(),
                });
            }

            self.events.publish(AgentEvent::PhaseChanged {
                iteration,
                phase: "think".into(),
                timestamp: Utc::now(),
            });

            let mut request = ModelRequest::new(&self.model, self.prompt_messages(&history));
            request.temperature = self.temperature;
            request.max_tokens = self.max_tokens;
            // The catalog is attached unconditionally; clients without
            // structured calling render it into the prompt themselves.
            request.tools = self.executor.catalog();

            let remaining = deadline.saturating_duration_since(Instant::now());
            let response =
                match tokio::time::timeout(remaining, self.client.complete(request)).await {
                    Err(_) => {
                        return Ok(self.finish(
                            StopReason::WallClockExceeded,
                            answer_from(&history, &state),
                            iteration,
                            state,
                        ));
                    }
                    Ok(Err(error)) if error.is_fatal() => {
                        warn!(%error, "fatal model error, aborting run");
                        self.events.publish(AgentEvent::RunFinished {
                            outcome: "fatal-model-error".into(),
                            iterations: iteration,
                            timestamp: Utc::now(),
                        });
                        return Err(error);
                    }
                    Ok(Err(error)) => {
                        // Malformed reply: ask again rather than abort.
                        warn!(%error, "unusable model reply");
                        consecutive_failures += 1;
                        if consecutive_failures >= self.policy.max_consecutive_failures {
                            return Ok(self.finish(
                                StopReason::TooManyFailures,
                                answer_from(&history, &state),
                                iteration,
                                state,
                            ));
                        }
                        history.push(Message::user(
                            "Your last reply could not be parsed. Answer again, following the \
                             requested format.",
                        ));
                        continue;
                    }
                    Ok(Ok(response)) => response,
                };

            let calls = self.resolve_calls(&response.content, &response.tool_calls);

            let mut assistant = Message::assistant(response.content.clone());
            assistant.tool_calls = calls
                .iter()
                .map(|call| ToolCallRequest {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.to_string(),
                })
                .collect();
            history.push(assistant);

            if calls.is_empty() {
                if nudge::is_generic_reply(&response.content) && !generic_nudged {
                    generic_nudged = true;
                    debug!(iteration, "generic reply, steering back to task");
                    history.push(Message::user(nudge::generic_reply_nudge(task)));
                    self.events.publish(AgentEvent::GuidanceInjected {
                        reason: "generic-reply".into(),
                        timestamp: Utc::now(),
                    });
                    continue;
                }
                if self.oracle.requires_mutation(task)
                    && !state.has_mutations()
                    && !completion_nudged
                {
                    completion_nudged = true;
                    history.push(Message::user(
                        "The task requires changing the workspace, but nothing has been \
                         modified yet. Make the change before finishing.",
                    ));
                    self.events.publish(AgentEvent::GuidanceInjected {
                        reason: "no-mutation-before-finish".into(),
                        timestamp: Utc::now(),
                    });
                    continue;
                }

                state.record_step(ReasoningStep {
                    thought: response.content.clone(),
                    action: None,
                    observation: "final answer".into(),
                    next_phase: Phase::Complete,
                });
                return Ok(self.finish(StopReason::Completed, response.content, iteration, state));
            }

            self.events.publish(AgentEvent::PhaseChanged {
                iteration,
                phase: "act".into(),
                timestamp: Utc::now(),
            });

            for call in &calls {
                let started = std::time::Instant::now();
                let result = if call.name == "read_scratch" {
                    read_scratch(call, &scratch)
                } else {
                    self.executor.execute(call).await
                };
                self.events.publish(AgentEvent::ToolExecuted {
                    tool_name: call.name.clone(),
                    success: result.success,
                    duration_ms: started.elapsed().as_millis() as u64,
                    timestamp: Utc::now(),
                });

                let mutating = self.executor.is_mutating(&call.name);
                state.record_action(ActionRecord {
                    key: normalize_key(&call.name, &call.arguments),
                    mutating,
                    success: result.success,
                });

                let mut already_satisfied = false;
                if result.success {
                    consecutive_failures = 0;
                    match call.arguments["path"].as_str() {
                        Some(path) if mutating => state.record_mutation(path),
                        Some(path) => state.record_read(path),
                        // Shell commands and delegation mutate without
                        // naming a file; they still count.
                        None if mutating => state.record_unnamed_mutation(),
                        None => {}
                    }
                } else {
                    let error_text = result.observation_text();
                    if is_already_satisfied(error_text) {
                        // The goal state already holds; not a failure.
                        already_satisfied = true;
                    } else {
                        consecutive_failures += 1;
                        state.record_error(format!("{}: {error_text}", call.name));
                    }
                }

                let observation = result.observation_text().to_string();
                let original_chars = observation.len();
                let (text, evicted) = compactor.evict_if_large(observation, &mut scratch);
                if let Some(scratch_key) = evicted {
                    self.events.publish(AgentEvent::ResultEvicted {
                        scratch_key,
                        original_chars,
                        timestamp: Utc::now(),
                    });
                }

                state.record_step(ReasoningStep {
                    thought: response.content.clone(),
                    action: Some(format!("{}({})", call.name, call.arguments)),
                    observation: text.chars().take(200).collect(),
                    next_phase: Phase::Act,
                });
                history.push(Message::tool_result(&result.call_id, &text));

                if already_satisfied {
                    let brief: String = text.chars().take(120).collect();
                    history.push(Message::user(nudge::already_satisfied_nudge(&brief)));
                    self.events.publish(AgentEvent::GuidanceInjected {
                        reason: "already-satisfied".into(),
                        timestamp: Utc::now(),
                    });
                }

                if consecutive_failures >= self.policy.max_consecutive_failures {
                    return Ok(self.finish(
                        StopReason::TooManyFailures,
                        answer_from(&history, &state),
                        iteration,
                        state,
                    ));
                }
            }

            if let Some(kind) = detector.detect(&state.recent_actions) {
                self.events.publish(AgentEvent::LoopDetected {
                    pattern: kind.label().into(),
                    timestamp: Utc::now(),
                });
                if self.oracle.looks_complete(&state) {
                    // Spinning on a satisfied task: stop here.
                    return Ok(self.finish(
                        StopReason::Completed,
                        answer_from(&history, &state),
                        iteration,
                        state,
                    ));
                }
                history.push(Message::user(nudge::loop_nudge(&kind, task)));
                self.events.publish(AgentEvent::GuidanceInjected {
                    reason: kind.label().into(),
                    timestamp: Utc::now(),
                });
                // Fresh window so the nudge gets a chance to land.
                state.recent_actions.clear();
            }
        }

        let iterations = self.policy.max_iterations;
        Ok(self.finish(
            StopReason::IterationCap,
            answer_from(&history, &state),
            iterations,
            state,
        ))
    }

    /// Structured calls win; otherwise recover from free text.
    fn resolve_calls(&self, content: &str, structured: &[ToolCallRequest]) -> Vec<ToolCall> {
        if !structured.is_empty() {
            return structured
                .iter()
                .map(|tc| ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: serde_json::from_str(&tc.arguments)
                        .unwrap_or_else(|_| serde_json::json!({})),
                })
                .collect();
        }
        self.parser.parse(content)
    }

    fn prompt_messages(&self, history: &History) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(history.messages.iter().cloned());
        messages
    }

    fn finish(
        &self,
        stop_reason: StopReason,
        answer: String,
        iterations: u32,
        state: AgentState,
    ) -> RunOutcome {
        self.events.publish(AgentEvent::RunFinished {
            outcome: stop_reason.as_str().into(),
            iterations,
            timestamp: Utc::now(),
        });
        RunOutcome {
            answer,
            stop_reason,
            iterations,
            state,
        }
    }
}

/// Serve an evicted result back from the scratch store.
fn read_scratch(call: &ToolCall, scratch: &ScratchStore) -> ToolResult {
    match call.arguments["key"]
        .as_str()
        .and_then(|key| scratch.retrieve(key))
    {
        Some(content) => ToolResult::ok(&call.id, content),
        None => ToolResult::failure(&call.id, "No scratch entry under that key"),
    }
}

/// Whether a failure means the goal state already holds.
fn is_already_satisfied(error_text: &str) -> bool {
    let lowered = error_text.to_lowercase();
    lowered.contains("already exists") || lowered.contains("file exists")
}

/// Best available answer when the run stops without a final reply.
fn answer_from(history: &History, state: &AgentState) -> String {
    history
        .last_assistant()
        .map(|m| m.content.clone())
        .filter(|content| !content.trim().is_empty())
        .unwrap_or_else(|| state.summarize())
}
