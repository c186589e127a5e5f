//! Briefing orchestrator: drives the analysis units through a small state
//! machine and merges their results.
//!
//! # Flow
//!
//! ```text
//! start ─► email ─► calendar ─► social ─► priority ─► end
//!          └──────── fan-out ───────┘ (parallel_units)
//! ```
//!
//! The coordinator node advances [`Step`]s; [`route_to_unit`] picks the node
//! for each step. Unit nodes write their own slot in [`BriefingState`] and
//! nothing else. A unit that fails still produces an error-status result,
//! so the run always reaches `end`.
//!
//! With `parallel_units` the three source units run concurrently and their
//! results are applied in email, calendar, social order before the
//! synthesizer runs. A failed unit never cancels its siblings since unit
//! calls cannot fail.
//!
//! Only state plumbing can fail (step budget exhausted, a slot left empty).
//! [`Orchestrator::get_daily_briefing`] turns that into a degraded
//! [`BriefingResponse`] instead of an error.

pub mod response;
pub mod routing;
pub mod state;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::agents::{AnalysisUnit, Analyst, PriorityAnalyst};
use crate::completion::CompletionModel;
use crate::error::{Error, Result};
use crate::models::{AgentType, AnalysisResult};
use crate::pipeline::RetrievalPipeline;
use crate::tools::{truncate_preview, ToolBox, ToolOutput};

pub use response::{BriefingResponse, WorkflowStatus};
pub use routing::{advance, route_to_unit, DirectRouting, Node, RoutingPolicy};
pub use state::{BriefingState, Step};

const CONTEXT_PREVIEW_CHARS: usize = 300;

const SOCIAL_DOCUMENT_TYPES: &[&str] =
    &["instagram", "whatsapp", "telegram", "social", "message", "chat"];

/// Tunables for a briefing run.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Run email, calendar and social concurrently.
    pub parallel_units: bool,
    /// Recent documents of the unit's own source appended to each unit
    /// prompt. `0` disables retrieval context.
    pub context_documents: usize,
    /// Node executions allowed before the run is abandoned.
    pub max_steps: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            parallel_units: true,
            context_documents: 10,
            max_steps: 32,
        }
    }
}

pub struct Orchestrator {
    email: Analyst,
    calendar: Analyst,
    social: Analyst,
    priority: PriorityAnalyst,
    pipeline: Option<Arc<RetrievalPipeline>>,
    tools: Option<ToolBox>,
    routing: Box<dyn RoutingPolicy>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    /// All four units share `model`. No retrieval pipeline, direct routing.
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            email: Analyst::email(model.clone()),
            calendar: Analyst::calendar(model.clone()),
            social: Analyst::social(model.clone()),
            priority: PriorityAnalyst::new(model),
            pipeline: None,
            tools: None,
            routing: Box::new(DirectRouting),
            options: OrchestratorOptions::default(),
        }
    }

    /// Attach a pipeline for retrieval context and the tool node.
    pub fn with_pipeline(mut self, pipeline: Arc<RetrievalPipeline>) -> Self {
        self.tools = Some(ToolBox::new(pipeline.clone()));
        self.pipeline = Some(pipeline);
        self
    }

    pub fn with_routing(mut self, routing: impl RoutingPolicy + 'static) -> Self {
        self.routing = Box::new(routing);
        self
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Produce the daily briefing for `user_id`. Never fails.
    pub async fn get_daily_briefing(&self, user_id: i64) -> BriefingResponse {
        self.run_briefing(BriefingState::new(user_id)).await
    }

    /// Drive an already-built state to completion.
    pub async fn run_briefing(&self, state: BriefingState) -> BriefingResponse {
        let user_id = state.user_id;
        let run_id = state.run_id;
        info!(%run_id, user_id, "starting daily briefing");

        match self.drive(state).await.and_then(BriefingResponse::from_state) {
            Ok(response) => {
                let failed = response.insights().iter().filter(|r| r.is_error()).count();
                info!(%run_id, user_id, failed_units = failed, "daily briefing completed");
                response
            }
            Err(e) => {
                error!(%run_id, user_id, error = %e, "daily briefing workflow failed");
                BriefingResponse::degraded(user_id, &e.to_string())
            }
        }
    }

    /// Single-document analysis, routed to a unit by `document_type`.
    ///
    /// `email` and `calendar` go to their units, chat-like types to the
    /// social unit, anything else to the synthesizer.
    pub async fn analyze_document(&self, content: &str, document_type: &str) -> AnalysisResult {
        info!(document_type, "analyzing document");
        let kind = document_type.to_lowercase();
        let result = match kind.as_str() {
            "email" => {
                self.email
                    .analyze(&format!(
                        "Analyze this email for urgency, importance, and action items:\n\n{content}"
                    ))
                    .await
            }
            "calendar" => {
                self.calendar
                    .analyze(&format!(
                        "Analyze this calendar event for importance and scheduling considerations:\n\n{content}"
                    ))
                    .await
            }
            k if SOCIAL_DOCUMENT_TYPES.contains(&k) => {
                self.social.analyze_message(content, document_type).await
            }
            _ => self.priority.analyze_document(content, document_type).await,
        };
        result.with_document_type(document_type)
    }

    async fn drive(&self, mut state: BriefingState) -> Result<BriefingState> {
        let mut node = Node::Coordinator;

        for _ in 0..self.options.max_steps {
            node = match node {
                Node::Coordinator => {
                    let from = state.current_step;
                    state.current_step = advance(from);
                    debug!(run_id = %state.run_id, ?from, to = ?state.current_step, "coordinator");
                    route_to_unit(state.current_step)
                }
                Node::Unit(AgentType::Priority) => {
                    self.priority_node(&mut state).await;
                    Node::Coordinator
                }
                Node::Unit(AgentType::Email) if self.options.parallel_units => {
                    self.fan_out(&mut state).await;
                    self.after_unit(AgentType::Social, &mut state)
                }
                Node::Unit(agent_type) => {
                    let result = self
                        .source_unit(self.analyst(agent_type)?, state.user_id, &state.tool_outputs)
                        .await;
                    state.record(result);
                    self.after_unit(agent_type, &mut state)
                }
                Node::Tools => {
                    self.tool_node(&mut state).await;
                    Node::Coordinator
                }
                Node::End => return Ok(state),
            };
        }

        Err(Error::Workflow(format!(
            "briefing did not finish within {} steps (stuck at {:?})",
            self.options.max_steps, state.current_step
        )))
    }

    fn analyst(&self, agent_type: AgentType) -> Result<&Analyst> {
        match agent_type {
            AgentType::Email => Ok(&self.email),
            AgentType::Calendar => Ok(&self.calendar),
            AgentType::Social => Ok(&self.social),
            AgentType::Priority => Err(Error::Workflow(
                "priority is not a source unit".to_string(),
            )),
        }
    }

    fn after_unit(&self, finished: AgentType, state: &mut BriefingState) -> Node {
        let calls = self.routing.tool_calls_after(finished, state);
        if calls.is_empty() {
            return Node::Coordinator;
        }
        debug!(run_id = %state.run_id, count = calls.len(), "routing to tools");
        state.pending_tool_calls.extend(calls);
        Node::Tools
    }

    async fn fan_out(&self, state: &mut BriefingState) {
        debug!(run_id = %state.run_id, "running source units concurrently");
        let (email, calendar, social) = futures::join!(
            self.source_unit(&self.email, state.user_id, &state.tool_outputs),
            self.source_unit(&self.calendar, state.user_id, &state.tool_outputs),
            self.source_unit(&self.social, state.user_id, &state.tool_outputs),
        );
        state.record(email);
        state.record(calendar);
        state.record(social);
    }

    async fn source_unit(
        &self,
        unit: &Analyst,
        user_id: i64,
        tool_outputs: &[ToolOutput],
    ) -> AnalysisResult {
        info!(agent_type = %unit.agent_type(), user_id, "running analysis unit");
        let mut prompt = unit.daily_prompt().to_string();

        if let Some(context) = self.retrieval_context(unit.agent_type(), user_id).await {
            prompt.push_str("\n\n");
            prompt.push_str(&context);
        }
        if !tool_outputs.is_empty() {
            prompt.push_str("\n\nTool results:\n");
            for out in tool_outputs {
                prompt.push_str(&format!("[{}]\n{}\n", out.tool, out.output));
            }
        }

        unit.analyze(&prompt).await
    }

    /// The user's newest documents of `agent_type`'s source, formatted for a prompt.
    async fn retrieval_context(&self, agent_type: AgentType, user_id: i64) -> Option<String> {
        let pipeline = self.pipeline.as_ref()?;
        if self.options.context_documents == 0 {
            return None;
        }

        let docs = match pipeline.get_user_documents(user_id, usize::MAX).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(agent_type = %agent_type, error = %e, "retrieval context unavailable");
                return None;
            }
        };

        let source = agent_type.as_str();
        let lines: Vec<String> = docs
            .iter()
            .filter(|d| d.metadata.get("source").and_then(Value::as_str) == Some(source))
            .take(self.options.context_documents)
            .map(|d| {
                let ts = d
                    .metadata
                    .get("timestamp")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                format!("- [{}] {}", ts, truncate_preview(&d.content, CONTEXT_PREVIEW_CHARS))
            })
            .collect();

        if lines.is_empty() {
            return None;
        }
        debug!(agent_type = %agent_type, documents = lines.len(), "attached retrieval context");
        Some(format!("Recent {} documents:\n{}", source, lines.join("\n")))
    }

    async fn priority_node(&self, state: &mut BriefingState) {
        info!(run_id = %state.run_id, "running priority synthesis");
        let text = |t: AgentType, fallback: &'static str| {
            state
                .slot(t)
                .map(|r| r.analysis.clone())
                .unwrap_or_else(|| fallback.to_string())
        };
        let email = text(AgentType::Email, "No email analysis");
        let calendar = text(AgentType::Calendar, "No calendar analysis");
        let social = text(AgentType::Social, "No social analysis");

        let result = self.priority.create_briefing(&email, &calendar, &social).await;
        state.record(result);
    }

    async fn tool_node(&self, state: &mut BriefingState) {
        let calls = std::mem::take(&mut state.pending_tool_calls);
        for call in calls {
            let output = match &self.tools {
                Some(tools) => tools.run(state.user_id, &call).await,
                None => ToolOutput {
                    tool: call.name().to_string(),
                    output: "Tool unavailable: no retrieval pipeline configured".to_string(),
                },
            };
            debug!(run_id = %state.run_id, tool = %output.tool, "tool call finished");
            state.tool_outputs.push(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunker;
    use crate::completion::{ChatMessage, Role};
    use crate::embedding::HashEmbedder;
    use crate::models::{AnalysisStatus, Metadata};
    use crate::store::memory::InMemoryIndex;
    use crate::tools::ToolCall;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with the first word of the system prompt's persona, and
    /// keeps every user prompt.
    struct EchoModel {
        prompts: Mutex<Vec<String>>,
    }

    impl EchoModel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionModel for EchoModel {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
            let system = &messages[0].content;
            let user = messages
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(user);
            let persona = ["Email", "Calendar", "Social", "Master"]
                .into_iter()
                .find(|p| system.contains(p))
                .unwrap_or("unknown");
            Ok(format!("{persona} says ok"))
        }
    }

    struct DownModel;

    #[async_trait]
    impl CompletionModel for DownModel {
        fn model_name(&self) -> &str {
            "down"
        }

        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String> {
            Err(Error::ModelInvocation("connection refused".into()))
        }
    }

    fn sequential() -> OrchestratorOptions {
        OrchestratorOptions {
            parallel_units: false,
            ..OrchestratorOptions::default()
        }
    }

    #[tokio::test]
    async fn test_briefing_fills_every_slot() {
        for options in [sequential(), OrchestratorOptions::default()] {
            let model = EchoModel::new();
            let orchestrator = Orchestrator::new(model.clone()).with_options(options);
            let r = orchestrator.get_daily_briefing(7).await;

            assert_eq!(r.workflow_status, WorkflowStatus::Completed);
            assert_eq!(r.user_id, 7);
            assert_eq!(r.email_insights.analysis, "Email says ok");
            assert_eq!(r.calendar_insights.analysis, "Calendar says ok");
            assert_eq!(r.social_insights.analysis, "Social says ok");
            assert_eq!(r.priority_recommendations.analysis, "Master says ok");
            assert_eq!(r.summary, "Master says ok");

            let prompts = model.prompts();
            assert_eq!(prompts.len(), 4);
            let synthesis = prompts.last().unwrap();
            assert!(synthesis.contains("Email Analysis: Email says ok"));
            assert!(synthesis.contains("Calendar Analysis: Calendar says ok"));
            assert!(synthesis.contains("Social Messaging Analysis: Social says ok"));
        }
    }

    #[tokio::test]
    async fn test_briefing_survives_total_model_failure() {
        for options in [sequential(), OrchestratorOptions::default()] {
            let orchestrator = Orchestrator::new(Arc::new(DownModel)).with_options(options);
            let r = orchestrator.get_daily_briefing(1).await;

            assert_eq!(r.workflow_status, WorkflowStatus::Completed);
            for slot in r.insights() {
                assert_eq!(slot.status, AnalysisStatus::Error);
                assert!(slot.analysis.contains("connection refused"));
            }
            assert!(r.summary.starts_with("Priority analysis failed:"));
        }
    }

    #[tokio::test]
    async fn test_step_budget_gives_degraded_response() {
        let orchestrator = Orchestrator::new(EchoModel::new()).with_options(OrchestratorOptions {
            max_steps: 3,
            ..sequential()
        });
        let r = orchestrator.get_daily_briefing(5).await;

        assert_eq!(r.workflow_status, WorkflowStatus::Error);
        let err = r.error.clone().unwrap();
        assert!(err.contains("did not finish"));
        assert_eq!(r.summary, err);
        assert!(r.insights().iter().all(|s| s.is_error()));
    }

    struct SearchAfterEmail;

    impl RoutingPolicy for SearchAfterEmail {
        fn tool_calls_after(&self, finished: AgentType, _state: &BriefingState) -> Vec<ToolCall> {
            if finished == AgentType::Email {
                vec![ToolCall::DocumentStats]
            } else {
                Vec::new()
            }
        }
    }

    fn meta(v: Value) -> Metadata {
        v.as_object().cloned().unwrap()
    }

    async fn pipeline_with_docs() -> Arc<RetrievalPipeline> {
        let index = InMemoryIndex::new("briefing", Arc::new(HashEmbedder::default()));
        let pipeline = Arc::new(RetrievalPipeline::new(Chunker::default(), Arc::new(index)));
        pipeline
            .add_text(
                "Invoice 442 is overdue",
                meta(json!({"source": "email", "user_id": 3, "timestamp": "2025-01-02T00:00:00Z"})),
            )
            .await
            .unwrap();
        pipeline
            .add_text(
                "Board meeting at 10",
                meta(json!({"source": "calendar", "user_id": 3, "timestamp": "2025-01-02T00:00:00Z"})),
            )
            .await
            .unwrap();
        pipeline
            .add_text(
                "Someone else's email",
                meta(json!({"source": "email", "user_id": 4, "timestamp": "2025-01-02T00:00:00Z"})),
            )
            .await
            .unwrap();
        pipeline
    }

    #[tokio::test]
    async fn test_tool_step_runs_when_policy_asks() {
        let model = EchoModel::new();
        let orchestrator = Orchestrator::new(model.clone())
            .with_pipeline(pipeline_with_docs().await)
            .with_routing(SearchAfterEmail)
            .with_options(OrchestratorOptions {
                context_documents: 0,
                ..sequential()
            });

        let r = orchestrator.get_daily_briefing(3).await;
        assert_eq!(r.workflow_status, WorkflowStatus::Completed);

        let prompts = model.prompts();
        assert!(!prompts[0].contains("Tool results"));
        assert!(prompts[1].contains("[document_stats]"));
        assert!(prompts[1].contains("total_count=3"));
    }

    #[tokio::test]
    async fn test_units_receive_own_source_context() {
        let model = EchoModel::new();
        let orchestrator = Orchestrator::new(model.clone())
            .with_pipeline(pipeline_with_docs().await)
            .with_options(sequential());

        orchestrator.get_daily_briefing(3).await;
        let prompts = model.prompts();

        assert!(prompts[0].contains("Recent email documents:"));
        assert!(prompts[0].contains("Invoice 442 is overdue"));
        assert!(!prompts[0].contains("Someone else's email"));
        assert!(!prompts[0].contains("Board meeting"));
        assert!(prompts[1].contains("Board meeting at 10"));
        assert!(!prompts[2].contains("Recent social documents"));
    }

    #[tokio::test]
    async fn test_analyze_document_routing() {
        let orchestrator = Orchestrator::new(EchoModel::new());
        let cases = [
            ("email", AgentType::Email, "Email says ok"),
            ("calendar", AgentType::Calendar, "Calendar says ok"),
            ("WhatsApp", AgentType::Social, "Social says ok"),
            ("chat", AgentType::Social, "Social says ok"),
            ("report", AgentType::Priority, "Master says ok"),
        ];
        for (doc_type, expected, text) in cases {
            let r = orchestrator.analyze_document("body", doc_type).await;
            assert_eq!(r.agent_type, expected, "routing {doc_type}");
            assert_eq!(r.analysis, text);
            assert_eq!(r.document_type.as_deref(), Some(doc_type));
        }
    }
}
