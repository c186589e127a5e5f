//! Analysis units: one persona per information source plus a synthesizer.
//!
//! Each unit pairs a fixed system prompt with a shared
//! [`CompletionModel`] and turns prompts into [`AnalysisResult`]s. A unit
//! never returns an error: model failures are folded into an
//! error-status result whose text reads `"<Label> analysis failed: <cause>"`,
//! so a briefing can always be assembled from whatever succeeded.
//!
//! # Units
//!
//! | Constructor | Agent type | Extra operations |
//! |-------------|------------|------------------|
//! | [`Analyst::email`] | `email` | |
//! | [`Analyst::calendar`] | `calendar` | |
//! | [`Analyst::social`] | `social` | [`Analyst::analyze_message`] |
//! | [`PriorityAnalyst::new`] | `priority` | [`create_briefing`](PriorityAnalyst::create_briefing), [`analyze_document`](PriorityAnalyst::analyze_document) |
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use daybrief_core::agents::{AnalysisUnit, Analyst};
//! use daybrief_core::completion::DisabledCompletion;
//!
//! # tokio_test_block_on(async {
//! let email = Analyst::email(Arc::new(DisabledCompletion));
//! let result = email.get_daily_insights().await;
//! assert!(result.is_error());
//! assert!(result.analysis.starts_with("Email analysis failed:"));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::completion::{ChatMessage, CompletionModel};
use crate::models::{AgentType, AnalysisResult};

/// Text used when the model answers with nothing.
pub const NO_ANALYSIS: &str = "No analysis available";

// ═══════════════════════════════════════════════════════════════════════
// Prompts
// ═══════════════════════════════════════════════════════════════════════

const EMAIL_SYSTEM_PROMPT: &str = "You are an Email Triage Agent. Your role is to:
1. Analyze emails for urgency and importance
2. Identify action items and deadlines
3. Categorize emails by type (work, personal, newsletters, etc.)
4. Flag emails that require immediate attention

Be concise but thorough in your analysis.";

const CALENDAR_SYSTEM_PROMPT: &str = "You are a Calendar Analysis Agent. Your role is to:
1. Analyze upcoming meetings and events
2. Identify scheduling conflicts
3. Suggest optimal time management
4. Highlight important deadlines and commitments

Focus on helping the user manage their time effectively.";

const SOCIAL_SYSTEM_PROMPT: &str = "You are a Social Media & Messaging Agent. Your role is to:
1. Analyze messages from Instagram, WhatsApp, Telegram, and other messaging platforms
2. Identify urgent messages that need immediate replies
3. Detect important conversations (work-related, family emergencies, deadlines)
4. Flag messages from VIP contacts (boss, family, important clients)
5. Categorize messages by urgency: URGENT, IMPORTANT, NORMAL, LOW_PRIORITY
6. Identify action items and follow-ups needed
7. Detect emotional context (angry customers, upset friends, celebrations)

Focus on helping the user prioritize their social interactions and never miss important messages.
Pay special attention to:
- Work-related messages during business hours
- Family/emergency messages anytime
- Time-sensitive opportunities
- Messages from people the user frequently interacts with";

const PRIORITY_SYSTEM_PROMPT: &str = "You are the Master Prioritization Agent. Your role is to:
1. Synthesize insights from email, calendar, and social messaging analysis
2. Create a prioritized daily briefing
3. Identify the most important tasks and deadlines
4. Provide actionable recommendations
5. Balance professional and personal priorities

Be strategic and focus on what matters most to the user.";

const EMAIL_DAILY_PROMPT: &str = "Analyze recent emails for urgent items, action items, and important communications. Provide a summary of key findings.";

const CALENDAR_DAILY_PROMPT: &str = "Analyze upcoming calendar events, meetings, and deadlines. Identify any conflicts or important items requiring attention.";

const SOCIAL_DAILY_PROMPT: &str = "Analyze recent messages from Instagram, WhatsApp, Telegram and other messaging platforms. Identify urgent messages, important conversations, and messages that need immediate replies. Focus on work-related messages, family communications, and time-sensitive opportunities.";

const PRIORITY_DAILY_PROMPT: &str = "Review the user's current commitments and produce a prioritized list of today's most important tasks and deadlines with actionable recommendations.";

fn system_prompt(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::Email => EMAIL_SYSTEM_PROMPT,
        AgentType::Calendar => CALENDAR_SYSTEM_PROMPT,
        AgentType::Social => SOCIAL_SYSTEM_PROMPT,
        AgentType::Priority => PRIORITY_SYSTEM_PROMPT,
    }
}

fn daily_prompt(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::Email => EMAIL_DAILY_PROMPT,
        AgentType::Calendar => CALENDAR_DAILY_PROMPT,
        AgentType::Social => SOCIAL_DAILY_PROMPT,
        AgentType::Priority => PRIORITY_DAILY_PROMPT,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// AnalysisUnit Trait
// ═══════════════════════════════════════════════════════════════════════

/// A model-backed persona producing [`AnalysisResult`]s.
///
/// Both operations are infallible by contract: implementations convert
/// every failure into an error-status result.
#[async_trait]
pub trait AnalysisUnit: Send + Sync {
    fn agent_type(&self) -> AgentType;

    /// The fixed prompt used by [`get_daily_insights`](AnalysisUnit::get_daily_insights).
    fn daily_prompt(&self) -> &str;

    /// Run one prompt through the model.
    async fn analyze(&self, prompt: &str) -> AnalysisResult;

    /// Run the unit's daily prompt.
    async fn get_daily_insights(&self) -> AnalysisResult {
        self.analyze(self.daily_prompt()).await
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Analyst
// ═══════════════════════════════════════════════════════════════════════

/// A single-source analysis unit (email, calendar or social).
pub struct Analyst {
    agent_type: AgentType,
    model: Arc<dyn CompletionModel>,
}

impl Analyst {
    pub fn new(agent_type: AgentType, model: Arc<dyn CompletionModel>) -> Self {
        Self { agent_type, model }
    }

    pub fn email(model: Arc<dyn CompletionModel>) -> Self {
        Self::new(AgentType::Email, model)
    }

    pub fn calendar(model: Arc<dyn CompletionModel>) -> Self {
        Self::new(AgentType::Calendar, model)
    }

    pub fn social(model: Arc<dyn CompletionModel>) -> Self {
        Self::new(AgentType::Social, model)
    }

    /// Assess one message from `platform` for urgency and required replies.
    pub async fn analyze_message(&self, content: &str, platform: &str) -> AnalysisResult {
        let prompt = format!(
            "Analyze this {platform} message for urgency, importance, emotional context, and required actions. Identify if this needs immediate reply:\n\n{content}"
        );
        self.analyze(&prompt).await
    }
}

#[async_trait]
impl AnalysisUnit for Analyst {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    fn daily_prompt(&self) -> &str {
        daily_prompt(self.agent_type)
    }

    async fn analyze(&self, prompt: &str) -> AnalysisResult {
        let messages = [
            ChatMessage::system(system_prompt(self.agent_type)),
            ChatMessage::user(prompt),
        ];
        debug!(
            agent = %self.agent_type,
            model = self.model.model_name(),
            "invoking completion model"
        );

        match self.model.invoke(&messages).await {
            Ok(text) if text.trim().is_empty() => {
                AnalysisResult::completed(self.agent_type, NO_ANALYSIS)
            }
            Ok(text) => AnalysisResult::completed(self.agent_type, text),
            Err(e) => {
                warn!(agent_type = %self.agent_type, error = %e, "analysis failed");
                AnalysisResult::error(
                    self.agent_type,
                    format!("{} analysis failed: {}", self.agent_type.label(), e),
                )
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PriorityAnalyst
// ═══════════════════════════════════════════════════════════════════════

/// The synthesizer: merges the three source analyses into one briefing.
pub struct PriorityAnalyst {
    inner: Analyst,
}

impl PriorityAnalyst {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            inner: Analyst::new(AgentType::Priority, model),
        }
    }

    /// Build the prioritized briefing from the three source analyses.
    ///
    /// Failure strings from earlier units are passed through verbatim; the
    /// model sees them as part of the context.
    pub async fn create_briefing(
        &self,
        email_analysis: &str,
        calendar_analysis: &str,
        social_analysis: &str,
    ) -> AnalysisResult {
        let prompt = format!(
            "Based on the following analysis, create a prioritized daily briefing with actionable recommendations:\n\
             Email Analysis: {email_analysis}\n\
             Calendar Analysis: {calendar_analysis}\n\
             Social Messaging Analysis: {social_analysis}\n"
        );
        self.analyze(&prompt).await
    }

    /// General-purpose analysis of a document of any type.
    pub async fn analyze_document(&self, content: &str, document_type: &str) -> AnalysisResult {
        let prompt =
            format!("Analyze this {document_type} document and provide insights:\n\n{content}");
        self.analyze(&prompt).await
    }
}

#[async_trait]
impl AnalysisUnit for PriorityAnalyst {
    fn agent_type(&self) -> AgentType {
        AgentType::Priority
    }

    fn daily_prompt(&self) -> &str {
        self.inner.daily_prompt()
    }

    async fn analyze(&self, prompt: &str) -> AnalysisResult {
        self.inner.analyze(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Role;
    use crate::error::{Error, Result};
    use crate::models::AnalysisStatus;
    use std::sync::Mutex;

    /// Records every request and answers with a fixed reply.
    struct Recorder {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl Recorder {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(cause: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(cause.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_user_prompt(&self) -> String {
            let seen = self.seen.lock().unwrap();
            let last = seen.last().unwrap();
            last.iter()
                .find(|m| m.role == Role::User)
                .unwrap()
                .content
                .clone()
        }
    }

    #[async_trait]
    impl CompletionModel for Recorder {
        fn model_name(&self) -> &str {
            "recorder"
        }

        async fn invoke(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.reply.clone().map_err(Error::ModelInvocation)
        }
    }

    #[tokio::test]
    async fn test_successful_analysis() {
        let model = Recorder::ok("Two urgent emails from your manager.");
        let unit = Analyst::email(model.clone());
        let result = unit.get_daily_insights().await;

        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(result.agent_type, AgentType::Email);
        assert_eq!(result.analysis, "Two urgent emails from your manager.");
        assert!(result.timestamp.is_some());
        assert_eq!(model.last_user_prompt(), EMAIL_DAILY_PROMPT);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0][0].role, Role::System);
        assert!(seen[0][0].content.starts_with("You are an Email Triage Agent"));
    }

    #[tokio::test]
    async fn test_failure_becomes_error_result() {
        let unit = Analyst::calendar(Recorder::failing("rate limited"));
        let result = unit.get_daily_insights().await;

        assert!(result.is_error());
        assert_eq!(result.agent_type, AgentType::Calendar);
        assert!(result.analysis.starts_with("Calendar analysis failed:"));
        assert!(result.analysis.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_blank_reply_is_placeholder() {
        let unit = Analyst::social(Recorder::ok("   \n"));
        let result = unit.analyze("anything").await;
        assert_eq!(result.status, AnalysisStatus::Completed);
        assert_eq!(result.analysis, NO_ANALYSIS);
    }

    #[tokio::test]
    async fn test_analyze_message_prompt() {
        let model = Recorder::ok("urgent");
        let unit = Analyst::social(model.clone());
        unit.analyze_message("Call me back ASAP", "whatsapp").await;
        let prompt = model.last_user_prompt();
        assert!(prompt.starts_with("Analyze this whatsapp message"));
        assert!(prompt.ends_with("\n\nCall me back ASAP"));
    }

    #[tokio::test]
    async fn test_create_briefing_includes_all_three_sections() {
        let model = Recorder::ok("1. Reply to Dana");
        let priority = PriorityAnalyst::new(model.clone());
        let result = priority
            .create_briefing("inbox ok", "Calendar analysis failed: timeout", "no messages")
            .await;

        assert_eq!(result.agent_type, AgentType::Priority);
        let prompt = model.last_user_prompt();
        assert!(prompt.contains("Email Analysis: inbox ok"));
        assert!(prompt.contains("Calendar Analysis: Calendar analysis failed: timeout"));
        assert!(prompt.contains("Social Messaging Analysis: no messages"));
    }

    #[tokio::test]
    async fn test_analyze_document_prompt_and_failure_label() {
        let model = Recorder::ok("fine");
        let priority = PriorityAnalyst::new(model.clone());
        priority.analyze_document("Q3 numbers", "report").await;
        assert_eq!(
            model.last_user_prompt(),
            "Analyze this report document and provide insights:\n\nQ3 numbers"
        );

        let failing = PriorityAnalyst::new(Recorder::failing("down"));
        let result = failing.analyze_document("x", "general").await;
        assert!(result.analysis.starts_with("Priority analysis failed:"));
    }
}
