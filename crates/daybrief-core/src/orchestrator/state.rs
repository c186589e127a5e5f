//! Typed state threaded through the briefing state machine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AgentType, AnalysisResult};
use crate::tools::{ToolCall, ToolOutput};

pub const DEFAULT_USER_QUERY: &str = "Generate daily briefing";

/// Position of a briefing run.
///
/// `*Done` steps are written by unit nodes; the coordinator turns each one
/// into the next unit step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Start,
    Email,
    EmailDone,
    Calendar,
    CalendarDone,
    Social,
    SocialDone,
    Priority,
    PriorityDone,
    End,
}

impl Step {
    /// The step a unit node writes when it finishes.
    pub fn done_for(agent_type: AgentType) -> Self {
        match agent_type {
            AgentType::Email => Self::EmailDone,
            AgentType::Calendar => Self::CalendarDone,
            AgentType::Social => Self::SocialDone,
            AgentType::Priority => Self::PriorityDone,
        }
    }
}

/// Everything one briefing run knows. Each node writes only its own slot.
#[derive(Debug, Clone)]
pub struct BriefingState {
    pub run_id: Uuid,
    pub user_id: i64,
    pub user_query: String,
    pub email_analysis: Option<AnalysisResult>,
    pub calendar_analysis: Option<AnalysisResult>,
    pub social_analysis: Option<AnalysisResult>,
    pub priority_recommendations: Option<AnalysisResult>,
    pub final_briefing: String,
    pub current_step: Step,
    pub error: Option<String>,
    pub pending_tool_calls: Vec<ToolCall>,
    pub tool_outputs: Vec<ToolOutput>,
}

impl BriefingState {
    pub fn new(user_id: i64) -> Self {
        Self::with_query(user_id, DEFAULT_USER_QUERY)
    }

    pub fn with_query(user_id: i64, user_query: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_id,
            user_query: user_query.into(),
            email_analysis: None,
            calendar_analysis: None,
            social_analysis: None,
            priority_recommendations: None,
            final_briefing: String::new(),
            current_step: Step::Start,
            error: None,
            pending_tool_calls: Vec::new(),
            tool_outputs: Vec::new(),
        }
    }

    /// Store a unit result in its slot and mark that unit done.
    pub fn record(&mut self, result: AnalysisResult) {
        let agent_type = result.agent_type;
        match agent_type {
            AgentType::Email => self.email_analysis = Some(result),
            AgentType::Calendar => self.calendar_analysis = Some(result),
            AgentType::Social => self.social_analysis = Some(result),
            AgentType::Priority => {
                self.final_briefing = result.analysis.clone();
                self.priority_recommendations = Some(result);
            }
        }
        self.current_step = Step::done_for(agent_type);
    }

    pub fn slot(&self, agent_type: AgentType) -> Option<&AnalysisResult> {
        match agent_type {
            AgentType::Email => self.email_analysis.as_ref(),
            AgentType::Calendar => self.calendar_analysis.as_ref(),
            AgentType::Social => self.social_analysis.as_ref(),
            AgentType::Priority => self.priority_recommendations.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let s = BriefingState::new(9);
        assert_eq!(s.current_step, Step::Start);
        assert_eq!(s.user_query, DEFAULT_USER_QUERY);
        assert!(s.email_analysis.is_none());
        assert_ne!(s.run_id, BriefingState::new(9).run_id);
    }

    #[test]
    fn test_record_writes_own_slot_and_advances() {
        let mut s = BriefingState::new(1);
        s.record(AnalysisResult::completed(AgentType::Calendar, "free afternoon"));
        assert_eq!(s.current_step, Step::CalendarDone);
        assert!(s.email_analysis.is_none());
        assert_eq!(s.slot(AgentType::Calendar).unwrap().analysis, "free afternoon");

        s.record(AnalysisResult::error(AgentType::Priority, "Priority analysis failed: x"));
        assert_eq!(s.current_step, Step::PriorityDone);
        assert_eq!(s.final_briefing, "Priority analysis failed: x");
    }
}
