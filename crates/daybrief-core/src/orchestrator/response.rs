//! The caller-facing briefing payload.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::clean_response;
use crate::models::{now_iso, AgentType, AnalysisResult};

use super::state::BriefingState;

/// Used when the synthesizer produced nothing printable.
pub const NO_BRIEFING: &str = "No briefing generated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Completed,
    Error,
}

/// A finished briefing. Every slot is always present, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingResponse {
    pub user_id: i64,
    pub generated_at: String,
    pub email_insights: AnalysisResult,
    pub calendar_insights: AnalysisResult,
    pub social_insights: AnalysisResult,
    pub priority_recommendations: AnalysisResult,
    pub summary: String,
    pub workflow_status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BriefingResponse {
    /// Map a state that reached `End` into a response.
    ///
    /// Fails with [`Error::Workflow`] if any slot is still empty.
    pub fn from_state(state: BriefingState) -> Result<Self> {
        let summary = clean_response(&state.final_briefing);
        let summary = if summary.is_empty() {
            NO_BRIEFING.to_string()
        } else {
            summary
        };

        Ok(Self {
            user_id: state.user_id,
            generated_at: now_iso(),
            email_insights: filled(state.email_analysis, AgentType::Email)?,
            calendar_insights: filled(state.calendar_analysis, AgentType::Calendar)?,
            social_insights: filled(state.social_analysis, AgentType::Social)?,
            priority_recommendations: filled(state.priority_recommendations, AgentType::Priority)?,
            summary,
            workflow_status: WorkflowStatus::Completed,
            error: state.error,
        })
    }

    /// The response returned when the run itself broke down.
    pub fn degraded(user_id: i64, error: &str) -> Self {
        let slot = |agent_type: AgentType| {
            AnalysisResult::error(
                agent_type,
                format!("{} analysis failed: {}", agent_type.label(), error),
            )
        };
        Self {
            user_id,
            generated_at: now_iso(),
            email_insights: slot(AgentType::Email),
            calendar_insights: slot(AgentType::Calendar),
            social_insights: slot(AgentType::Social),
            priority_recommendations: slot(AgentType::Priority),
            summary: error.to_string(),
            workflow_status: WorkflowStatus::Error,
            error: Some(error.to_string()),
        }
    }

    pub fn insights(&self) -> [&AnalysisResult; 4] {
        [
            &self.email_insights,
            &self.calendar_insights,
            &self.social_insights,
            &self.priority_recommendations,
        ]
    }
}

fn filled(slot: Option<AnalysisResult>, agent_type: AgentType) -> Result<AnalysisResult> {
    slot.ok_or_else(|| Error::Workflow(format!("{} slot empty at end of run", agent_type)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisStatus;

    #[test]
    fn test_from_state_requires_every_slot() {
        let mut state = BriefingState::new(1);
        state.record(AnalysisResult::completed(AgentType::Email, "e"));
        let err = BriefingResponse::from_state(state).unwrap_err();
        assert!(matches!(err, Error::Workflow(_)));
    }

    #[test]
    fn test_from_state_cleans_summary() {
        let mut state = BriefingState::new(4);
        for t in [AgentType::Email, AgentType::Calendar, AgentType::Social] {
            state.record(AnalysisResult::completed(t, "ok"));
        }
        state.record(AnalysisResult::completed(AgentType::Priority, "## Today\n**Ship** it"));
        let r = BriefingResponse::from_state(state).unwrap();
        assert_eq!(r.summary, "Today\nShip it");
        assert_eq!(r.workflow_status, WorkflowStatus::Completed);
        assert!(r.error.is_none());
    }

    #[test]
    fn test_degraded_shape() {
        let r = BriefingResponse::degraded(2, "step budget exhausted");
        assert_eq!(r.workflow_status, WorkflowStatus::Error);
        assert_eq!(r.summary, "step budget exhausted");
        assert!(r
            .insights()
            .iter()
            .all(|i| i.status == AnalysisStatus::Error && !i.analysis.is_empty()));

        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["workflow_status"], "error");
        assert_eq!(v["error"], "step budget exhausted");
    }
}
