//! Step transitions and node routing.
//!
//! ```text
//!  coordinator ──► email ──► coordinator ──► calendar ──► coordinator
//!       ▲            │                          │
//!       └── tools ◄──┘ (policy)                 ▼
//!                            ... social ──► coordinator ──► priority ──► end
//! ```
//!
//! After each specialized unit the [`RoutingPolicy`] may queue tool calls,
//! which sends the run through the tool node before the coordinator. The
//! default policy never does.

use crate::models::AgentType;
use crate::tools::ToolCall;

use super::state::{BriefingState, Step};

/// A node in the briefing graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Coordinator,
    Unit(AgentType),
    Tools,
    End,
}

/// Coordinator transition: start the run, or move past a finished unit.
///
/// Unit steps and `End` are returned unchanged.
pub fn advance(step: Step) -> Step {
    match step {
        Step::Start => Step::Email,
        Step::EmailDone => Step::Calendar,
        Step::CalendarDone => Step::Social,
        Step::SocialDone => Step::Priority,
        Step::PriorityDone => Step::End,
        other => other,
    }
}

/// The node that handles `step`; anything that is not a unit step ends the run.
pub fn route_to_unit(step: Step) -> Node {
    match step {
        Step::Email => Node::Unit(AgentType::Email),
        Step::Calendar => Node::Unit(AgentType::Calendar),
        Step::Social => Node::Unit(AgentType::Social),
        Step::Priority => Node::Unit(AgentType::Priority),
        _ => Node::End,
    }
}

/// Decides whether a finished unit should issue retrieval calls.
pub trait RoutingPolicy: Send + Sync {
    /// Tool calls to run after `finished` completes. Empty means go straight
    /// back to the coordinator.
    fn tool_calls_after(&self, finished: AgentType, state: &BriefingState) -> Vec<ToolCall>;
}

/// Never selects the tool step.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectRouting;

impl RoutingPolicy for DirectRouting {
    fn tool_calls_after(&self, _finished: AgentType, _state: &BriefingState) -> Vec<ToolCall> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_walk_reaches_end() {
        let mut step = Step::Start;
        let mut visited = Vec::new();
        for _ in 0..10 {
            step = advance(step);
            match route_to_unit(step) {
                Node::Unit(t) => {
                    visited.push(t);
                    step = Step::done_for(t);
                }
                Node::End => break,
                other => panic!("unexpected node {:?}", other),
            }
        }
        assert_eq!(step, Step::End);
        assert_eq!(
            visited,
            vec![
                AgentType::Email,
                AgentType::Calendar,
                AgentType::Social,
                AgentType::Priority
            ]
        );
    }

    #[test]
    fn test_non_unit_steps_route_to_end() {
        for step in [Step::Start, Step::EmailDone, Step::PriorityDone, Step::End] {
            assert_eq!(route_to_unit(step), Node::End);
        }
        assert_eq!(advance(Step::End), Step::End);
        assert_eq!(advance(Step::Calendar), Step::Calendar);
    }

    #[test]
    fn test_direct_routing_never_uses_tools() {
        let state = BriefingState::new(1);
        for t in [AgentType::Email, AgentType::Calendar, AgentType::Social] {
            assert!(DirectRouting.tool_calls_after(t, &state).is_empty());
        }
    }
}
