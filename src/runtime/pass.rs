//! State and report of a single transformation pass.

use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{ActformError, Result, graph::NodeRef};

pub type PassId = String;

/// Lifecycle of a pass.
///
/// `Idle → Discovering → Resolving → Splicing → Done`, with aborts allowed
/// from `Resolving` and `Splicing`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
pub enum PassState {
    #[default]
    Idle,
    Discovering,
    Resolving,
    Splicing,
    Done,
    Aborted,
}

impl PassState {
    pub fn can_transition_to(
        self,
        next: PassState,
    ) -> bool {
        matches!(
            (self, next),
            (PassState::Idle, PassState::Discovering)
                | (PassState::Discovering, PassState::Resolving)
                | (PassState::Resolving, PassState::Splicing)
                | (PassState::Resolving, PassState::Aborted)
                | (PassState::Splicing, PassState::Done)
                | (PassState::Splicing, PassState::Aborted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PassState::Done | PassState::Aborted)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
pub enum TaskStatus {
    #[default]
    Pending,
    Resolved,
    Unresolved,
    Spliced,
    Failed,
}

/// What happened to one discovered task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task_id: String,
    /// Immediate structural parent of the task.
    pub parent: NodeRef,
    pub template_id: Option<String>,
    pub status: TaskStatus,
    /// Root of the spliced replacement.
    pub root: Option<NodeRef>,
}

impl TaskOutcome {
    pub fn pending(
        task_id: impl Into<String>,
        parent: impl Into<NodeRef>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            parent: parent.into(),
            ..Default::default()
        }
    }
}

/// Summary of a finished pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    pub id: PassId,
    pub state: PassState,
    /// Discovered tasks in discovery order.
    pub tasks: Vec<TaskOutcome>,
    /// Why the pass aborted.
    pub error: Option<ActformError>,
}

impl PassReport {
    pub fn new(id: impl Into<PassId>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == PassState::Done
    }

    pub fn is_aborted(&self) -> bool {
        self.state == PassState::Aborted
    }

    pub fn spliced(&self) -> usize {
        self.tasks.iter().filter(|t| t.status == TaskStatus::Spliced).count()
    }

    pub fn task(
        &self,
        task_id: &str,
    ) -> Option<&TaskOutcome> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    /// `Err` with the abort reason when the pass did not complete.
    pub fn into_result(self) -> Result<Self> {
        if self.state == PassState::Done {
            return Ok(self);
        }
        match self.error {
            Some(error) => Err(error),
            None => Err(ActformError::IncompletePass {
                pass_id: self.id,
                state: self.state.as_ref().to_string(),
            }),
        }
    }

    /// Moves to `next`; returns `false` and stays put on an illegal transition.
    pub(crate) fn advance(
        &mut self,
        next: PassState,
    ) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }
}
