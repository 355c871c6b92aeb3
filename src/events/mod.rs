//! Event types for transformation passes.
//!
//! Events are emitted while a pass runs to notify subscribers about
//! resolved and spliced tasks, aborts, and the final relayout request.

use strum::AsRefStr;

use crate::{graph::NodeRef, runtime::PassId, utils};

/// Generic event wrapper.
#[derive(Debug, Clone)]
pub struct Event<T> {
    inner: T,
}

/// What happened during a pass or to the template library.
#[derive(Debug, Clone, PartialEq, AsRefStr)]
pub enum TransformEvent {
    /// A pass started discovering tasks.
    Started,
    /// A template was resolved for a task.
    Resolved {
        task_id: String,
        template_id: String,
    },
    /// No template matches a task.
    Unresolved {
        task_id: String,
    },
    /// The replacement of a task was spliced in; `root` is the new node.
    Spliced {
        task_id: String,
        root: NodeRef,
    },
    SpliceFailed {
        task_id: String,
        reason: String,
    },
    Aborted {
        reason: String,
    },
    Done,
    /// Human-readable notification for the operator.
    Notify(String),
    /// The diagram rooted at `root` changed and should be laid out again.
    Relayout {
        root: NodeRef,
    },
    /// The template library was reloaded.
    Refreshed {
        count: usize,
    },
}

impl TransformEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransformEvent::Done | TransformEvent::Aborted { .. })
    }
}

/// Event message with its pass context.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Pass that emitted the event (empty for library events).
    pub pass_id: PassId,
    pub event: TransformEvent,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
}

impl Message {
    pub fn new(
        pass_id: impl Into<PassId>,
        event: TransformEvent,
    ) -> Self {
        Self {
            pass_id: pass_id.into(),
            event,
            timestamp: utils::time::time_millis(),
        }
    }
}

impl<T> std::ops::Deref for Event<T>
where
    T: std::fmt::Debug + Clone,
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> Event<T>
where
    T: std::fmt::Debug + Clone,
{
    pub fn new(inner: &T) -> Self {
        Self {
            inner: inner.clone(),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(TransformEvent::Started.as_ref(), "Started");
        assert_eq!(
            TransformEvent::Unresolved {
                task_id: "T".to_string()
            }
            .as_ref(),
            "Unresolved"
        );
        assert!(TransformEvent::Done.is_terminal());
        assert!(!TransformEvent::Notify("hi".to_string()).is_terminal());
    }

    #[test]
    fn test_event_derefs_to_message() {
        let message = Message::new("pass", TransformEvent::Done);
        let event = Event::new(&message);
        assert_eq!(event.pass_id, "pass");
        assert!(event.timestamp > 0);
        assert_eq!(event.inner(), &message);
    }
}
