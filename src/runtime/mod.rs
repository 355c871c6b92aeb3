mod channel;
mod pass;

pub use channel::{Channel, EventHandle};
pub use pass::{PassId, PassReport, PassState, TaskOutcome, TaskStatus};
