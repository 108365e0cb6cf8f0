//! Conversation state machine
//!
//! One `Planner` serves many sessions. Transitions for the same session are serialized through
//! `SessionLocks`; different sessions proceed independently.

mod error;
mod locks;
mod machine;

pub use error::PlannerError;
pub use locks::SessionLocks;
pub use machine::{AcceptOutcome, Collaborators, Planner, Reply, is_accept};
