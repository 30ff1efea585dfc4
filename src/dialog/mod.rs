//! Conversation engine. A [`state::Session`] value tracks where one user is
//! in a workflow, [`transition::step`] is the pure function that advances it,
//! and [`effect::Effect`] describes what the runtime should do about it.

pub mod effect;
pub mod event;
pub mod menu;
pub mod state;
pub mod transition;
pub mod views;

pub use effect::Effect;
pub use event::{Inbound, MessageBody};
pub use state::Session;
pub use transition::{StepCtx, StepOutcome, step};
