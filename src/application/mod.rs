//! Application services: the dispatcher that drives dialogs, plus the
//! order and admin managers it delegates mutations to.

pub mod admin;
pub mod dispatcher;
pub mod orders;

pub use admin::AdminController;
pub use dispatcher::Dispatcher;
pub use orders::{DecideOutcome, OrderManager};
