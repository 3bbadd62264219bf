//! Domain events and the pure command execution helper.
//!
//! Procurement documents decide lifecycle transitions as events (`handle`) and
//! evolve by applying them (`apply`). Nothing here performs IO.

pub mod event;
pub mod handler;

pub use event::Event;
pub use handler::execute;
