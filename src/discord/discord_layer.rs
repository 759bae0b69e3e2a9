// Discord layer - commands, event handlers, and background behaviours.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "behaviours/mod.rs"]
pub mod behaviours;

#[path = "events.rs"]
pub mod events;

// Re-export command types for convenience
pub use commands::{Context, Data, Error};
