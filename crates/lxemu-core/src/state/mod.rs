//! Architectural CPU state and run-loop lifecycle.

/// Register file and register identifiers.
pub mod registers;
/// Run-loop state machine.
pub mod run_state;

pub use registers::{GeneralRegister, RegisterFile, GENERAL_REGISTER_COUNT};
pub use run_state::RunState;
