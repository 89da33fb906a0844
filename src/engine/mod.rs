//! Interpreter actor: serializes every transport onto one owner of the state

mod actor;
mod actor_handle;
mod commands;

pub use actor::InterpreterActor;
pub use actor_handle::InterpreterHandle;
pub use commands::InterpreterCommand;
