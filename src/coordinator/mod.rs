pub mod command;
pub mod coordinator;
pub mod generator;
pub mod report;

pub use command::Command;
pub use coordinator::Coordinator;
