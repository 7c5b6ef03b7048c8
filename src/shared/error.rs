//! Error types of the dispatch core.
//!
//! None of these escalate to process termination once the system is running:
//! request errors are rejected at construction, assignment errors are logged and
//! counted by the dispatcher. Only [`ConfigError`] can stop the program, at start-up.

use thiserror::Error;

/// A passenger request that must never enter the system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("floor {floor} is outside the building (1..={n_floors})")]
    FloorOutOfRange { floor: u8, n_floors: u8 },

    #[error("origin and destination are both floor {floor}")]
    SameFloor { floor: u8 },
}

/// Every unit rejected the request, typically because all of them are full.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("no eligible elevator for request #{request_id}")]
    NoEligibleUnit { request_id: u64 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// An operator command line that could not be understood.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', type 'help' for the list")]
    Unknown(String),

    #[error("usage: add <from> <to>")]
    Usage,

    #[error("'{0}' is not a floor number")]
    InvalidFloor(String),
}
