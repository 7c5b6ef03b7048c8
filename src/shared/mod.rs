pub mod error;
pub mod macros;
pub mod structs;
pub mod worker;
pub mod structs_tests;

pub use error::AssignmentError;
pub use error::CommandError;
pub use error::ConfigError;
pub use error::RequestError;
pub use structs::Direction;
pub use structs::DispatcherSnapshot;
pub use structs::ElevatorSnapshot;
pub use structs::LoadBalance;
pub use structs::LoadVerdict;
pub use structs::MotionStatus;
pub use structs::Request;
pub use structs::Statistics;
pub use structs::SystemStatus;
pub use structs::UnitStatistics;
pub use worker::Worker;
