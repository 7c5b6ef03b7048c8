pub mod dispatcher;
pub mod scoring;

pub use dispatcher::Dispatcher;
