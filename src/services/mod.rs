pub mod engine;
pub mod notify;
pub mod queue;
