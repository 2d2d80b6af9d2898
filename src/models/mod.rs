pub mod alert;
pub mod aoi;
pub mod detection;
pub mod job;
pub mod monitor;
