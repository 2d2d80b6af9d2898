//! GeoSentry change-detection orchestration
//!
//! This library provides the core of the geosentry monitoring backend:
//! accepting detection runs for Areas of Interest, driving the external
//! change-detection engine, persisting alerts, and delivering
//! notifications with channel fallback.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
