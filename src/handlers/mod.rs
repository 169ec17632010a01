//! HTTP handlers

pub mod health;
pub mod compliance;
pub mod workers;
pub mod alerts;
pub mod webhooks;
pub mod dashboard;
pub mod analytics;
