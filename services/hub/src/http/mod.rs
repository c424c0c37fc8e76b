pub mod dashboard;
pub mod health;
pub mod hue;
pub mod metrics;
