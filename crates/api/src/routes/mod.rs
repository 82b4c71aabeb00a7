pub mod count;
pub mod health;
pub mod members;
pub mod metrics;
