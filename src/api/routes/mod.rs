pub mod agents;
pub mod health;
pub mod metrics;
pub mod root;
pub mod system;
