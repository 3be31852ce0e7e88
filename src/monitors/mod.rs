pub mod collector;
pub mod health;
pub mod source;
