pub mod cache;
pub mod components;
pub mod connections;
pub mod errors;
pub mod execution;
pub mod input;
pub mod types;
pub mod values;
