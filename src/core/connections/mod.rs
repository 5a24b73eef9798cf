pub mod connection_validator;
pub mod netlist;

// Re-export commonly used types
pub use connection_validator::ConnectionValidator;
pub use netlist::{Endpoint, Netlist};
