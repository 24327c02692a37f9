//! Outbound adapters implementing the domain ports.

pub mod notify;
pub mod store;
pub mod upstream;
