//! Seat availability monitor library.
//!
//! The crate is laid out as a small hexagon: `domain` holds the parser, the
//! monitor engine, and the driven ports; `outbound` holds adapters for those
//! ports; `config` loads operator settings.

pub mod config;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
