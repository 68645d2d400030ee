//! Outward-facing adapters.

pub mod http;
