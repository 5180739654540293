//! Outer adapters that feed events in and carry replies out.

pub mod csv;
