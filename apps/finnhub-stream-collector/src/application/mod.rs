//! Application Layer - Port definitions.

/// Interfaces for downstream collaborators.
pub mod ports;
