//! Side-effecting helpers: configuration, overwrite checks, artifact and
//! sidecar writing.

pub mod config;
pub mod output;
pub mod overwrite;
pub mod sidecar;
