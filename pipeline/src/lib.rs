//! Lightweight sequential processing-pipeline controller.
//!
//! Steps run in order against a mutable data payload; the outputs they
//! produce are managed centrally. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (pattern matching, output
//!   selection, path construction). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (configuration, overwrite checks,
//!   artifact and sidecar writing). Capabilities like interactive
//!   confirmation are injected to enable fakes in tests.
//!
//! Orchestration modules ([`run`], [`cli`], [`report`]) coordinate core
//! logic with I/O; [`step`] is the trait pipeline consumers implement.

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod report;
pub mod run;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
