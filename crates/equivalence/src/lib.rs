//! Case-management core for a university equivalence commission: a
//! configurable weighted rubric, a mandatory-criteria gate, two score
//! classification ladders, and the case lifecycle state machine, exposed
//! over an axum router.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
