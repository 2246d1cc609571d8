//! Domain models for autofav.
//!
//! - `CheckoutEvent`: one completed SCM checkout, as reported by the host
//! - `JobHandle`: the job that ran it and where it lives
//! - `ReconcileError` / `Interrupted`: the engine's error taxonomy

pub mod error;
pub mod event;

pub use error::{Interrupted, ReconcileError, Result};
pub use event::{CheckoutEvent, JobHandle, JobParent, RunKind, ScmKind};
