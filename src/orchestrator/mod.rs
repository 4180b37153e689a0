//! Application-level orchestration.
//!
//! This module owns the run lifecycle (submit, poll, result, restart) and
//! post-run processing such as artifact downloads and summary export. UI/CLI
//! layers call into this module to keep responsibilities separated.

mod controller;
mod post_process;
mod views;

pub(crate) use controller::{RunController, UiCommand};
pub(crate) use post_process::{export_summary, process_run_completion};
