//! `pid-fit` library crate.
//!
//! The binary (`pidfit`) is a thin wrapper around this library so that:
//!
//! - the fitting engine and trace generator are testable without spawning processes
//! - modules are reusable from other tools (batch jobs, notebooks, etc.)
//!
//! Layout:
//! - [`models`] evaluates the discrete PID response
//! - [`fit`] identifies gains from a recorded trace
//! - [`data`] synthesizes labelled traces for validation

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
