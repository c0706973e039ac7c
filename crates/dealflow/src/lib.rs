//! Core library for the dealflow evaluation service: submission intake,
//! rubric scoring through an external text-generation model, company
//! materialization, and status fanout.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
