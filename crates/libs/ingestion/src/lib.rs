#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod clustering;
pub mod context;
pub mod controller;
pub mod error;
pub mod interfaces;
pub mod pipeline;
pub mod query;
pub mod reaper;
