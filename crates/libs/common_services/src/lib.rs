#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod access;
pub mod archive;
pub mod database;
pub mod faces;
pub mod storage;
mod utils;

pub use utils::*;
