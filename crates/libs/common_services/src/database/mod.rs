mod error;
mod memory;
mod pg;
mod store;
mod tables;

pub use error::*;
pub use memory::*;
pub use pg::*;
pub use store::*;
pub use tables::*;
