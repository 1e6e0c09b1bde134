mod album;
mod cluster;
mod job;
mod photo;

pub use album::*;
pub use cluster::*;
pub use job::*;
pub use photo::*;
