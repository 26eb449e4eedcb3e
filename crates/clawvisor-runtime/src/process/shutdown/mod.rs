//! Hard tear-down of service processes.
//!
//! Provides two strategies:
//! - `kill_tree`: for a process we spawned (root plus every descendant)
//! - `kill_by_name`: best-effort sweep for strays the handles lost track of

mod sweep;
mod tree;

pub use sweep::kill_by_name;
pub use tree::{descendants_of, kill_tree};
