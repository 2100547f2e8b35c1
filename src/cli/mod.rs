pub mod commands;
pub mod fuzz;
pub mod graph;

pub use commands::{Cli, Commands};
