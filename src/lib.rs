//! Dependency-aware GraphQL API fuzzing.
//!
//! A run loads a compiled schema, builds a dependency graph between
//! operations and the objects they produce, and walks it so that objects
//! created by earlier requests feed the inputs of later ones.

pub mod bucket;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod errors;
pub mod fuzzer;
pub mod graph;
pub mod materializer;
pub mod retrier;
pub mod schema;
pub mod transport;
