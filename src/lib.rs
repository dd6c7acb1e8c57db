//! Comprehender - AI-assisted Java codebase annotation
//!
//! Parses Java source with tree-sitter into a structural model, builds a
//! type dependency graph (with cycle detection and a serializable export),
//! and runs a concurrent annotation pipeline that writes commented copies
//! of every source file. Originals are never modified.

pub mod annotate;
pub mod cli;
pub mod config;
pub mod graph;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod report;
