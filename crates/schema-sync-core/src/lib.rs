//! # schema-sync-core
//!
//! Keeps a SurrealDB schema and its declarative Rust definitions in sync.
//!
//! This crate provides:
//! - A parser for `DEFINE TABLE / FIELD / INDEX / EVENT` statements
//! - A differ producing typed, direction-aware change lists
//! - A migration generator rendering changes back to SurrealQL
//! - Extractors for the database side (async introspection) and the code
//!   side (registered [`model::Definition`]s)
//! - A source generator, a file change planner and a merge engine that edits
//!   existing generated files instead of overwriting them
//!
//! ## Pushing code changes to the database
//!
//! ```rust
//! use schema_sync_core::diff::{ChangeKind, Direction, compare};
//! use schema_sync_core::extract::parse_script;
//! use schema_sync_core::migrations::render_all;
//!
//! let database = parse_script(
//!     "DEFINE TABLE user SCHEMAFULL;
//!      DEFINE FIELD email ON TABLE user TYPE string;",
//! )
//! .unwrap();
//! let code = parse_script(
//!     "DEFINE TABLE user SCHEMAFULL;
//!      DEFINE FIELD email ON TABLE user TYPE string;
//!      DEFINE FIELD age ON TABLE user TYPE option<int>;",
//! )
//! .unwrap();
//!
//! let changes = compare(&code, &database, Direction::Push);
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].kind, ChangeKind::FieldAdded);
//!
//! let statements = render_all(&changes, &code, &database);
//! assert_eq!(statements, ["DEFINE FIELD age ON TABLE user TYPE option<int>;"]);
//! ```
//!
//! ## Pulling database changes into code
//!
//! [`plan::plan`] renders one source file per table and, when the parsed
//! code schema is available, merges differences into the existing files
//! with [`merge::merge`] so hand edits survive.

pub mod ast;
pub mod codegen;
pub mod diff;
pub mod error;
pub mod extract;
pub mod merge;
pub mod migrations;
pub mod model;
pub mod parser;
pub mod plan;
pub mod warnings;

pub use ast::{FieldAst, IndexAst, SchemaAst, TableAst, TableKind};
pub use diff::{Change, ChangeKind, Direction, compare};
pub use error::{Result, SyncError};
pub use merge::{MergeOptions, MergeResult, merge};
pub use plan::{FileAction, FileChange, PlanOptions, plan};
pub use warnings::{Warning, WarningKind, Warnings};
