//! # portatype
//!
//! Build-time schema aggregation and instrumentation driver for portable
//! (serializable) Java types.
//!
//! ## Architecture
//!
//! - **artifacts**: Resolved dependency classpath filtering
//! - **classfile**: Minimal Java class-file metadata reader
//! - **scan**: Class source scanning over directories and jar archives
//! - **schema**: Schema model and the ordered source merge
//! - **overrides**: Declarative XML schema override descriptors
//! - **worklist**: Instrumentation worklist inclusion rules and ordering
//! - **engine**: External instrumentation engine seam
//! - **pipeline**: End-to-end "instrument project" orchestration
//! - **diag**: Explicit diagnostic-sink injection for all pipeline stages
//! - **config**: CLI option and directory-convention resolution

pub mod artifacts;
pub mod classfile;
pub mod cli;
pub mod config;
pub mod diag;
pub mod engine;
pub mod error;
pub mod overrides;
pub mod pipeline;
pub mod scan;
pub mod schema;
pub mod worklist;
