//! # Trice ID management
//!
//! ID-managed source rewriting for an embedded trace-logging toolchain:
//! every trice invocation in firmware source carries a stable numeric ID,
//! and this crate assigns, removes, and catalogs those IDs.
//!
//! ## Pipeline
//!
//! ```text
//! Source roots
//!     │
//!     ├──> Scanner (.gitignore aware)
//!     │      └─> C-family source files
//!     │
//!     ├──> File cache (mtime twins under ~/.trice/cache)
//!     │      └─> fresh / restore / transform decision per file
//!     │
//!     └──> Rewriter (clean strips IDs, insert assigns them)
//!            └─> ID catalog + location index (JSON)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use trice_id::{IdCatalog, LocationCatalog, Run, RunConfig, SourceScanner};
//!
//! fn main() -> trice_id::Result<()> {
//!     let cfg = RunConfig::with_defaults();
//!     let catalog = IdCatalog::load(Path::new("til.json"))?;
//!     let locations = LocationCatalog::load(Path::new("li.json"), cfg.logging)?;
//!
//!     let roots = vec![".".into()];
//!     let files = SourceScanner::new(&roots, &cfg).scan();
//!
//!     let mut run = Run::new(cfg, catalog, locations);
//!     run.insert_tree(&files)?;
//!     run.save_catalogs(Path::new("til.json"), Path::new("li.json"))?;
//!     Ok(())
//! }
//! ```

mod alloc;
mod cache;
mod catalog;
mod config;
mod error;
mod fmt;
mod rewrite;
mod run;
mod scanner;

pub use alloc::SearchMethod;
pub use cache::{canon_path, copy_with_mtime, CacheDecision, CacheMode, FileCache};
pub use catalog::{IdCatalog, LocationCatalog, EMPTY_FILE};
pub use config::{RunConfig, DEFAULT_SRC_EXTENSIONS};
pub use error::{IdError, Result};
pub use fmt::{specifier_count, LocationInfo, TriceFmt, TriceId};
pub use rewrite::{CleanOutcome, InsertOutcome, Rewriter};
pub use run::{Run, RunStats};
pub use scanner::SourceScanner;
