use crate::cache::{CacheDecision, CacheMode, FileCache};
use crate::catalog::{IdCatalog, LocationCatalog};
use crate::config::RunConfig;
use crate::error::{IdError, Result};
use crate::fmt::{TriceFmt, TriceId};
use crate::rewrite::Rewriter;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Counters for one run, reported to the caller when the run ends.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Files the scanner handed to the run.
    pub files: usize,
    /// Files that went through the transform.
    pub transformed: usize,
    /// Files served from the cache without a transform.
    pub fresh: usize,
    /// Files restored by copying the opposite twin's stored result.
    pub restored: usize,
    /// Invocations that received an ID.
    pub assigned: usize,
    /// `iD(n)` arguments removed.
    pub removed: usize,
    /// Per-file errors; the run continued past each of them.
    pub errors: Vec<String>,
}

impl RunStats {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// One clean or insert pass over a set of files.
///
/// Per-file errors join the run's accumulator and later files are still
/// attempted; only catalog bootstrap and ID exhaustion abort a run early.
pub struct Run {
    cfg: RunConfig,
    cache: FileCache,
    rewriter: Rewriter,
    catalog: IdCatalog,
    rev: HashMap<TriceFmt, Vec<TriceId>>,
    locations: LocationCatalog,
    stats: RunStats,
}

impl Run {
    pub fn new(cfg: RunConfig, catalog: IdCatalog, locations: LocationCatalog) -> Self {
        let cache = FileCache::open(&cfg);
        let rev = catalog.reverse();
        Self {
            cfg,
            cache,
            rewriter: Rewriter::new(),
            catalog,
            rev,
            locations,
            stats: RunStats::default(),
        }
    }

    /// Removes IDs from every file. The catalog is left untouched.
    pub fn clean_tree(&mut self, files: &[PathBuf]) -> Result<()> {
        self.process_tree(files, CacheMode::Clean)
    }

    /// Assigns IDs in every file, updating catalog and location index in
    /// memory. The caller persists them via [`Run::save_catalogs`].
    pub fn insert_tree(&mut self, files: &[PathBuf]) -> Result<()> {
        self.catalog.add_fmt_count(&self.cfg);
        self.rev = self.catalog.reverse();
        self.process_tree(files, CacheMode::Insert)
    }

    /// Per-file errors join the accumulator and the walk goes on. A fully
    /// occupied ID range is fatal: no later file could be served either, so
    /// the run aborts at the offending file.
    fn process_tree(&mut self, files: &[PathBuf], mode: CacheMode) -> Result<()> {
        for path in files {
            self.stats.files += 1;
            match self.process_file(path, mode) {
                Ok(()) => {}
                Err(err @ IdError::IdSpaceExhausted { .. }) => {
                    return Err(IdError::Other(format!("{}: {err}", path.display())));
                }
                Err(err) => {
                    log::error!("{}: {err}", path.display());
                    self.stats.errors.push(format!("{}: {err}", path.display()));
                }
            }
        }
        Ok(())
    }

    /// Cache-check, transform, cache-write for one file, strictly in that
    /// order. A crash between transform and cache-write only leaves the twin
    /// stale; the next run re-transforms and repairs it.
    fn process_file(&mut self, path: &Path, mode: CacheMode) -> Result<()> {
        let mtime = fs::metadata(path)?.modified()?;
        match self.cache.check(path, mtime, mode)? {
            CacheDecision::Fresh => {
                self.stats.fresh += 1;
                return Ok(());
            }
            CacheDecision::Restored => {
                self.stats.restored += 1;
                return Ok(());
            }
            CacheDecision::Transform => {}
        }

        let text = fs::read_to_string(path)?;
        let (out, modified) = match mode {
            CacheMode::Clean => {
                let outcome = self.rewriter.clean(&text);
                self.stats.removed += outcome.removed;
                (outcome.text, outcome.modified)
            }
            CacheMode::Insert => {
                let outcome = self.rewriter.insert(
                    &path.to_string_lossy(),
                    &text,
                    &self.cfg,
                    &mut self.catalog,
                    &mut self.rev,
                    &mut self.locations,
                )?;
                self.stats.assigned += outcome.assigned;
                (outcome.text, outcome.modified)
            }
        };
        if modified {
            fs::write(path, out.as_bytes())?;
        }
        self.stats.transformed += 1;

        // The user may have edited the file without touching IDs; the twin
        // mtime must track the file even then.
        self.cache.update(path, mode)
    }

    /// Writes the catalog and the location index back to disk.
    pub fn save_catalogs(&self, til: &Path, li: &Path) -> Result<()> {
        self.catalog.save(til)?;
        self.locations.save(li)?;
        if self.cfg.verbose {
            log::info!(
                "wrote ID list {} with {} items",
                til.display(),
                self.catalog.len()
            );
        }
        Ok(())
    }

    pub fn catalog(&self) -> &IdCatalog {
        &self.catalog
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_stats(self) -> RunStats {
        self.stats
    }
}
