use crate::config::RunConfig;
use ignore::WalkBuilder;
use std::path::PathBuf;

/// Scanner for finding trice-capable source files under the run's roots
/// (.gitignore aware).
pub struct SourceScanner<'a> {
    roots: &'a [PathBuf],
    cfg: &'a RunConfig,
}

impl<'a> SourceScanner<'a> {
    pub fn new(roots: &'a [PathBuf], cfg: &'a RunConfig) -> Self {
        Self { roots, cfg }
    }

    /// Walks every root and returns the matching files, sorted so a run
    /// processes them in a stable order.
    pub fn scan(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in self.roots {
            for result in WalkBuilder::new(root).hidden(false).build() {
                match result {
                    Ok(entry) => {
                        if entry.file_type().is_some_and(|ft| ft.is_file())
                            && self.cfg.wants_extension(entry.path())
                        {
                            files.push(entry.path().to_path_buf());
                        }
                    }
                    Err(e) => log::warn!("failed to read entry: {e}"),
                }
            }
        }
        files.sort();
        files.dedup();
        log::info!("found {} source files", files.len());
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn scan_picks_configured_extensions_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.c"), "int main(void) {}\n").unwrap();
        fs::write(dir.path().join("src/util.h"), "#pragma once\n").unwrap();
        fs::write(dir.path().join("notes.md"), "notes\n").unwrap();

        let cfg = RunConfig::with_defaults();
        let roots = vec![dir.path().to_path_buf()];
        let files = SourceScanner::new(&roots, &cfg).scan();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["main.c", "util.h"]);
    }
}
