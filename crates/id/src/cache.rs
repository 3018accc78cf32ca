use crate::config::RunConfig;
use crate::error::Result;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

const CLEANED_DIR: &str = "cleaned";
const INSERTED_DIR: &str = "inserted";

/// The two directions a run can transform a file in. Each direction owns one
/// cache twin; the opposite twin belongs to the other direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Clean,
    Insert,
}

impl CacheMode {
    fn own_dir(self) -> &'static str {
        match self {
            CacheMode::Clean => CLEANED_DIR,
            CacheMode::Insert => INSERTED_DIR,
        }
    }

    fn other_dir(self) -> &'static str {
        match self {
            CacheMode::Clean => INSERTED_DIR,
            CacheMode::Insert => CLEANED_DIR,
        }
    }
}

/// Outcome of the pre-transform cache check for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// The file must be transformed. Stale twins have been invalidated.
    Transform,
    /// The file already matches its own twin; nothing to do.
    Fresh,
    /// The opposite twin matched the source mtime; the stored result has
    /// been copied onto the file, no transform needed.
    Restored,
}

/// mtime-keyed cache of transformed files under `<home>/.trice/cache`.
///
/// A file and its twin are considered equal iff their mtimes are equal, so
/// every copy in or out of the cache must carry the source mtime along.
#[derive(Debug)]
pub struct FileCache {
    root: Option<PathBuf>,
}

impl FileCache {
    /// Resolves the cache for this run. When the cache flag is set but the
    /// cache root does not exist, warns once and stays inactive; every file
    /// then takes the unconditional transform path.
    pub fn open(cfg: &RunConfig) -> Self {
        if !cfg.cache_enabled {
            return Self { root: None };
        }
        let root = cfg.cache_root();
        if !root.is_dir() {
            log::warn!(
                "cache folder {} not found - create it or drop the cache switch",
                root.display()
            );
            return Self { root: None };
        }
        Self { root: Some(root) }
    }

    /// An inactive cache answers [`CacheDecision::Transform`] for every file
    /// and ignores updates.
    pub fn is_active(&self) -> bool {
        self.root.is_some()
    }

    /// Decides what to do with `path` (source mtime `mtime`) before a
    /// transform in direction `mode`:
    ///
    /// - own twin missing: transform;
    /// - own twin mtime equals the source: nothing to do;
    /// - opposite twin mtime equals the source: the file is the unedited
    ///   output of the opposite run, so the stored own twin is copied onto
    ///   it (mtime preserved) instead of transforming;
    /// - neither matches: the file was edited, both twins are removed and
    ///   the file is transformed.
    pub fn check(&self, path: &Path, mtime: SystemTime, mode: CacheMode) -> Result<CacheDecision> {
        let Some(root) = &self.root else {
            return Ok(CacheDecision::Transform);
        };
        let own = twin_path(root, mode.own_dir(), path)?;
        let other = twin_path(root, mode.other_dir(), path)?;

        match mtime_of(&own) {
            None => {
                log::debug!("no {} cache file for {}", mode.own_dir(), path.display());
                return Ok(CacheDecision::Transform);
            }
            Some(t) if t == mtime => {
                log::debug!("{} already up to date, nothing to do", path.display());
                return Ok(CacheDecision::Fresh);
            }
            Some(_) => {}
        }

        match mtime_of(&other) {
            None => {
                log::debug!("no {} cache file for {}", mode.other_dir(), path.display());
                Ok(CacheDecision::Transform)
            }
            Some(t) if t == mtime => {
                log::debug!("restoring {} from the {} cache", path.display(), mode.own_dir());
                copy_with_mtime(&own, path)?;
                Ok(CacheDecision::Restored)
            }
            Some(_) => {
                log::debug!("{} was edited, invalidating cache", path.display());
                // Removal failures leave a stale twin behind; the mtime
                // mismatch keeps routing the file to the transform path.
                let _ = fs::remove_file(&other);
                let _ = fs::remove_file(&own);
                Ok(CacheDecision::Transform)
            }
        }
    }

    /// Copies the transformed `path` into its own twin, carrying the mtime.
    /// Runs after every transform, even when the transform left the bytes
    /// unchanged, so the twin mtime tracks the file.
    pub fn update(&self, path: &Path, mode: CacheMode) -> Result<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        let twin = twin_path(root, mode.own_dir(), path)?;
        if let Some(parent) = twin.parent() {
            create_cache_dir(parent)?;
        }
        copy_with_mtime(path, &twin)
    }
}

/// Cache-key path for a source file: the absolute path with the `:` after a
/// single-letter leading segment removed, so trees reached through different
/// drive prefixes share one cache entry.
pub fn canon_path(path: &Path) -> Result<PathBuf> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let mut cleaned = PathBuf::new();
    for comp in abs.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    let text = cleaned.to_string_lossy();
    match text.split_once(':') {
        Some((before, after)) if before.len() == 1 => Ok(PathBuf::from(format!("{before}{after}"))),
        _ => Ok(cleaned),
    }
}

fn twin_path(root: &Path, dir: &str, path: &Path) -> Result<PathBuf> {
    let canon = canon_path(path)?;
    let mut twin = root.join(dir);
    for comp in canon.components() {
        if let Component::Normal(seg) = comp {
            twin.push(seg);
        }
    }
    Ok(twin)
}

fn mtime_of(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Copies `src` onto `dst` and restores the source mtime on the copy. The
/// coherence protocol compares mtimes for equality, so a copy that loses the
/// mtime would defeat every later freshness check.
pub fn copy_with_mtime(src: &Path, dst: &Path) -> Result<()> {
    let mtime = fs::metadata(src)?.modified()?;
    let bytes = fs::read(src)?;
    fs::write(dst, &bytes)?;
    let file = fs::OpenOptions::new().write(true).open(dst)?;
    file.set_modified(mtime)?;
    Ok(())
}

fn create_cache_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
    }
    #[cfg(not(unix))]
    fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canon_normalizes_dot_segments() {
        assert_eq!(
            canon_path(Path::new("/tmp/../tmp/./x")).unwrap(),
            PathBuf::from("/tmp/x")
        );
    }

    #[test]
    fn canon_keeps_colons_after_longer_segments() {
        // Only a single-letter leading segment marks a drive prefix.
        assert_eq!(
            canon_path(Path::new("/e:/work/main.c")).unwrap(),
            PathBuf::from("/e:/work/main.c")
        );
    }

    #[cfg(windows)]
    #[test]
    fn canon_strips_windows_drive_colon() {
        assert_eq!(
            canon_path(Path::new("C:\\work\\main.c")).unwrap(),
            PathBuf::from("C\\work\\main.c")
        );
    }

    #[test]
    fn twin_paths_land_under_their_mode_directory() {
        let root = Path::new("/home/u/.trice/cache");
        let twin = twin_path(root, CLEANED_DIR, Path::new("/work/src/main.c")).unwrap();
        assert_eq!(twin, PathBuf::from("/home/u/.trice/cache/cleaned/work/src/main.c"));
    }

    #[test]
    fn copy_carries_the_source_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.c");
        let dst = dir.path().join("b.c");
        fs::write(&src, b"TRICE( \"boot\" );\n").unwrap();

        let past = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_600_000_000);
        fs::OpenOptions::new()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(past)
            .unwrap();

        copy_with_mtime(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst).unwrap(), fs::read(&src).unwrap());
        assert_eq!(mtime_of(&dst).unwrap(), past);
    }

    #[test]
    fn disabled_cache_always_transforms() {
        let cfg = RunConfig::with_defaults();
        let cache = FileCache::open(&cfg);
        assert!(!cache.is_active());
        let decision = cache
            .check(Path::new("/nowhere.c"), SystemTime::now(), CacheMode::Clean)
            .unwrap();
        assert_eq!(decision, CacheDecision::Transform);
    }

    #[test]
    fn enabled_cache_without_root_directory_stays_inactive() {
        let home = tempfile::tempdir().unwrap();
        let cfg = RunConfig {
            cache_enabled: true,
            user_home: home.path().to_path_buf(),
            ..RunConfig::with_defaults()
        };
        assert!(!FileCache::open(&cfg).is_active());
    }
}
