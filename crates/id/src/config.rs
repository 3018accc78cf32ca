use crate::alloc::SearchMethod;
use crate::fmt::TriceId;
use std::path::{Path, PathBuf};

/// File extensions treated as trice-capable sources when scanning.
pub const DEFAULT_SRC_EXTENSIONS: &[&str] = &["c", "h", "cc", "cpp", "cxx", "hpp", "hxx", "inl"];

/// Immutable per-run configuration.
///
/// One value is built at the top of each run and threaded through; tests
/// construct an alternate config instead of mutating process state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Gate for the whole file cache; when off every file is transformed.
    pub cache_enabled: bool,
    /// Root under which `.trice/cache` is resolved. Overridable for tests.
    pub user_home: PathBuf,
    pub id_min: TriceId,
    pub id_max: TriceId,
    pub id_method: SearchMethod,
    pub verbose: bool,
    /// When set, a missing location-information file is silently tolerated.
    pub logging: bool,
    /// Format strings wrapped by this prefix/suffix pair are exempt from the
    /// one-specifier check on letter-tagged types.
    pub s_alias_prefix: String,
    pub s_alias_suffix: String,
    pub src_extensions: Vec<String>,
}

impl RunConfig {
    pub fn with_defaults() -> Self {
        Self {
            cache_enabled: false,
            user_home: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            id_min: 1000,
            id_max: 7999,
            id_method: SearchMethod::Random,
            verbose: false,
            logging: false,
            s_alias_prefix: String::new(),
            s_alias_suffix: String::new(),
            src_extensions: DEFAULT_SRC_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Root directory of the file cache.
    pub fn cache_root(&self) -> PathBuf {
        self.user_home.join(".trice").join("cache")
    }

    /// True when `strg` is wrapped by the configured alias markers. An empty
    /// pair means no alias is configured and nothing is exempt.
    pub fn is_alias_strg(&self, strg: &str) -> bool {
        if self.s_alias_prefix.is_empty() && self.s_alias_suffix.is_empty() {
            return false;
        }
        strg.starts_with(&self.s_alias_prefix) && strg.ends_with(&self.s_alias_suffix)
    }

    pub fn wants_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.src_extensions.iter().any(|want| want == ext))
            .unwrap_or(false)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}
