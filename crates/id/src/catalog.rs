use crate::config::RunConfig;
use crate::error::{IdError, Result};
use crate::fmt::{
    specifier_count, typ_suffix, LocationInfo, TriceFmt, TriceId, TypSuffix, MAX_SPECIFIER_COUNT,
};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Reserved catalog name: start from an empty map instead of reading a file.
pub const EMPTY_FILE: &str = "emptyFile";

/// The persisted ID list: `TriceId -> TriceFmt`.
///
/// Keys are unique; values are not. Two IDs carrying the same format record
/// is the duplicate-string case and is legal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdCatalog {
    entries: BTreeMap<TriceId, TriceFmt>,
}

impl IdCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the JSON ID list at `path`. The name [`EMPTY_FILE`] and a
    /// zero-length file both yield an empty catalog; an unreadable file or
    /// malformed JSON is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let mut catalog = Self::new();
        catalog.merge_file(path)?;
        Ok(catalog)
    }

    /// Merges the JSON ID list at `path` into `self`. Existing keys are
    /// overwritten, new keys are added.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str() == EMPTY_FILE {
            return Ok(());
        }
        let bytes = fs::read(path).map_err(|source| IdError::CatalogUnreadable {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("read ID list {} ({} bytes)", path.display(), bytes.len());
        self.merge_json(&bytes)
    }

    /// Merges a JSON document into `self`. An empty slice is a no-op.
    pub fn merge_json(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let parsed: BTreeMap<TriceId, TriceFmt> = serde_json::from_slice(bytes)?;
        self.entries.extend(parsed);
        Ok(())
    }

    /// Writes the full catalog to `path` as tab-indented JSON, replacing the
    /// file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_file(path, &self.entries)
    }

    /// Unconditional set. The caller obtained `id` from [`Self::new_id`] or
    /// from an already-tagged invocation.
    pub fn insert(&mut self, id: TriceId, fmt: TriceFmt) -> Option<TriceFmt> {
        self.entries.insert(id, fmt)
    }

    pub fn get(&self, id: TriceId) -> Option<&TriceFmt> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: TriceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TriceId, &TriceFmt)> + '_ {
        self.entries.iter().map(|(&id, fmt)| (id, fmt))
    }

    /// Builds the reverse index `TriceFmt -> [TriceId]`. Every catalog entry
    /// lands in exactly one list; IDs are appended in ascending order. Case
    /// of the type tag is preserved.
    pub fn reverse(&self) -> HashMap<TriceFmt, Vec<TriceId>> {
        let mut rev: HashMap<TriceFmt, Vec<TriceId>> = HashMap::new();
        for (&id, fmt) in &self.entries {
            rev.entry(fmt.clone()).or_default().push(id);
        }
        rev
    }

    /// Appends the argument count to every type tag that omits it
    /// (`TRICE16` with two specifiers becomes `TRICE16_2`) and reports
    /// entries whose tag and specifier count disagree.
    ///
    /// Only values are rewritten; the key set never changes during the pass.
    pub fn add_fmt_count(&mut self, cfg: &RunConfig) {
        for fmt in self.entries.values_mut() {
            let n = specifier_count(&fmt.strg);
            if n > MAX_SPECIFIER_COUNT {
                log::warn!("invalid format specifier count {n} - please check {fmt:?}");
                continue;
            }
            if fmt.typ.contains(['S', 'N', 'B']) {
                if n != 1 && !cfg.is_alias_strg(&fmt.strg) {
                    log::warn!("{fmt:?} <- expected format specifier count 1 but got {n}");
                }
                continue;
            }
            if fmt.typ.contains('F') {
                if n != 0 {
                    log::warn!("{fmt:?} <- expected format specifier count 0 but got {n}");
                }
                continue;
            }
            match typ_suffix(&fmt.typ) {
                TypSuffix::Malformed => {
                    log::warn!("unexpected trice type - please check {fmt:?}");
                    continue;
                }
                TypSuffix::Counted => continue,
                TypSuffix::None => {}
            }
            if n == 0 {
                continue;
            }
            fmt.typ = format!("{}_{}", fmt.typ, n);
        }
    }
}

impl FromIterator<(TriceId, TriceFmt)> for IdCatalog {
    fn from_iter<I: IntoIterator<Item = (TriceId, TriceFmt)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// The persisted location index: `TriceId -> LocationInfo`. Parallel to the
/// ID catalog; missing entries are tolerated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationCatalog {
    entries: BTreeMap<TriceId, LocationInfo>,
}

impl LocationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the location file at `path`. With `logging` set a missing file
    /// yields an empty index; otherwise it is fatal like a missing ID list.
    pub fn load(path: &Path, logging: bool) -> Result<Self> {
        if path.as_os_str() == EMPTY_FILE {
            return Ok(Self::new());
        }
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) if logging => {
                log::debug!(
                    "location file {} not found, not showing location information",
                    path.display()
                );
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(IdError::CatalogUnreadable {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        Ok(Self {
            entries: serde_json::from_slice(&bytes)?,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_file(path, &self.entries)
    }

    pub fn insert(&mut self, id: TriceId, li: LocationInfo) -> Option<LocationInfo> {
        self.entries.insert(id, li)
    }

    pub fn get(&self, id: TriceId) -> Option<&LocationInfo> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serializes `value` as tab-indented JSON and replaces `path` atomically
/// (write to a sibling tmp file, then rename).
fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &buf)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
