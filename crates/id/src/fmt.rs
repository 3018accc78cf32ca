use serde::{Deserialize, Serialize};

/// Numeric identifier of one trice call site. `0` marks an untagged invocation.
pub type TriceId = u32;

/// Largest argument count a trice macro family carries in its `_N` suffix.
pub const MAX_SPECIFIER_COUNT: usize = 12;

/// Type tag and format string of one trice invocation.
///
/// Serialized field names match the on-disk ID list format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriceFmt {
    #[serde(rename = "Type")]
    pub typ: String,
    #[serde(rename = "Strg")]
    pub strg: String,
}

impl TriceFmt {
    pub fn new(typ: impl Into<String>, strg: impl Into<String>) -> Self {
        Self {
            typ: typ.into(),
            strg: strg.into(),
        }
    }

    /// Returns the type tag with the argument count appended (`TRICE16` ->
    /// `TRICE16_2`), or `None` when the tag must stay as written:
    /// letter-tagged variants (`S`/`N`/`B`/`F`), tags that already carry a
    /// suffix (valid or malformed), and zero-argument strings.
    pub fn counted_typ(&self) -> Option<String> {
        let n = specifier_count(&self.strg);
        if n == 0 || n > MAX_SPECIFIER_COUNT {
            return None;
        }
        if self.typ.contains(['S', 'N', 'B', 'F']) {
            return None;
        }
        if typ_suffix(&self.typ) != TypSuffix::None {
            return None;
        }
        Some(format!("{}_{}", self.typ, n))
    }
}

/// Shape of a type tag's `_`-suffix under the argument-count convention.
/// The reconciler and fresh inserts both consult this, so they cannot
/// disagree on what counts as already normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TypSuffix {
    /// No underscore part; appending `_N` is allowed.
    None,
    /// `_N` with a count in range; the tag stays as written.
    Counted,
    /// Extra underscores or a non-numeric/out-of-range suffix; reported by
    /// the reconciler, never rewritten.
    Malformed,
}

pub(crate) fn typ_suffix(typ: &str) -> TypSuffix {
    let mut parts = typ.split('_');
    parts.next();
    let Some(suffix) = parts.next() else {
        return TypSuffix::None;
    };
    if parts.next().is_some() {
        return TypSuffix::Malformed;
    }
    match suffix.parse::<usize>() {
        Ok(count) if count <= MAX_SPECIFIER_COUNT => TypSuffix::Counted,
        _ => TypSuffix::Malformed,
    }
}

/// File and line a trice ID was last seen at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(rename = "File")]
    pub file: String,
    #[serde(rename = "Line")]
    pub line: u32,
}

/// Counts the `%`-directives in a C-style format string. `%%` is a literal
/// percent sign and counts as zero.
pub fn specifier_count(strg: &str) -> usize {
    let mut n = 0;
    let mut chars = strg.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        match chars.next() {
            Some('%') | None => {}
            Some(_) => n += 1,
        }
    }
    n
}
