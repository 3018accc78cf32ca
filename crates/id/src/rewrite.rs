use crate::catalog::{IdCatalog, LocationCatalog};
use crate::config::RunConfig;
use crate::error::Result;
use crate::fmt::{LocationInfo, TriceFmt, TriceId};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Matches one trice invocation up to and including its format string:
/// macro name (all case families, optional width, optional letter tag,
/// optional `_N` suffix), opening parenthesis, optional `iD(n)` argument,
/// string literal.
const TRICE_INVOCATION: &str = r#"(?P<typ>\b(?:TRICE|TRice|Trice|trice)(?:8|16|32|64)?[SNBF]?(?:_(?:[0-9]{1,2}|[SNBF]))?(?:_[0-9]{1,2})?)\s*\(\s*(?:(?:iD|Id|ID|id)\s*\(\s*(?P<id>[0-9]+)\s*\)\s*,\s*)?(?P<strg>"(?:[^"\\]|\\.)*")"#;

pub struct CleanOutcome {
    pub text: String,
    pub modified: bool,
    /// Number of `iD(n)` arguments removed.
    pub removed: usize,
}

pub struct InsertOutcome {
    pub text: String,
    pub modified: bool,
    /// Invocations that received an ID in this pass.
    pub assigned: usize,
    /// Invocations that already carried an ID and were re-bound.
    pub rebound: usize,
}

/// Rewrites trice invocations inside source buffers.
pub struct Rewriter {
    re: Regex,
}

impl Rewriter {
    pub fn new() -> Self {
        Self {
            re: Regex::new(TRICE_INVOCATION).expect("invocation pattern is valid"),
        }
    }

    /// Strips the `iD(n)` argument from every tagged invocation. Untagged
    /// invocations pass through byte-identical.
    pub fn clean(&self, text: &str) -> CleanOutcome {
        let mut removed = 0;
        let out = self.re.replace_all(text, |caps: &Captures| {
            if caps.name("id").is_some() {
                removed += 1;
                format!("{}( {}", &caps["typ"], &caps["strg"])
            } else {
                caps[0].to_string()
            }
        });
        CleanOutcome {
            modified: removed > 0,
            text: out.into_owned(),
            removed,
        }
    }

    /// Tags every untagged invocation with an ID and records it in the
    /// catalog, the reverse index, and the location index.
    ///
    /// An invocation whose format record already has catalog IDs reuses the
    /// first of them; otherwise a fresh ID is allocated and bound in the
    /// same step, so repeated identical invocations share one ID. An
    /// invocation already carrying a nonzero ID keeps it and is re-bound;
    /// `iD(0)` counts as untagged.
    pub fn insert(
        &self,
        file: &str,
        text: &str,
        cfg: &RunConfig,
        catalog: &mut IdCatalog,
        rev: &mut HashMap<TriceFmt, Vec<TriceId>>,
        locations: &mut LocationCatalog,
    ) -> Result<InsertOutcome> {
        let mut out = String::with_capacity(text.len() + 64);
        let mut last = 0;
        let mut assigned = 0;
        let mut rebound = 0;

        for caps in self.re.captures_iter(text) {
            let whole = caps.get(0).expect("group 0 always participates");
            let typ = &caps["typ"];
            let strg_lit = &caps["strg"];
            let fmt = normalized_fmt(typ, &strg_lit[1..strg_lit.len() - 1]);
            let line = line_of(text, whole.start());

            let existing: Option<TriceId> = caps
                .name("id")
                .and_then(|m| m.as_str().parse().ok())
                .filter(|&id| id != 0);

            match existing {
                Some(id) => {
                    bind(id, fmt, catalog, rev, locations, file, line);
                    rebound += 1;
                    out.push_str(&text[last..whole.end()]);
                }
                None => {
                    let id = match rev.get(&fmt).and_then(|ids| ids.first()) {
                        Some(&id) => id,
                        None => catalog.new_id(cfg.id_min, cfg.id_max, cfg.id_method)?,
                    };
                    bind(id, fmt, catalog, rev, locations, file, line);
                    assigned += 1;
                    out.push_str(&text[last..whole.start()]);
                    let _ = write!(out, "{typ}( iD({id}), {strg_lit}");
                }
            }
            last = whole.end();
        }
        out.push_str(&text[last..]);

        Ok(InsertOutcome {
            modified: assigned > 0,
            text: out,
            assigned,
            rebound,
        })
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Catalog entries store the counted type tag (`TRICE` with one specifier is
/// recorded as `TRICE_1`) so lookups agree with what the reconciler writes.
fn normalized_fmt(typ: &str, strg: &str) -> TriceFmt {
    let fmt = TriceFmt::new(typ, strg);
    match fmt.counted_typ() {
        Some(counted) => TriceFmt::new(counted, fmt.strg),
        None => fmt,
    }
}

/// Binds `(id, fmt)` in the catalog and keeps the reverse index and location
/// index in step. Allocation and insertion stay one step so a later
/// invocation with the same format sees the binding.
fn bind(
    id: TriceId,
    fmt: TriceFmt,
    catalog: &mut IdCatalog,
    rev: &mut HashMap<TriceFmt, Vec<TriceId>>,
    locations: &mut LocationCatalog,
    file: &str,
    line: u32,
) {
    if let Some(old) = catalog.insert(id, fmt.clone()) {
        if old != fmt {
            if let Some(ids) = rev.get_mut(&old) {
                ids.retain(|&known| known != id);
            }
        }
    }
    let ids = rev.entry(fmt).or_default();
    if !ids.contains(&id) {
        ids.push(id);
    }
    locations.insert(
        id,
        LocationInfo {
            file: file.to_string(),
            line,
        },
    );
}

fn line_of(text: &str, offset: usize) -> u32 {
    text[..offset].bytes().filter(|&b| b == b'\n').count() as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::SearchMethod;
    use pretty_assertions::assert_eq;

    fn upward_cfg() -> RunConfig {
        RunConfig {
            id_min: 100,
            id_max: 200,
            id_method: SearchMethod::Upward,
            ..RunConfig::with_defaults()
        }
    }

    fn insert_all(
        text: &str,
        catalog: &mut IdCatalog,
        locations: &mut LocationCatalog,
    ) -> InsertOutcome {
        let cfg = upward_cfg();
        let mut rev = catalog.reverse();
        Rewriter::new()
            .insert("src/main.c", text, &cfg, catalog, &mut rev, locations)
            .unwrap()
    }

    #[test]
    fn clean_strips_id_arguments() {
        let out = Rewriter::new().clean("TRICE( iD(100), \"hi %d\\n\", x );\n");
        assert!(out.modified);
        assert_eq!(out.removed, 1);
        assert_eq!(out.text, "TRICE( \"hi %d\\n\", x );\n");
    }

    #[test]
    fn clean_leaves_untagged_invocations_untouched() {
        let text = "trice8_2( \"a %u %u\\n\", x, y );\n";
        let out = Rewriter::new().clean(text);
        assert!(!out.modified);
        assert_eq!(out.text, text);
    }

    #[test]
    fn clean_handles_all_id_macro_spellings() {
        let text = "TRICE( Id(1), \"a\" ); TRICE( ID(2), \"b\" ); TRICE( id(3), \"c\" );\n";
        let out = Rewriter::new().clean(text);
        assert_eq!(out.removed, 3);
        assert_eq!(out.text, "TRICE( \"a\" ); TRICE( \"b\" ); TRICE( \"c\" );\n");
    }

    #[test]
    fn insert_assigns_fresh_ids_and_records_catalog_entries() {
        let mut catalog = IdCatalog::new();
        let mut locations = LocationCatalog::new();
        let out = insert_all(
            "TRICE( \"boot\\n\" );\ntrice16( \"x=%d\\n\", x );\n",
            &mut catalog,
            &mut locations,
        );

        assert!(out.modified);
        assert_eq!(out.assigned, 2);
        assert_eq!(
            out.text,
            "TRICE( iD(100), \"boot\\n\" );\ntrice16( iD(101), \"x=%d\\n\", x );\n"
        );
        assert_eq!(catalog.get(100).unwrap(), &TriceFmt::new("TRICE", "boot\\n"));
        assert_eq!(
            catalog.get(101).unwrap(),
            &TriceFmt::new("trice16_1", "x=%d\\n")
        );
        assert_eq!(locations.get(101).unwrap().line, 2);
    }

    #[test]
    fn insert_reuses_the_id_of_an_identical_format() {
        let mut catalog = IdCatalog::new();
        let mut locations = LocationCatalog::new();
        let out = insert_all(
            "TRICE( \"tick\\n\" );\nTRICE( \"tick\\n\" );\n",
            &mut catalog,
            &mut locations,
        );

        assert_eq!(out.assigned, 2);
        assert_eq!(
            out.text,
            "TRICE( iD(100), \"tick\\n\" );\nTRICE( iD(100), \"tick\\n\" );\n"
        );
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn insert_keeps_existing_tags_and_rebinds_them() {
        let mut catalog = IdCatalog::new();
        let mut locations = LocationCatalog::new();
        let text = "TRICE( iD(150), \"seen\\n\" );\n";
        let out = insert_all(text, &mut catalog, &mut locations);

        assert!(!out.modified);
        assert_eq!(out.rebound, 1);
        assert_eq!(out.text, text);
        assert_eq!(catalog.get(150).unwrap().strg, "seen\\n");
    }

    #[test]
    fn insert_replaces_the_zero_id() {
        let mut catalog = IdCatalog::new();
        let mut locations = LocationCatalog::new();
        let out = insert_all("TRICE( iD(0), \"fresh\\n\" );\n", &mut catalog, &mut locations);

        assert_eq!(out.assigned, 1);
        assert_eq!(out.text, "TRICE( iD(100), \"fresh\\n\" );\n");
    }

    #[test]
    fn insert_handles_escaped_quotes_in_format_strings() {
        let mut catalog = IdCatalog::new();
        let mut locations = LocationCatalog::new();
        let out = insert_all(
            "TRICE( \"say \\\"hi\\\" %u\\n\", n );\n",
            &mut catalog,
            &mut locations,
        );

        assert_eq!(out.assigned, 1);
        assert_eq!(catalog.get(100).unwrap().strg, "say \\\"hi\\\" %u\\n");
    }

    #[test]
    fn insert_then_clean_round_trips_the_source() {
        let original = "TRice( \"msg: %d\\n\", value );\n";
        let mut catalog = IdCatalog::new();
        let mut locations = LocationCatalog::new();
        let inserted = insert_all(original, &mut catalog, &mut locations);
        let cleaned = Rewriter::new().clean(&inserted.text);
        assert_eq!(cleaned.text, original);
    }

    #[test]
    fn letter_tagged_variants_match() {
        let mut catalog = IdCatalog::new();
        let mut locations = LocationCatalog::new();
        let out = insert_all(
            "TRICE_S( \"%s\\n\", name );\ntriceS( \"%s\\n\", name );\n",
            &mut catalog,
            &mut locations,
        );

        assert_eq!(out.assigned, 2);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.iter().any(|(_, fmt)| fmt.typ == "TRICE_S"));
        assert!(catalog.iter().any(|(_, fmt)| fmt.typ == "triceS"));
    }
}
