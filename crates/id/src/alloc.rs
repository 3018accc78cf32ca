use crate::catalog::IdCatalog;
use crate::error::{IdError, Result};
use crate::fmt::TriceId;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Strategy for picking a fresh ID out of the configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    Random,
    Upward,
    Downward,
}

impl SearchMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            SearchMethod::Random => "random",
            SearchMethod::Upward => "upward",
            SearchMethod::Downward => "downward",
        }
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMethod {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(SearchMethod::Random),
            "upward" => Ok(SearchMethod::Upward),
            "downward" => Ok(SearchMethod::Downward),
            other => Err(IdError::UnknownSearchMethod(other.to_string())),
        }
    }
}

impl IdCatalog {
    /// Picks an ID inside `[min,max]` that is not a key of the catalog.
    ///
    /// The catalog is not mutated; calling twice without an intervening
    /// [`IdCatalog::insert`] may return the same ID. Fails when the range is
    /// fully occupied.
    pub fn new_id(&self, min: TriceId, max: TriceId, method: SearchMethod) -> Result<TriceId> {
        if min > max {
            return Err(IdError::Other(format!("empty ID range [{min},{max}]")));
        }
        let interval = (max - min + 1) as usize;
        let used = self.len();
        if used >= interval {
            return Err(IdError::IdSpaceExhausted { min, max, used });
        }
        if interval - used < interval / 8 {
            log::info!("less than 12.5% of IDs free ({used} of {interval} in use)");
        }
        log::debug!("IDMin={min} IDMax={max} IDMethod={method}");

        match method {
            SearchMethod::Upward => self.scan_free(min, max, min..=max),
            SearchMethod::Downward => self.scan_free(min, max, (min..=max).rev()),
            SearchMethod::Random => self.random_free(min, max, interval, used),
        }
    }

    fn scan_free(
        &self,
        min: TriceId,
        max: TriceId,
        candidates: impl Iterator<Item = TriceId>,
    ) -> Result<TriceId> {
        // The occupancy check above compares against the whole catalog; keys
        // outside [min,max] can still leave the range itself full.
        for id in candidates {
            if !self.contains(id) {
                return Ok(id);
            }
        }
        Err(IdError::IdSpaceExhausted {
            min,
            max,
            used: self.len(),
        })
    }

    fn random_free(
        &self,
        min: TriceId,
        max: TriceId,
        interval: usize,
        used: usize,
    ) -> Result<TriceId> {
        let mut rng = rand::thread_rng();

        // Near the fill cap the retry loop degenerates; enumerate the free
        // IDs and sample one instead. Still uniform over the free set.
        if used * 8 >= interval * 7 {
            let free: Vec<TriceId> = (min..=max).filter(|&id| !self.contains(id)).collect();
            if free.is_empty() {
                return Err(IdError::IdSpaceExhausted {
                    min,
                    max,
                    used: self.len(),
                });
            }
            return Ok(free[rng.gen_range(0..free.len())]);
        }

        loop {
            let id = rng.gen_range(min..=max);
            if !self.contains(id) {
                return Ok(id);
            }
            log::debug!("ID {id} used, next try...");
        }
    }
}
