use screener_core::ScoreResult;

/// Sector choice that disables the sector filter.
pub const ALL_SECTORS: &str = "All Sectors";

/// Display-only filter over screener results.
#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    sector: Option<String>,
    search: Option<String>,
}

impl ResultFilter {
    pub fn new(sector: Option<&str>, search: Option<&str>) -> Self {
        Self {
            sector: sector
                .map(str::trim)
                .filter(|s| !s.is_empty() && *s != ALL_SECTORS)
                .map(str::to_string),
            search: search
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
        }
    }

    /// Sector must match exactly; the search text must appear in the ticker
    /// or the sector, ignoring case.
    pub fn matches(&self, result: &ScoreResult) -> bool {
        if let Some(sector) = &self.sector {
            if result.sector.as_deref() != Some(sector.as_str()) {
                return false;
            }
        }

        match &self.search {
            Some(needle) => {
                result.ticker.to_lowercase().contains(needle)
                    || result
                        .sector
                        .as_deref()
                        .is_some_and(|s| s.to_lowercase().contains(needle))
            }
            None => true,
        }
    }

    pub fn apply<'a>(&self, results: &'a [ScoreResult]) -> Vec<&'a ScoreResult> {
        results.iter().filter(|r| self.matches(r)).collect()
    }
}
