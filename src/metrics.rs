use crate::embed::PlacementOutcome;
use std::path::PathBuf;

/// Counters for one rendered sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetMetrics {
    pub output_path: PathBuf,
    pub placements: usize,
    pub embedded: usize,
    pub fallbacks: usize,
    pub misses: usize,
    pub skipped: usize,
    pub bytes_written: usize,
}

impl SheetMetrics {
    pub(crate) fn record(&mut self, outcome: PlacementOutcome) {
        self.placements += 1;
        match outcome {
            PlacementOutcome::Embedded => self.embedded += 1,
            PlacementOutcome::Fallback(_) => self.fallbacks += 1,
            PlacementOutcome::Miss => self.misses += 1,
            PlacementOutcome::Skipped => self.skipped += 1,
        }
    }
}
