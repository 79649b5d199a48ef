use serde::{Deserialize, Serialize};

/// An inclusive, 1-based range of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineInterval {
    pub start: usize,
    pub end: usize,
}

impl LineInterval {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start >= 1 && start <= end, "invalid interval {start}..={end}");
        Self { start, end }
    }

    pub fn single(line: usize) -> Self {
        Self::new(line, line)
    }

    pub fn line_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// Widen by `window` lines on each side, clamped to `1..=line_count`.
    pub fn expand(self, window: usize, line_count: usize) -> Self {
        let start = self.start.saturating_sub(window).max(1);
        let end = self.end.saturating_add(window).min(line_count).max(start);
        Self { start, end }
    }
}

/// Sort and merge intervals that overlap or touch (`next.start <= end + 1`).
pub fn merge_intervals(mut intervals: Vec<LineInterval>) -> Vec<LineInterval> {
    intervals.sort_unstable();
    let mut merged: Vec<LineInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start <= last.end + 1 => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_overlapping_and_adjacent() {
        let merged = merge_intervals(vec![
            LineInterval::new(20, 25),
            LineInterval::new(1, 3),
            LineInterval::new(4, 6),
            LineInterval::new(22, 30),
            LineInterval::new(40, 40),
        ]);
        assert_eq!(
            merged,
            vec![
                LineInterval::new(1, 6),
                LineInterval::new(20, 30),
                LineInterval::new(40, 40)
            ]
        );
    }

    #[test]
    fn keeps_gapped_intervals_apart() {
        let merged = merge_intervals(vec![LineInterval::new(1, 3), LineInterval::new(5, 6)]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn expand_clamps_to_file() {
        assert_eq!(LineInterval::new(2, 3).expand(5, 10), LineInterval::new(1, 8));
        assert_eq!(LineInterval::new(9, 9).expand(5, 10), LineInterval::new(4, 10));
        assert_eq!(LineInterval::new(4, 4).expand(0, 10), LineInterval::new(4, 4));
    }
}
