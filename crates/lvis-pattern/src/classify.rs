// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

//! Nearest-pattern scoring with a top-2 criterion.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{PatternError, Result};
use crate::metric::Metric;
use crate::table::PatternTable;

/// Outcome of scoring one probe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Category with the smallest distance.
    pub best: usize,
    /// 1 unless `best` is the true category.
    pub err: u8,
    /// 1 unless one of the two nearest is the true category.
    pub err2: u8,
    /// `(distance, category)` ascending; equal distances keep category order.
    pub ranking: Vec<(f32, usize)>,
}

impl Classification {
    pub fn second(&self) -> Option<usize> {
        self.ranking.get(1).map(|&(_, c)| c)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    pub metric: Metric,
}

impl Classifier {
    pub fn new(metric: Metric) -> Self {
        Self { metric }
    }

    /// Ranks every stored pattern against `probe` and scores the result
    /// against `truth`. A probe whose length differs from the table's cell
    /// length is rejected with [`PatternError::ProbeSize`].
    pub fn classify(&self, table: &PatternTable, probe: &[f32], truth: usize) -> Result<Classification> {
        let expected = table.cell_len();
        if probe.len() != expected {
            return Err(PatternError::ProbeSize {
                expected,
                got: probe.len(),
            });
        }
        if truth >= table.len() {
            return Err(PatternError::CategoryOutOfRange {
                index: truth,
                categories: table.len(),
            });
        }

        let mut ranking: Vec<(f32, usize)> = table
            .rows()
            .enumerate()
            .map(|(cat, row)| (self.metric.distance(probe, row), cat))
            .collect();
        ranking.sort_by(|a, b| a.0.total_cmp(&b.0));

        let best = ranking[0].1;
        let err = u8::from(best != truth);
        let err2 = u8::from(!ranking.iter().take(2).any(|&(_, c)| c == truth));
        trace!(best, truth, err, err2, "classified probe");
        Ok(Classification {
            best,
            err,
            err2,
            ranking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PatternTable {
        let names: Vec<String> = (0..4).map(|i| format!("c{i}")).collect();
        PatternTable::localist(2, 2, 2, names).unwrap()
    }

    #[test]
    fn stored_pattern_classifies_as_itself() {
        let table = table();
        let clf = Classifier::default();
        for k in 0..table.len() {
            let probe = table.row(k).unwrap().to_vec();
            let res = clf.classify(&table, &probe, k).unwrap();
            assert_eq!(res.best, k);
            assert_eq!(res.err, 0);
            assert_eq!(res.err2, 0);
            assert_eq!(res.ranking.len(), 4);
        }
    }

    #[test]
    fn midpoint_probe_passes_top2_for_either_label() {
        let table = table();
        let clf = Classifier::default();
        let a = table.row(1).unwrap();
        let b = table.row(3).unwrap();
        let probe: Vec<f32> = a.iter().zip(b).map(|(x, y)| 0.5 * (x + y)).collect();
        for truth in [1, 3] {
            let res = clf.classify(&table, &probe, truth).unwrap();
            assert_eq!(res.err2, 0);
        }
        let res = clf.classify(&table, &probe, 0).unwrap();
        assert_eq!(res.err2, 1);
        assert_eq!(res.err, 1);
    }

    #[test]
    fn ties_keep_category_order() {
        let table = table();
        let probe = vec![0.0; 8];
        let res = Classifier::new(Metric::SumSquares)
            .classify(&table, &probe, 2)
            .unwrap();
        let order: Vec<usize> = res.ranking.iter().map(|&(_, c)| c).collect();
        assert_eq!(order, [0, 1, 2, 3]);
        assert_eq!(res.best, 0);
        assert_eq!(res.second(), Some(1));
    }

    #[test]
    fn wrong_probe_length_is_rejected() {
        let err = Classifier::default()
            .classify(&table(), &[1.0; 3], 0)
            .unwrap_err();
        assert!(matches!(err, PatternError::ProbeSize { expected: 8, got: 3 }));
    }
}
