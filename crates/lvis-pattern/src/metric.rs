// SPDX-License-Identifier: AGPL-3.0-or-later
// © 2025 Ryo ∴ SpiralArchitect (kishkavsesvit@icloud.com)
// Part of SpiralTorch — Licensed under AGPL-3.0-or-later.
// Unauthorized derivative works or closed redistribution prohibited under AGPL §13.

use serde::{Deserialize, Serialize};

/// Increasing distance measures: smaller means more similar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// One minus Pearson correlation.
    #[default]
    InvCorrelation,
    /// One minus cosine similarity.
    InvCosine,
    Euclidean,
    SumSquares,
    /// Count of cells on opposite sides of 0.5.
    Hamming,
}

impl Metric {
    /// Distance between equal-length vectors. Extra cells in the longer
    /// slice are ignored; callers check lengths.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::InvCorrelation => 1.0 - correlation(a, b),
            Metric::InvCosine => 1.0 - cosine(a, b),
            Metric::Euclidean => sum_squares(a, b).sqrt(),
            Metric::SumSquares => sum_squares(a, b),
            Metric::Hamming => a
                .iter()
                .zip(b)
                .filter(|(x, y)| (**x > 0.5) != (**y > 0.5))
                .count() as f32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::InvCorrelation => "inv_correlation",
            Metric::InvCosine => "inv_cosine",
            Metric::Euclidean => "euclidean",
            Metric::SumSquares => "sum_squares",
            Metric::Hamming => "hamming",
        }
    }
}

fn sum_squares(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn mean(v: &[f32], n: usize) -> f32 {
    if n == 0 {
        0.0
    } else {
        v[..n].iter().sum::<f32>() / n as f32
    }
}

/// Pearson correlation; zero when either side has no variance.
fn correlation(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (ma, mb) = (mean(a, n), mean(b, n));
    let mut cov = 0.0f32;
    let mut va = 0.0f32;
    let mut vb = 0.0f32;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let (dx, dy) = (x - ma, y - mb);
        cov += dx * dy;
        va += dx * dx;
        vb += dy * dy;
    }
    let denom = (va * vb).sqrt();
    if denom > 0.0 {
        cov / denom
    } else {
        0.0
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na > 0.0 && nb > 0.0 {
        dot / (na * nb)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identical_vectors_are_closest() {
        let a = [0.0, 1.0, 0.0, 1.0];
        let b = [1.0, 0.0, 1.0, 0.0];
        for m in [
            Metric::InvCorrelation,
            Metric::InvCosine,
            Metric::Euclidean,
            Metric::SumSquares,
            Metric::Hamming,
        ] {
            assert!(m.distance(&a, &a) < m.distance(&a, &b), "{}", m.as_str());
            assert_relative_eq!(m.distance(&a, &a), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn anticorrelated_vectors_reach_two() {
        let a = [0.0, 1.0, 0.0, 1.0];
        let b = [1.0, 0.0, 1.0, 0.0];
        assert_relative_eq!(Metric::InvCorrelation.distance(&a, &b), 2.0, epsilon = 1e-6);
        assert_relative_eq!(Metric::SumSquares.distance(&a, &b), 4.0);
        assert_relative_eq!(Metric::Euclidean.distance(&a, &b), 2.0);
        assert_relative_eq!(Metric::Hamming.distance(&a, &b), 4.0);
    }

    #[test]
    fn flat_probe_has_zero_correlation() {
        let flat = [0.3; 4];
        let a = [0.0, 1.0, 0.0, 1.0];
        assert_relative_eq!(Metric::InvCorrelation.distance(&flat, &a), 1.0);
        assert_relative_eq!(Metric::InvCosine.distance(&[0.0; 4], &a), 1.0);
    }
}
