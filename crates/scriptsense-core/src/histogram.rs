//! Per-word confidence distribution.

pub const BUCKET_LABELS: [&str; 5] = ["0-20%", "20-40%", "40-60%", "60-80%", "80-100%"];

/// Counts of word confidence scores in five fixed 20% buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfidenceHistogram {
    counts: [usize; 5],
}

impl ConfidenceHistogram {
    /// Bucket `scores` (nominally in `[0, 1]`). Every score lands in exactly one
    /// bucket: the ranges are half-open except the last, which includes 1.0.
    /// Out-of-range values clamp to the nearest end; NaN counts as high.
    pub fn from_scores(scores: &[f64]) -> Self {
        let mut counts = [0usize; 5];
        for &score in scores {
            counts[bucket(score)] += 1;
        }
        Self { counts }
    }

    pub fn counts(&self) -> [usize; 5] {
        self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// `(label, count)` pairs in bucket order.
    pub fn buckets(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        BUCKET_LABELS.iter().copied().zip(self.counts.iter().copied())
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

fn bucket(score: f64) -> usize {
    let pct = score * 100.0;
    if pct < 20.0 {
        0
    } else if pct < 40.0 {
        1
    } else if pct < 60.0 {
        2
    } else if pct < 80.0 {
        3
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_reference_scores() {
        let h = ConfidenceHistogram::from_scores(&[0.15, 0.25, 0.65, 0.95, 1.0]);
        assert_eq!(h.counts(), [1, 1, 0, 1, 2]);
        assert_eq!(h.total(), 5);
    }

    #[test]
    fn boundaries_belong_to_upper_bucket() {
        let h = ConfidenceHistogram::from_scores(&[0.0, 0.2, 0.4, 0.6, 0.8]);
        assert_eq!(h.counts(), [1, 1, 1, 1, 1]);
    }

    #[test]
    fn out_of_range_values_still_counted() {
        let h = ConfidenceHistogram::from_scores(&[-0.5, 1.7, f64::NAN]);
        assert_eq!(h.counts(), [1, 0, 0, 0, 2]);
        assert_eq!(h.total(), 3);
    }

    #[test]
    fn labels_pair_with_counts() {
        let h = ConfidenceHistogram::from_scores(&[0.9]);
        let pairs: Vec<_> = h.buckets().collect();
        assert_eq!(pairs[0], ("0-20%", 0));
        assert_eq!(pairs[4], ("80-100%", 1));
        assert_eq!(h.max_count(), 1);
        assert_eq!(ConfidenceHistogram::default().total(), 0);
    }
}
