//! Feature quantization for histogram-based split search.

use ndarray::{Array2, ArrayView1, ArrayView2};

/// Per-feature bin upper bounds.
///
/// A value `v` falls in the first bin `b` with `v <= bounds[b]`. The last
/// bound is always `+inf`, so every finite value maps to a bin.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    bounds: Vec<f64>,
}

impl BinMapper {
    /// Builds bins for one feature column with at most `max_bin` bins.
    ///
    /// With few distinct values every value gets its own bin; otherwise cut
    /// points are placed at evenly spaced quantiles of the distinct values.
    pub fn fit(column: ArrayView1<'_, f64>, max_bin: usize) -> Self {
        let mut distinct: Vec<f64> = column.to_vec();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();

        let max_bin = max_bin.max(2);
        let mut bounds = Vec::with_capacity(max_bin);

        if distinct.len() <= max_bin {
            for pair in distinct.windows(2) {
                bounds.push(midpoint(pair[0], pair[1]));
            }
        } else {
            let n = distinct.len();
            for b in 1..max_bin {
                let pos = b * n / max_bin;
                let bound = midpoint(distinct[pos - 1], distinct[pos]);
                if bounds.last().is_none_or(|last| bound > *last) {
                    bounds.push(bound);
                }
            }
        }

        bounds.push(f64::INFINITY);
        Self { bounds }
    }

    /// Number of bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.bounds.len()
    }

    /// Bin index for a value.
    #[must_use]
    pub fn bin(&self, value: f64) -> usize {
        self.bounds
            .partition_point(|b| *b < value)
            .min(self.bounds.len() - 1)
    }

    /// Threshold such that `v <= threshold` exactly when `bin(v) <= bin`.
    #[must_use]
    pub fn upper_bound(&self, bin: usize) -> f64 {
        self.bounds[bin]
    }
}

/// Training matrix quantized once, column by column.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    mappers: Vec<BinMapper>,
    bins: Array2<u16>,
}

impl BinnedMatrix {
    /// Quantizes every column of `x`.
    pub fn new(x: ArrayView2<'_, f64>, max_bin: usize) -> Self {
        let mappers: Vec<BinMapper> = x
            .columns()
            .into_iter()
            .map(|col| BinMapper::fit(col, max_bin))
            .collect();
        let bins = Array2::from_shape_fn(x.dim(), |(i, j)| {
            u16::try_from(mappers[j].bin(x[[i, j]])).unwrap_or(u16::MAX)
        });
        Self { mappers, bins }
    }

    /// Mapper for feature `j`.
    #[must_use]
    pub fn mapper(&self, j: usize) -> &BinMapper {
        &self.mappers[j]
    }

    /// Bin of row `i`, feature `j`.
    #[must_use]
    pub fn bin(&self, i: usize, j: usize) -> usize {
        usize::from(self.bins[[i, j]])
    }

    /// Number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mappers.len()
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    a + (b - a) / 2.0
}
