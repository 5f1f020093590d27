use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{DatasetError, Result};
use crate::types::{MatchedPair, SplitAssignment, SplitCounts, SplitRatios};

/// Number of items per split for `total` items.
///
/// Train and val are floored; test takes whatever is left so the three counts
/// always add up to `total`.
pub fn split_counts(total: usize, ratios: &SplitRatios) -> SplitCounts {
    let train = ((total as f64 * ratios.train()).floor() as usize).min(total);
    let val = ((total as f64 * ratios.val()).floor() as usize).min(total - train);
    SplitCounts {
        train,
        val,
        test: total - train - val,
    }
}

/// Shuffle the pairs and slice them into train, val and test.
///
/// The same input order, ratios and seed always give the same assignment.
/// Without a seed the generator is seeded from system entropy.
pub fn partition(
    mut pairs: Vec<MatchedPair>,
    ratios: &SplitRatios,
    seed: Option<u64>,
) -> Result<SplitAssignment> {
    if pairs.is_empty() {
        return Err(DatasetError::EmptyDataset);
    }

    let counts = split_counts(pairs.len(), ratios);

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    pairs.shuffle(&mut rng);

    let test = pairs.split_off(counts.train + counts.val);
    let val = pairs.split_off(counts.train);
    let train = pairs;

    info!(
        "Split {} pairs into train={}, val={}, test={}",
        counts.total(),
        train.len(),
        val.len(),
        test.len()
    );

    Ok(SplitAssignment { train, val, test })
}
