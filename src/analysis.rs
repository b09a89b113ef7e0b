//! Linear approximations of an S-box and the tables the search engines walk.

use crate::sbox::Sbox;
use crate::utility::weight;
use std::cmp::Ordering;

/// Correlation magnitudes below this threshold are treated as zero and pruned.
pub const TINY: f64 = 6e-50;

/// A single linear approximation of an S-box.
#[derive(Clone, Copy, Debug)]
pub struct Approx {
    /// Input parity mask of the approximation.
    pub input: u64,
    /// Output parity mask of the approximation.
    pub output: u64,
    /// Hamming weight of the output mask.
    pub weight: usize,
    /// Signed correlation of the approximation, or its square once the table
    /// has been converted to ELP form.
    pub corr: f64,
}

/// One direction of a linear approximation table: a bucket of approximations
/// per input parity, sorted by correlation magnitude descending and pruned
/// below [`TINY`].
///
/// Whether `corr` holds a signed correlation or an ELP contribution is a
/// property of the whole table, tracked by the `squared` flag.
#[derive(Clone)]
pub struct ApproxTable {
    size: usize,
    entries: Vec<Vec<Approx>>,
    squared: bool,
}

impl ApproxTable {
    fn new(size: usize, entries: Vec<Vec<Approx>>) -> ApproxTable {
        ApproxTable {
            size,
            entries,
            squared: false,
        }
    }

    /// Returns the approximations with the given input parity.
    #[inline(always)]
    pub fn get(&self, parity: u64) -> &[Approx] {
        &self.entries[parity as usize]
    }

    /// Returns the bit size of the underlying S-box.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns a bitmask covering one S-box slot.
    pub fn mask(&self) -> u64 {
        (1 << self.size) - 1
    }

    /// True once the table holds squared correlations (ELP contributions).
    pub fn is_elp(&self) -> bool {
        self.squared
    }
}

/// Enumerates all linear approximations of the S-box.
///
/// Returns the forward table (indexed by input parity) and the backward table
/// (indexed by output parity). Both tables are sorted by correlation magnitude
/// descending, ties broken by (input, output) ascending, and truncated from
/// the first record with magnitude below [`TINY`].
pub fn approximate_sbox(sbox: &Sbox) -> (ApproxTable, ApproxTable) {
    let values = sbox.values();
    let mut forward: Vec<Vec<Approx>> = vec![vec![]; values];
    let mut backward: Vec<Vec<Approx>> = vec![vec![]; values];

    for (alpha, row) in sbox.lat().iter().enumerate() {
        for (beta, &hits) in row.iter().enumerate() {
            let corr = 2.0 * (hits as f64) / (values as f64) - 1.0;

            forward[alpha].push(Approx {
                input: alpha as u64,
                output: beta as u64,
                weight: weight(beta as u64),
                corr,
            });

            backward[beta].push(Approx {
                input: beta as u64,
                output: alpha as u64,
                weight: weight(alpha as u64),
                corr,
            });
        }
    }

    for bucket in forward.iter_mut().chain(backward.iter_mut()) {
        sort_and_prune(bucket);
    }

    (
        ApproxTable::new(sbox.size(), forward),
        ApproxTable::new(sbox.size(), backward),
    )
}

fn sort_and_prune(bucket: &mut Vec<Approx>) {
    bucket.sort_by(|a, b| {
        b.corr
            .abs()
            .partial_cmp(&a.corr.abs())
            .unwrap_or(Ordering::Equal)
            .then(a.input.cmp(&b.input))
            .then(a.output.cmp(&b.output))
    });

    if let Some(cut) = bucket.iter().position(|approx| approx.corr.abs() < TINY) {
        bucket.truncate(cut);
    }
}

/// Squares every correlation of the table in place, so that searches
/// accumulate ELP by plain multiplication. Preserves the sort order.
pub fn make_approximations_elp(table: &mut ApproxTable) {
    for bucket in &mut table.entries {
        for approx in bucket.iter_mut() {
            approx.corr *= approx.corr;
        }
    }

    table.squared = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::name_to_cipher;

    #[test]
    fn records_match_bucket() {
        let cipher = name_to_cipher("present").unwrap();
        let (forward, backward) = approximate_sbox(cipher.sbox());

        for alpha in 0..16 {
            let bucket = forward.get(alpha);

            for approx in bucket {
                assert_eq!(approx.input, alpha);
                assert_eq!(approx.weight, approx.output.count_ones() as usize);
            }

            // sorted by magnitude, descending
            for pair in bucket.windows(2) {
                assert!(pair[0].corr.abs() >= pair[1].corr.abs());
            }
        }

        for beta in 0..16 {
            for approx in backward.get(beta) {
                assert_eq!(approx.input, beta);
            }
        }
    }

    #[test]
    fn parseval() {
        // for a permutation S-box the squared correlations of a row sum to one
        let cipher = name_to_cipher("present").unwrap();
        assert!(cipher.sbox().is_permutation());

        let (forward, _) = approximate_sbox(cipher.sbox());

        for alpha in 0..16 {
            let sum: f64 = forward.get(alpha).iter().map(|a| a.corr * a.corr).sum();
            assert!((sum - 1.0).abs() < 1e-12, "alpha = {}: sum = {}", alpha, sum);
        }
    }

    #[test]
    fn trivial_approximations() {
        let cipher = name_to_cipher("gift64").unwrap();
        let (forward, _) = approximate_sbox(cipher.sbox());

        // c(0, 0) = 1 and c(0, beta) = 0 for beta != 0
        let trivial = forward.get(0);
        assert_eq!(trivial.len(), 1);
        assert_eq!(trivial[0].output, 0);
        assert_eq!(trivial[0].corr, 1.0);

        // c(alpha, 0) = 0 for alpha != 0 and a permutation S-box
        for alpha in 1..16 {
            assert!(forward.get(alpha).iter().all(|a| a.output != 0));
        }
    }

    #[test]
    fn elp_transform() {
        let cipher = name_to_cipher("rectangle").unwrap();
        let (mut forward, _) = approximate_sbox(cipher.sbox());

        assert!(!forward.is_elp());
        make_approximations_elp(&mut forward);
        assert!(forward.is_elp());

        for alpha in 0..16 {
            for approx in forward.get(alpha) {
                assert!(approx.corr >= 0.0);
                assert!(approx.corr <= 1.0);
            }
        }
    }
}
