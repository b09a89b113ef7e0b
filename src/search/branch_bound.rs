//! Iterative-deepening branch-and-bound search for the best R-round trail.
//!
//! `bounds[r]` holds the best r-round ELP discovered so far. For depths not
//! yet searched it carries the seeded value, which the bound predicate uses
//! multiplicatively: a partial trail with `r + 1` rounds filled is discarded
//! when `elp * bounds[rounds - (r + 1)] <= bounds[rounds]`, since even the
//! most optimistic completion cannot beat the incumbent. Both uses are sound
//! because `bounds` is non-increasing in the round count and ELP composes
//! multiplicatively.

use crate::analysis::{approximate_sbox, make_approximations_elp, ApproxTable};
use crate::cipher::Cipher;
use crate::search::expand::{expand_sbox_layer, LayerVisitor, STATE_SIZE};

/// The branch-and-bound engine. Owns the bounds array and the witness trail;
/// both are mutated in place along the DFS.
pub struct BranchBound<'a> {
    cipher: &'a dyn Cipher,
    table: &'a ApproxTable,
    /// Best r-round ELP per round count; `bounds[0] = 1`.
    pub bounds: Vec<f64>,
    /// Witness trail for the deepest completed search, one mask per round
    /// boundary.
    pub trail: Vec<u64>,
    trace: Vec<u64>,
    weight: usize,
    rounds: usize,
    round: usize,
}

impl<'a> BranchBound<'a> {
    /// Creates an engine searching up to `rounds` rounds with at most
    /// `weight` active S-boxes per round.
    pub fn new(
        cipher: &'a dyn Cipher,
        table: &'a ApproxTable,
        rounds: usize,
        weight: usize,
    ) -> BranchBound<'a> {
        assert!(rounds >= 1);
        assert!(table.is_elp());

        let mut bounds = vec![0.0; rounds + 1];
        bounds[0] = 1.0;

        BranchBound {
            cipher,
            table,
            bounds,
            trail: vec![0; rounds + 1],
            trace: vec![0; rounds + 1],
            weight,
            rounds: 0,
            round: 0,
        }
    }

    /// Runs the full iterative-deepening search and returns the best ELP at
    /// the final depth. Prints one `round: <r>` line per depth searched.
    pub fn search(&mut self) -> f64 {
        let total = self.bounds.len() - 1;
        let seed = (2.0_f64).powi(-2 * self.table.size() as i32);

        for rounds in 1..=total {
            println!("round: {}", rounds);

            self.rounds = rounds;
            self.bounds[rounds] = self.bounds[rounds - 1] * seed;
            self.start(0, 0, self.weight);
        }

        self.bounds[total]
    }

    /// Enumerates starting masks with at most `remain` non-zero nibbles and
    /// descends into the round DFS for each.
    fn start(&mut self, pin: u64, index: usize, remain: usize) {
        let size = self.table.size();
        let slots = STATE_SIZE / size;

        if remain > 0 && index < slots {
            for value in 0..(1 << size) as u64 {
                let remain = if value == 0 { remain } else { remain - 1 };
                self.start(pin | (value << (index * size)), index + 1, remain);
            }
        } else if pin != 0 {
            self.trace[0] = pin;
            self.round = 0;

            let table = self.table;
            let weight = self.weight;
            expand_sbox_layer(table, self, pin, 1.0, weight);
        }
    }
}

impl LayerVisitor for BranchBound<'_> {
    fn prune(&mut self, value: f64) -> bool {
        value * self.bounds[self.rounds - (self.round + 1)] <= self.bounds[self.rounds]
    }

    fn leaf(&mut self, pout: u64, value: f64) {
        // permute at the round boundary, so trace[r + 1] = P(layer(trace[r]))
        let pin = self.cipher.linear_layer(pout);
        self.trace[self.round + 1] = pin;

        if self.round + 1 == self.rounds {
            if value > self.bounds[self.rounds] {
                self.bounds[self.rounds] = value;
                self.trail[..=self.rounds].copy_from_slice(&self.trace[..=self.rounds]);
            }
            return;
        }

        let table = self.table;
        let weight = self.weight;
        self.round += 1;
        expand_sbox_layer(table, self, pin, value, weight);
        self.round -= 1;
    }
}

/// Builds the ELP table for the cipher and runs the full search. Returns the
/// final bounds array and the witness trail.
pub fn search(cipher: &dyn Cipher, rounds: usize, weight: usize) -> (Vec<f64>, Vec<u64>) {
    let (mut forward, _) = approximate_sbox(cipher.sbox());
    make_approximations_elp(&mut forward);

    let mut engine = BranchBound::new(cipher, &forward, rounds, weight);
    engine.search();

    (engine.bounds, engine.trail)
}

/// Recomputes the ELP of a trail of round-boundary masks by table lookup.
/// The trail is expected in the driver convention, i.e.
/// `trail[r + 1] = P(layer(trail[r]))`.
pub fn trail_elp(cipher: &dyn Cipher, table: &ApproxTable, trail: &[u64]) -> f64 {
    assert!(table.is_elp());

    let size = table.size();
    let slots = STATE_SIZE / size;
    let mut elp = 1.0;

    for window in trail.windows(2) {
        let pin = window[0];
        let pout = cipher.linear_layer_inv(window[1]);

        for slot in 0..slots {
            let val_in = (pin >> (slot * size)) & table.mask();
            let val_out = (pout >> (slot * size)) & table.mask();

            if val_in == 0 && val_out == 0 {
                continue;
            }

            match table.get(val_in).iter().find(|a| a.output == val_out) {
                Some(approx) => elp *= approx.corr,
                None => return 0.0,
            }
        }
    }

    elp
}
