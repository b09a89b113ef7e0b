//! The S-box-layer expansion primitive shared by both search engines.

use crate::analysis::ApproxTable;

/// Number of bits in the cipher state covered by the expander.
pub const STATE_SIZE: usize = 64;

/// Callbacks driving one S-box-layer expansion.
///
/// `prune` is consulted once per chosen approximation with the value
/// accumulated so far; returning true discards that choice. `leaf` receives
/// every surviving assignment of the whole layer as an un-permuted output
/// parity together with its accumulated value.
pub trait LayerVisitor {
    fn prune(&mut self, _value: f64) -> bool {
        false
    }

    fn leaf(&mut self, pout: u64, value: f64);
}

/// Visits every way of choosing one approximation per active S-box slot of
/// `pin`.
///
/// Slots are scanned low to high; within a slot, approximations are visited
/// in decreasing order of magnitude, so visitor pruning bites early. A walk
/// that meets an active slot after `max_weight` slots have been assigned is
/// abandoned, since the slot cannot be left uncovered. Approximations with a
/// zero output mask would degenerate the round and are skipped.
pub fn expand_sbox_layer<V: LayerVisitor>(
    table: &ApproxTable,
    visitor: &mut V,
    pin: u64,
    value: f64,
    max_weight: usize,
) {
    walk(table, visitor, pin, 0, value, max_weight, 0, 0)
}

fn walk<V: LayerVisitor>(
    table: &ApproxTable,
    visitor: &mut V,
    pin: u64,
    pout: u64,
    value: f64,
    max_weight: usize,
    weight: usize,
    slot: usize,
) {
    let size = table.size();
    let slots = STATE_SIZE / size;

    for slot in slot..slots {
        let val_in = (pin >> (slot * size)) & table.mask();
        if val_in == 0 {
            continue;
        }
        if weight == max_weight {
            return;
        }

        for approx in table.get(val_in) {
            debug_assert_eq!(approx.input, val_in);

            if approx.output == 0 {
                continue;
            }

            let next = value * approx.corr;
            if visitor.prune(next) {
                continue;
            }

            walk(
                table,
                visitor,
                pin,
                pout | (approx.output << (slot * size)),
                next,
                max_weight,
                weight + 1,
                slot + 1,
            );
        }
        return;
    }

    visitor.leaf(pout, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{approximate_sbox, make_approximations_elp};
    use crate::cipher::name_to_cipher;

    struct Record {
        leaves: Vec<(u64, f64)>,
    }

    impl LayerVisitor for Record {
        fn leaf(&mut self, pout: u64, value: f64) {
            self.leaves.push((pout, value));
        }
    }

    #[test]
    fn single_slot_matches_table() {
        let cipher = name_to_cipher("gift64").unwrap();
        let (mut forward, _) = approximate_sbox(cipher.sbox());
        make_approximations_elp(&mut forward);

        let mut visitor = Record { leaves: vec![] };
        expand_sbox_layer(&forward, &mut visitor, 0x1, 1.0, 1);

        let bucket = forward.get(1);
        assert_eq!(visitor.leaves.len(), bucket.len());

        for (leaf, approx) in visitor.leaves.iter().zip(bucket) {
            assert_eq!(leaf.0, approx.output);
            assert_eq!(leaf.1, approx.corr);
        }
    }

    #[test]
    fn two_slots_multiply() {
        let cipher = name_to_cipher("present").unwrap();
        let (mut forward, _) = approximate_sbox(cipher.sbox());
        make_approximations_elp(&mut forward);

        let mut visitor = Record { leaves: vec![] };
        expand_sbox_layer(&forward, &mut visitor, 0x501, 1.0, 2);

        let low = forward.get(1);
        let high = forward.get(5);
        assert_eq!(visitor.leaves.len(), low.len() * high.len());

        // every leaf splits into one choice per active slot
        for &(pout, value) in &visitor.leaves {
            assert_eq!(pout & !0xf0f, 0);

            let a = low.iter().find(|a| a.output == pout & 0xf).unwrap();
            let b = high.iter().find(|b| b.output == (pout >> 8) & 0xf).unwrap();
            assert!((value - a.corr * b.corr).abs() < 1e-15);
        }
    }

    #[test]
    fn weight_budget_abandons_walk() {
        let cipher = name_to_cipher("present").unwrap();
        let (mut forward, _) = approximate_sbox(cipher.sbox());
        make_approximations_elp(&mut forward);

        // two active slots but budget for one: no assignment covers both
        let mut visitor = Record { leaves: vec![] };
        expand_sbox_layer(&forward, &mut visitor, 0x11, 1.0, 1);
        assert!(visitor.leaves.is_empty());
    }

    #[test]
    fn inactive_input_reaches_leaf_unchanged() {
        let cipher = name_to_cipher("present").unwrap();
        let (mut forward, _) = approximate_sbox(cipher.sbox());
        make_approximations_elp(&mut forward);

        let mut visitor = Record { leaves: vec![] };
        expand_sbox_layer(&forward, &mut visitor, 0, 0.5, 4);
        assert_eq!(visitor.leaves, vec![(0, 0.5)]);
    }
}
