//! Breadth-first mask-set enumeration with a bounded top-K frontier.
//!
//! Two per-round production modes exist. Direct accumulation propagates every
//! frontier entry through the S-box layer and sums ELP contributions into an
//! unbounded next frontier. The top-K mode first produces candidate output
//! masks without their ELP, then scores each unique candidate by expanding
//! backwards into the previous frontier and summing over all back-paths (the
//! low-weight hull contribution), and offers the scored candidate to a
//! bounded collector.

use crossbeam_utils;
use fnv::FnvHashSet;
use indexmap::IndexMap;
use num_cpus;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::cmp::Reverse;
use std::io;
use std::mem;
use std::path::Path;
use std::sync::Mutex;

use crate::analysis::{approximate_sbox, make_approximations_elp, ApproxTable, TINY};
use crate::cipher::Cipher;
use crate::search::distribute::{flatten, write_masks};
use crate::search::expand::{expand_sbox_layer, LayerVisitor, STATE_SIZE};
use crate::utility::ProgressBar;

// The number of threads used for parallel calls is fixed
lazy_static! {
    static ref THREADS: usize = num_cpus::get();
}

/// A frontier of reached masks and their accumulated ELP. Iteration follows
/// insertion order, which keeps slicing and persisted output reproducible.
#[derive(Clone)]
pub struct MaskPool {
    pub masks: IndexMap<u64, f64>,
}

impl MaskPool {
    /// Creates an empty pool.
    pub fn new() -> MaskPool {
        MaskPool {
            masks: IndexMap::new(),
        }
    }

    /// Removes all masks.
    pub fn clear(&mut self) {
        self.masks.clear();
    }

    /// Adds an ELP contribution for a mask.
    pub fn add(&mut self, mask: u64, elp: f64) {
        *self.masks.entry(mask).or_insert(0.0) += elp;
    }

    /// Looks up the ELP of a mask.
    pub fn get(&self, mask: u64) -> Option<f64> {
        self.masks.get(&mask).cloned()
    }

    /// Returns the number of masks in the pool.
    pub fn len(&self) -> usize {
        self.masks.len()
    }
}

/// An entry of the collector heap, ordered by ELP with ties broken on the
/// mask value: of two equal ELPs the numerically smaller mask is the worse
/// entry. This fixes the eviction order under ties.
#[derive(Clone, Copy, Debug)]
struct Entry {
    elp: f64,
    mask: u64,
}

impl Ord for Entry {
    fn cmp(&self, other: &Entry) -> Ordering {
        self.elp
            .total_cmp(&other.elp)
            .then(self.mask.cmp(&other.mask))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Entry) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Entry) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// A bounded "top K by ELP" set of masks: a min-heap for eviction and a
/// membership set for dedup, kept in lockstep.
pub struct MaskCollector {
    limit: usize,
    members: FnvHashSet<u64>,
    fitness: BinaryHeap<Reverse<Entry>>,
}

impl MaskCollector {
    /// Creates a collector retaining at most `limit` masks.
    pub fn new(limit: usize) -> MaskCollector {
        assert!(limit > 0);

        MaskCollector {
            limit,
            members: FnvHashSet::default(),
            fitness: BinaryHeap::new(),
        }
    }

    /// Returns the number of collected masks.
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.fitness.len(), self.members.len());
        debug_assert!(self.fitness.len() <= self.limit);
        self.fitness.len()
    }

    /// True if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.fitness.is_empty()
    }

    /// True if the mask is currently a member.
    pub fn contains(&self, mask: u64) -> bool {
        self.members.contains(&mask)
    }

    /// Offers a mask to the collector. Known masks are ignored; once full,
    /// the candidate must strictly beat the current minimum to evict it.
    pub fn add(&mut self, mask: u64, elp: f64) {
        if self.members.contains(&mask) {
            return;
        }

        if self.fitness.len() >= self.limit {
            let worst = self.fitness.peek().expect("non-empty by limit > 0").0;

            if worst.elp >= elp {
                return;
            }

            self.fitness.pop();
            self.members.remove(&worst.mask);
        }

        self.fitness.push(Reverse(Entry { elp, mask }));
        self.members.insert(mask);
    }

    /// Removes and returns the worst mask.
    pub fn pop(&mut self) -> Option<(u64, f64)> {
        let Reverse(entry) = self.fitness.pop()?;
        self.members.remove(&entry.mask);
        Some((entry.mask, entry.elp))
    }
}

/// Direct-mode sink: every complete layer assignment lands in the next
/// frontier under its permuted output mask.
struct Accumulate<'a> {
    cipher: &'a dyn Cipher,
    pool: &'a mut MaskPool,
}

impl LayerVisitor for Accumulate<'_> {
    fn leaf(&mut self, pout: u64, value: f64) {
        if value < TINY {
            return;
        }

        self.pool.add(self.cipher.linear_layer(pout), value);
    }
}

/// Produces the next frontier from the current one by direct ELP
/// accumulation over the forward table.
pub fn step(
    cipher: &dyn Cipher,
    forward: &ApproxTable,
    pool_old: &MaskPool,
    pool_new: &mut MaskPool,
    max_weight: usize,
) {
    debug_assert!(forward.is_elp());

    pool_new.clear();

    let mut progress = ProgressBar::new(pool_old.len());

    for (&mask, &elp) in &pool_old.masks {
        let mut sink = Accumulate {
            cipher,
            pool: &mut *pool_new,
        };

        expand_sbox_layer(forward, &mut sink, mask, elp, max_weight);

        if cfg!(debug_assertions) {
            progress.increment();
        }
    }
}

/// Accumulates the frontier ELP of a candidate mask across all back-paths.
struct BackPropagate<'a> {
    pool: &'a MaskPool,
    elp: f64,
    reached: bool,
}

impl LayerVisitor for BackPropagate<'_> {
    fn leaf(&mut self, pout: u64, value: f64) {
        if let Some(elp) = self.pool.get(pout) {
            self.elp += elp * value;
            self.reached = true;
        }
    }
}

/// Computes the ELP of a candidate mask `pin` (taken after the S-box layer,
/// before the permutation) by expanding over the backward table into the
/// previous frontier. Also reports whether any back-path reached the
/// frontier at all; a candidate generated forwards always must.
pub fn back_propagate(backward: &ApproxTable, pool: &MaskPool, pin: u64) -> (f64, bool) {
    debug_assert!(backward.is_elp());

    let mut sink = BackPropagate {
        pool,
        elp: 0.0,
        reached: false,
    };

    let slots = STATE_SIZE / backward.size();
    expand_sbox_layer(backward, &mut sink, pin, 1.0, slots);

    (sink.elp, sink.reached)
}

/// Top-K-mode sink: candidate masks are produced without their ELP, scored
/// by back-propagation, and offered to the shared collector.
struct Candidates<'a> {
    pool: &'a MaskPool,
    backward: &'a ApproxTable,
    collector: &'a Mutex<MaskCollector>,
}

impl LayerVisitor for Candidates<'_> {
    fn leaf(&mut self, pout: u64, _value: f64) {
        // skip candidates that were already scored
        {
            let collector = self.collector.lock().expect("collector lock poisoned");
            if collector.contains(pout) {
                return;
            }
        }

        let (elp, reached) = back_propagate(self.backward, self.pool, pout);
        debug_assert!(reached);

        if elp < TINY {
            return;
        }

        let mut collector = self.collector.lock().expect("collector lock poisoned");
        collector.add(pout, elp);
    }
}

/// Processes a slice of the current frontier into the shared collector,
/// fork-join across one worker per logical CPU. Workers take interleaved
/// elements; the collector mutex is the only shared mutable state.
pub fn collect_round(
    pool: &MaskPool,
    collector: &Mutex<MaskCollector>,
    slice: &[(u64, f64)],
    forward: &ApproxTable,
    backward: &ApproxTable,
    max_weight: usize,
) {
    crossbeam_utils::thread::scope(|scope| {
        for t in 0..*THREADS {
            scope.spawn(move |_| {
                for (n, &(mask, _)) in slice.iter().enumerate() {
                    if n % *THREADS != t {
                        continue;
                    }

                    let mut sink = Candidates {
                        pool,
                        backward,
                        collector,
                    };

                    expand_sbox_layer(forward, &mut sink, mask, 1.0, max_weight);
                }
            });
        }
    })
    .expect("worker thread panicked");
}

/// Runs the mask-set enumeration for `rounds` rounds starting from `alpha`,
/// streaming one report line per round. `keep` bounds the frontier in top-K
/// mode; `direct` switches to unbounded direct accumulation; `save` persists
/// each round's masks to the working directory.
pub fn collect(
    cipher: &dyn Cipher,
    alpha: u64,
    rounds: usize,
    max_weight: usize,
    keep: usize,
    direct: bool,
    save: bool,
) -> io::Result<()> {
    assert!(alpha != 0);

    let (mut forward, mut backward) = approximate_sbox(cipher.sbox());
    make_approximations_elp(&mut forward);
    make_approximations_elp(&mut backward);

    if direct {
        collect_direct(cipher, &forward, alpha, rounds, max_weight, save)
    } else {
        collect_top_k(
            cipher, &forward, &backward, alpha, rounds, max_weight, keep, save,
        )
    }
}

fn collect_direct(
    cipher: &dyn Cipher,
    forward: &ApproxTable,
    alpha: u64,
    rounds: usize,
    max_weight: usize,
    save: bool,
) -> io::Result<()> {
    let mut current = MaskPool::new();
    let mut next = MaskPool::new();

    current.add(alpha, 1.0);

    for round in 1..rounds {
        let start = time::precise_time_s();

        step(cipher, forward, &current, &mut next, max_weight);
        mem::swap(&mut current, &mut next);

        report_round(round, current.len(), current.masks.values().sum());
        debug!("round {} finished [{} s]", round, time::precise_time_s() - start);

        if save {
            let flat: Vec<(u64, f64)> = current.masks.iter().map(|(&m, &e)| (m, e)).collect();
            write_masks(Path::new("."), alpha, round, &flat)?;
        }

        if current.len() == 0 {
            break;
        }
    }

    Ok(())
}

fn collect_top_k(
    cipher: &dyn Cipher,
    forward: &ApproxTable,
    backward: &ApproxTable,
    alpha: u64,
    rounds: usize,
    max_weight: usize,
    keep: usize,
    save: bool,
) -> io::Result<()> {
    let mut pool = MaskPool::new();
    let mut flat = vec![(alpha, 1.0)];

    pool.add(alpha, 1.0);

    for round in 1..rounds {
        let start = time::precise_time_s();

        let collector = Mutex::new(MaskCollector::new(keep));
        collect_round(&pool, &collector, &flat, forward, backward, max_weight);

        let mut collector = collector.into_inner().expect("collector lock poisoned");
        flat = flatten(&mut collector);

        // rotate: permute into the next round's input masks
        let mut total = 0.0;
        for elem in flat.iter_mut() {
            elem.0 = cipher.linear_layer(elem.0);
            total += elem.1;
        }

        report_round(round, flat.len(), total);
        debug!("round {} finished [{} s]", round, time::precise_time_s() - start);

        if save {
            write_masks(Path::new("."), alpha, round, &flat)?;
        }

        if flat.is_empty() {
            break;
        }

        pool.clear();
        for &(mask, elp) in &flat {
            pool.add(mask, elp);
        }
    }

    Ok(())
}

fn report_round(round: usize, size: usize, total_elp: f64) {
    println!("{} : {} : {} : 2^{}", round, size, total_elp, total_elp.log2());
}
