//! The node-local work contract of the distributed mask-set search.
//!
//! A tree of nodes shares each round as follows: the root broadcasts the
//! flattened frontier, every node processes a contiguous slice of it, each
//! child sends its collector upward as a flat array and every parent merges
//! its children's arrays into its own collector. The transport itself lives
//! outside this crate; these are the pure per-node pieces: slicing, the wire
//! codec and the on-disk mask dump.

use std::convert::TryInto;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::search::mask_set::MaskCollector;

/// Returns the `(offset, count)` of the frontier slice owned by `rank` among
/// `nodes` workers. Every rank takes `len / nodes` elements; the last rank
/// also takes the remainder.
pub fn slice_range(len: usize, rank: usize, nodes: usize) -> (usize, usize) {
    assert!(nodes > 0);
    assert!(rank < nodes);

    let share = len / nodes;
    let offset = rank * share;
    let count = if rank == nodes - 1 {
        len - offset
    } else {
        share
    };

    (offset, count)
}

/// Drains a collector into a flat array in heap-extraction order, i.e.
/// ascending ELP.
pub fn flatten(collector: &mut MaskCollector) -> Vec<(u64, f64)> {
    let mut flat = Vec::with_capacity(collector.len());

    while let Some(elem) = collector.pop() {
        flat.push(elem);
    }

    debug_assert!(collector.is_empty());
    flat
}

/// Merges a child's flattened collector into this node's collector.
pub fn merge(collector: &mut MaskCollector, elems: &[(u64, f64)]) {
    for &(mask, elp) in elems {
        collector.add(mask, elp);
    }
}

/// Encodes elements for the wire: `[u64 mask, f64 elp]` pairs in native byte
/// order, 16 bytes per element.
pub fn encode_elems(elems: &[(u64, f64)]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(elems.len() * 16);

    for &(mask, elp) in elems {
        buffer.extend_from_slice(&mask.to_ne_bytes());
        buffer.extend_from_slice(&elp.to_ne_bytes());
    }

    buffer
}

/// Decodes a wire buffer produced by [`encode_elems`]. A buffer that is not
/// a whole number of elements aborts the computation with `InvalidData`.
pub fn decode_elems(buffer: &[u8]) -> io::Result<Vec<(u64, f64)>> {
    if buffer.len() % 16 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "element buffer is not a whole number of (mask, elp) pairs",
        ));
    }

    let mut elems = Vec::with_capacity(buffer.len() / 16);

    for chunk in buffer.chunks_exact(16) {
        let mask = u64::from_ne_bytes(chunk[..8].try_into().expect("chunk is 16 bytes"));
        let elp = f64::from_ne_bytes(chunk[8..].try_into().expect("chunk is 16 bytes"));
        elems.push((mask, elp));
    }

    Ok(elems)
}

/// Dumps the mask values of a round to `<alpha_hex>-r<round>.masks` in `dir`:
/// little-endian 8-byte integers in element order. ELPs are not persisted.
pub fn write_masks(dir: &Path, alpha: u64, round: usize, elems: &[(u64, f64)]) -> io::Result<()> {
    let path = dir.join(format!("{:x}-r{}.masks", alpha, round));
    let mut file = File::create(path)?;

    for &(mask, _) in elems {
        file.write_all(&mask.to_le_bytes())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn slices_cover_frontier() {
        for &(len, nodes) in &[(10, 3), (7, 7), (5, 8), (1 << 12, 5), (0, 4)] {
            let mut covered = 0;

            for rank in 0..nodes {
                let (offset, count) = slice_range(len, rank, nodes);
                assert_eq!(offset, covered);
                covered += count;
            }

            assert_eq!(covered, len);
        }
    }

    #[test]
    fn last_rank_takes_remainder() {
        let (offset, count) = slice_range(10, 2, 3);
        assert_eq!((offset, count), (6, 4));
    }

    #[test]
    fn wire_round_trip() {
        let elems = vec![
            (0x0123_4567_89ab_cdef, 0.5),
            (0xffff_ffff_ffff_ffff, 6e-50),
            (0, 1.0),
        ];

        let buffer = encode_elems(&elems);
        assert_eq!(buffer.len(), elems.len() * 16);
        assert_eq!(decode_elems(&buffer).unwrap(), elems);
    }

    #[test]
    fn ragged_buffer_rejected() {
        let buffer = vec![0u8; 24];
        assert_eq!(
            decode_elems(&buffer).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
    }

    #[test]
    fn merge_respects_limit() {
        let mut parent = MaskCollector::new(2);
        parent.add(1, 0.5);

        merge(&mut parent, &[(2, 0.25), (3, 0.75), (4, 0.125)]);

        let flat = flatten(&mut parent);
        assert_eq!(flat, vec![(1, 0.5), (3, 0.75)]);
    }

    #[test]
    fn flatten_is_worst_first() {
        let mut collector = MaskCollector::new(8);
        collector.add(10, 0.5);
        collector.add(11, 0.125);
        collector.add(12, 0.25);

        let flat = flatten(&mut collector);
        assert_eq!(flat, vec![(11, 0.125), (12, 0.25), (10, 0.5)]);
        assert!(collector.is_empty());
    }

    #[test]
    fn sliced_gather_matches_single_node() {
        use crate::analysis::{approximate_sbox, make_approximations_elp};
        use crate::cipher::name_to_cipher;
        use crate::search::mask_set::{collect_round, MaskPool};
        use std::sync::Mutex;

        let cipher = name_to_cipher("present").unwrap();
        let (mut forward, mut backward) = approximate_sbox(cipher.sbox());
        make_approximations_elp(&mut forward);
        make_approximations_elp(&mut backward);

        // a frontier with a few distinct single-nibble masks
        let mut pool = MaskPool::new();
        let mut frontier = vec![];
        for (n, nibble) in [0x3u64, 0x7, 0xb, 0xd, 0x6].iter().enumerate() {
            let mask = nibble << (4 * n);
            pool.add(mask, 1.0);
            frontier.push((mask, 1.0));
        }

        // reference: the whole frontier on one node
        let reference = Mutex::new(MaskCollector::new(1 << 12));
        collect_round(&pool, &reference, &frontier, &forward, &backward, 2);
        let mut reference = reference.into_inner().unwrap();
        let expected = flatten(&mut reference);

        // three nodes each process their slice, children send flat arrays
        // over the wire and the root merges them into its own collector
        let mut root = MaskCollector::new(1 << 12);

        for rank in 0..3 {
            let (offset, count) = slice_range(frontier.len(), rank, 3);
            let slice = &frontier[offset..offset + count];

            let child = Mutex::new(MaskCollector::new(1 << 12));
            collect_round(&pool, &child, slice, &forward, &backward, 2);
            let mut child = child.into_inner().unwrap();

            let wire = encode_elems(&flatten(&mut child));
            merge(&mut root, &decode_elems(&wire).unwrap());
        }

        let gathered = flatten(&mut root);
        assert_eq!(gathered.len(), expected.len());

        let mut expected = expected;
        let mut gathered = gathered;
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        gathered.sort_by(|a, b| a.0.cmp(&b.0));

        for (a, b) in expected.iter().zip(&gathered) {
            assert_eq!(a.0, b.0);
            assert!((a.1 - b.1).abs() <= 1e-12 * a.1);
        }
    }

    #[test]
    fn mask_file_layout() {
        let dir = std::env::temp_dir();
        let alpha = 0xfeed_beef_0000_0001;
        let elems = vec![(0x1122_3344_5566_7788, 0.5), (0x1, 0.25)];

        write_masks(&dir, alpha, 3, &elems).unwrap();

        let path = dir.join(format!("{:x}-r3.masks", alpha));
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], &0x1122_3344_5566_7788u64.to_le_bytes());
        assert_eq!(&bytes[8..], &0x1u64.to_le_bytes());

        fs::remove_file(path).unwrap();
    }
}
