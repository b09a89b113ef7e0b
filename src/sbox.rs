//! Type representing an S-box.

use crate::utility::parity_masks;

/// A structure that represents an S-box together with its hit-count LAT.
#[derive(Clone, Debug)]
pub struct Sbox {
    size: usize,
    table: Vec<u8>,
    lat: Vec<Vec<usize>>,
}

impl Sbox {
    /// Creates a new S-box from its table description. `size` is the bit size of
    /// the S-box.
    ///
    /// # Panics
    /// The function panics if the length of `table` is not equal to 2<sup>`size`</sup>.
    pub fn new(size: usize, table: Vec<u8>) -> Sbox {
        assert_eq!(1 << size, table.len());

        let lat = Sbox::generate_lat(&table, size);

        Sbox { size, table, lat }
    }

    /// Generates the LAT associated with the S-box. Entry `lat[alpha][beta]` counts
    /// the inputs for which the parities selected by `alpha` and `beta` agree.
    fn generate_lat(table: &[u8], size: usize) -> Vec<Vec<usize>> {
        let values = 1 << size;
        let mut lat = vec![vec![0; values]; values];

        for (input, &output) in table.iter().enumerate() {
            for alpha in 0..values {
                for beta in 0..values {
                    let parity = parity_masks(
                        input as u64,
                        u64::from(output),
                        alpha as u64,
                        beta as u64,
                    );

                    lat[alpha][beta] += (1 - parity) as usize;
                }
            }
        }

        lat
    }

    /// Applies the S-box to the input.
    pub fn apply(&self, x: u64) -> u64 {
        u64::from(self.table[x as usize])
    }

    /// Returns the size of the S-box in bits.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of values of the S-box, i.e. 2<sup>`size`</sup>.
    pub fn values(&self) -> usize {
        1 << self.size
    }

    /// Returns a bitmask covering one S-box slot.
    pub fn mask(&self) -> u64 {
        (1 << self.size) - 1
    }

    /// Returns a reference to the S-box table.
    pub fn table(&self) -> &[u8] {
        &self.table
    }

    /// Returns a reference to the LAT of the S-box.
    pub fn lat(&self) -> &Vec<Vec<usize>> {
        &self.lat
    }

    /// Checks whether the S-box is a permutation of its domain.
    pub fn is_permutation(&self) -> bool {
        let mut seen = vec![false; self.values()];

        for &y in &self.table {
            let y = y as usize;
            if y >= self.values() || seen[y] {
                return false;
            }
            seen[y] = true;
        }

        true
    }
}
