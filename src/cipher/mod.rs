//! A trait for representing ciphers at the parity-mask level, together with the
//! cipher implementations known to the search engines.

use crate::sbox::Sbox;

/// A cipher as seen by the trail search: an S-box layer of parallel 4-bit
/// S-boxes and a linear layer acting on 64-bit parity masks.
pub trait Cipher: Sync {
    /// Returns the block size of the cipher in bits.
    fn size(&self) -> usize;

    /// Returns the number of S-boxes in the non-linear layer.
    fn num_sboxes(&self) -> usize;

    /// Returns the S-box of the cipher.
    fn sbox(&self) -> &Sbox;

    /// Applies the linear layer of the cipher to a parity mask.
    fn linear_layer(&self, input: u64) -> u64;

    /// Applies the inverse linear layer to a parity mask.
    fn linear_layer_inv(&self, input: u64) -> u64;

    /// Returns the name of the cipher.
    fn name(&self) -> String;
}

/// Expands a 64-entry bit-destination table into eight byte-indexed mask
/// tables, so a permutation applies as eight lookups instead of 64 bit moves.
pub(crate) fn permutation_tables(positions: &[usize; 64]) -> [[u64; 256]; 8] {
    let mut tables = [[0u64; 256]; 8];

    for (chunk, table) in tables.iter_mut().enumerate() {
        for (value, mask) in table.iter_mut().enumerate() {
            for bit in 0..8 {
                if (value >> bit) & 1 == 1 {
                    *mask |= 1 << positions[chunk * 8 + bit];
                }
            }
        }
    }

    tables
}

/// Inverts a 64-entry bit-destination table.
pub(crate) fn invert_permutation(positions: &[usize; 64]) -> [usize; 64] {
    let mut inverse = [0; 64];

    for (source, &dest) in positions.iter().enumerate() {
        inverse[dest] = source;
    }

    inverse
}

/// Applies a permutation given as byte-indexed mask tables.
#[inline(always)]
pub(crate) fn apply_permutation(tables: &[[u64; 256]; 8], input: u64) -> u64 {
    let mut output = 0;

    for (chunk, table) in tables.iter().enumerate() {
        output ^= table[((input >> (chunk * 8)) & 0xff) as usize];
    }

    output
}


pub mod gift64;
pub mod present;
pub mod rectangle;

/// Converts the name of a cipher to an instance of that cipher.
pub fn name_to_cipher(name: &str) -> Option<Box<dyn Cipher>> {
    match name {
        "gift64" | "gift" => Some(Box::new(gift64::Gift64::new())),
        "present" => Some(Box::new(present::Present::new())),
        "rectangle" => Some(Box::new(rectangle::Rectangle::new())),
        _ => None,
    }
}
