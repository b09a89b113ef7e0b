//! Implementation of GIFT-64.

use crate::cipher::{apply_permutation, invert_permutation, permutation_tables, Cipher};
use crate::sbox::Sbox;

/// A structure representing the GIFT-64 cipher at the parity-mask level.
#[derive(Clone)]
pub struct Gift64 {
    size: usize,
    sbox: Sbox,
    permutation: [[u64; 256]; 8],
    ipermutation: [[u64; 256]; 8],
}

impl Gift64 {
    /// Destination of each state bit under the GIFT-64 bit permutation.
    const POSITIONS: [usize; 64] = [
         0, 17, 34, 51, 48,  1, 18, 35, 32, 49,  2, 19, 16, 33, 50,  3,
         4, 21, 38, 55, 52,  5, 22, 39, 36, 53,  6, 23, 20, 37, 54,  7,
         8, 25, 42, 59, 56,  9, 26, 43, 40, 57, 10, 27, 24, 41, 58, 11,
        12, 29, 46, 63, 60, 13, 30, 47, 44, 61, 14, 31, 28, 45, 62, 15,
    ];

    /// Creates a new instance of the cipher.
    pub fn new() -> Gift64 {
        let table = vec![0x1, 0xa, 0x4, 0xc, 0x6, 0xf, 0x3, 0x9,
                         0x2, 0xd, 0xb, 0x7, 0x5, 0x0, 0x8, 0xe];

        let inverse = invert_permutation(&Gift64::POSITIONS);

        Gift64 {
            size: 64,
            sbox: Sbox::new(4, table),
            permutation: permutation_tables(&Gift64::POSITIONS),
            ipermutation: permutation_tables(&inverse),
        }
    }
}

impl Cipher for Gift64 {
    fn size(&self) -> usize {
        self.size
    }

    fn num_sboxes(&self) -> usize {
        self.size / self.sbox.size()
    }

    fn sbox(&self) -> &Sbox {
        &self.sbox
    }

    fn linear_layer(&self, input: u64) -> u64 {
        apply_permutation(&self.permutation, input)
    }

    fn linear_layer_inv(&self, input: u64) -> u64 {
        apply_permutation(&self.ipermutation, input)
    }

    fn name(&self) -> String {
        String::from("GIFT64")
    }
}
