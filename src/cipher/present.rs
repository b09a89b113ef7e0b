//! Implementation of PRESENT.

use crate::cipher::{apply_permutation, invert_permutation, permutation_tables, Cipher};
use crate::sbox::Sbox;

/// A structure representing the PRESENT cipher at the parity-mask level.
#[derive(Clone)]
pub struct Present {
    size: usize,
    sbox: Sbox,
    permutation: [[u64; 256]; 8],
    ipermutation: [[u64; 256]; 8],
}

impl Present {
    /// Destination of each state bit under the PRESENT bit permutation,
    /// i.e. bit i moves to position 16·i mod 63, with bit 63 fixed.
    const POSITIONS: [usize; 64] = [
         0, 16, 32, 48,  1, 17, 33, 49,  2, 18, 34, 50,  3, 19, 35, 51,
         4, 20, 36, 52,  5, 21, 37, 53,  6, 22, 38, 54,  7, 23, 39, 55,
         8, 24, 40, 56,  9, 25, 41, 57, 10, 26, 42, 58, 11, 27, 43, 59,
        12, 28, 44, 60, 13, 29, 45, 61, 14, 30, 46, 62, 15, 31, 47, 63,
    ];

    /// Creates a new instance of the cipher.
    pub fn new() -> Present {
        let table = vec![0xc, 0x5, 0x6, 0xb, 0x9, 0x0, 0xa, 0xd,
                         0x3, 0xe, 0xf, 0x8, 0x4, 0x7, 0x1, 0x2];

        let inverse = invert_permutation(&Present::POSITIONS);

        Present {
            size: 64,
            sbox: Sbox::new(4, table),
            permutation: permutation_tables(&Present::POSITIONS),
            ipermutation: permutation_tables(&inverse),
        }
    }
}

impl Cipher for Present {
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
        String::from("PRESENT")
    }
}
