//! Implementation of RECTANGLE.
//!
//! RECTANGLE stores its 64-bit state as four 16-bit rows and applies the S-box
//! to 4-bit columns. Search masks for this cipher therefore live in a
//! column-sliced coordinate system where nibble i collects the four bits of
//! column i (row 0 as the high bit), so that the S-box layer occupies
//! contiguous 4-bit slots. In those coordinates the ShiftRow layer rotates
//! each of the four bit planes across the sixteen columns.

use crate::cipher::{apply_permutation, invert_permutation, permutation_tables, Cipher};
use crate::sbox::Sbox;

/// A structure representing the RECTANGLE cipher at the parity-mask level.
#[derive(Clone)]
pub struct Rectangle {
    size: usize,
    sbox: Sbox,
    isbox: Sbox,
    permutation: [[u64; 256]; 8],
    ipermutation: [[u64; 256]; 8],
}

impl Rectangle {
    /// Left-rotation amount of each row in the ShiftRow layer.
    const ROTATION: [usize; 4] = [0, 1, 12, 13];

    /// Creates a new instance of the cipher.
    pub fn new() -> Rectangle {
        let table = vec![0x6, 0x5, 0xc, 0xa, 0x1, 0xe, 0x7, 0x9,
                         0xb, 0x0, 0x3, 0xd, 0x8, 0xf, 0x4, 0x2];
        let itable = vec![0x9, 0x4, 0xf, 0xa, 0xe, 0x1, 0x0, 0x6,
                          0xc, 0x7, 0x3, 0x8, 0x2, 0xb, 0x5, 0xd];

        // ShiftRow in column coordinates: bit j of column c belongs to
        // row 3 - j and moves to column (c + rotation) mod 16.
        let mut positions = [0; 64];

        for col in 0..16 {
            for bit in 0..4 {
                let row = 3 - bit;
                let dest = (col + Rectangle::ROTATION[row]) % 16;
                positions[4 * col + bit] = 4 * dest + bit;
            }
        }

        let inverse = invert_permutation(&positions);

        Rectangle {
            size: 64,
            sbox: Sbox::new(4, table),
            isbox: Sbox::new(4, itable),
            permutation: permutation_tables(&positions),
            ipermutation: permutation_tables(&inverse),
        }
    }

    /// Rotates each 16-bit row of the state left by its ShiftRow amount.
    pub fn shift_row(x: u64) -> u64 {
        let b0 = x as u16;
        let b1 = ((x >> 16) as u16).rotate_left(1);
        let b2 = ((x >> 32) as u16).rotate_left(12);
        let b3 = ((x >> 48) as u16).rotate_left(13);

        u64::from(b0) | (u64::from(b1) << 16) | (u64::from(b2) << 32) | (u64::from(b3) << 48)
    }

    /// Rotates each 16-bit row of the state right by its ShiftRow amount.
    pub fn inv_shift_row(x: u64) -> u64 {
        let b0 = x as u16;
        let b1 = ((x >> 16) as u16).rotate_right(1);
        let b2 = ((x >> 32) as u16).rotate_right(12);
        let b3 = ((x >> 48) as u16).rotate_right(13);

        u64::from(b0) | (u64::from(b1) << 16) | (u64::from(b2) << 32) | (u64::from(b3) << 48)
    }

    /// Gathers the four row bits of every column into one nibble, row 0 as the
    /// high bit.
    pub fn state_to_columns(x: u64) -> u64 {
        let mut output = 0;

        for col in 0..16 {
            for row in 0..4 {
                output |= ((x >> (16 * row + col)) & 1) << (4 * col + 3 - row);
            }
        }

        output
    }

    /// Scatters column nibbles back into the four-row state layout.
    pub fn columns_to_state(x: u64) -> u64 {
        let mut output = 0;

        for col in 0..16 {
            for row in 0..4 {
                output |= ((x >> (4 * col + 3 - row)) & 1) << (16 * row + col);
            }
        }

        output
    }

    /// Applies the S-box to every 4-bit column of the state.
    pub fn sub_column(&self, x: u64) -> u64 {
        let mut output = 0;

        for col in 0..16 {
            let mut column = 0;

            for row in 0..4 {
                column |= ((x >> (16 * row + col)) & 1) << (3 - row);
            }

            let value = self.sbox.apply(column);

            for row in 0..4 {
                output |= ((value >> (3 - row)) & 1) << (16 * row + col);
            }
        }

        output
    }

    /// Applies the inverse S-box to every 4-bit column of the state.
    pub fn inv_sub_column(&self, x: u64) -> u64 {
        let mut output = 0;

        for col in 0..16 {
            let mut column = 0;

            for row in 0..4 {
                column |= ((x >> (16 * row + col)) & 1) << (3 - row);
            }

            let value = self.isbox.apply(column);

            for row in 0..4 {
                output |= ((value >> (3 - row)) & 1) << (16 * row + col);
            }
        }

        output
    }
}

impl Cipher for Rectangle {
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
        String::from("RECTANGLE")
    }
}

#[cfg(test)]
mod tests {
    use super::Rectangle;
    use crate::cipher::Cipher;
    use rand::rngs::OsRng;
    use rand::RngCore;

    cipher_test_suite!(Rectangle);

    #[test]
    fn sbox_inverse() {
        let cipher = Rectangle::new();

        for x in 0..16 {
            assert_eq!(cipher.isbox.apply(cipher.sbox.apply(x)), x);
        }
    }

    #[test]
    fn sub_column_round_trip() {
        let cipher = Rectangle::new();

        for _ in 0..200 {
            let x = OsRng.next_u64();
            assert_eq!(cipher.inv_sub_column(cipher.sub_column(x)), x);
        }
    }

    #[test]
    fn shift_row_round_trip() {
        for _ in 0..200 {
            let x = OsRng.next_u64();
            assert_eq!(Rectangle::inv_shift_row(Rectangle::shift_row(x)), x);
        }
    }

    #[test]
    fn bitslice_round_trip() {
        for _ in 0..200 {
            let x = OsRng.next_u64();
            assert_eq!(Rectangle::columns_to_state(Rectangle::state_to_columns(x)), x);
            assert_eq!(Rectangle::state_to_columns(Rectangle::columns_to_state(x)), x);
        }
    }

    #[test]
    fn linear_layer_is_sliced_shift_row() {
        let cipher = Rectangle::new();

        for _ in 0..200 {
            let mask = OsRng.next_u64();
            let expected = Rectangle::state_to_columns(
                Rectangle::shift_row(Rectangle::columns_to_state(mask)),
            );
            assert_eq!(cipher.linear_layer(mask), expected);
        }
    }

    #[test]
    fn sub_column_is_sliced_sbox_layer() {
        let cipher = Rectangle::new();

        for _ in 0..200 {
            let x = OsRng.next_u64();
            let columns = Rectangle::state_to_columns(x);

            let mut substituted = 0;
            for col in 0..16 {
                substituted |= cipher.sbox.apply((columns >> (4 * col)) & 0xf) << (4 * col);
            }

            assert_eq!(Rectangle::state_to_columns(cipher.sub_column(x)), substituted);
        }
    }
}
