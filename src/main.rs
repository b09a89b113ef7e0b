//! lintrail is a tool for finding high-correlation linear trails of SPN block
//! ciphers.

#[macro_use]
extern crate lazy_static;

macro_rules! debug {
    ($($arg:tt)*) => (if cfg!(debug_assertions) { println!($($arg)*) })
}

mod options;
pub mod analysis;
pub mod cipher;
pub mod sbox;
pub mod search;
pub mod utility;

use std::process;
use structopt::StructOpt;

use crate::cipher::name_to_cipher;
use crate::options::LintrailOptions;

fn parse_alpha(alpha: &str) -> Option<u64> {
    let digits = alpha.trim_start_matches("0x");
    u64::from_str_radix(digits, 16).ok().filter(|&a| a != 0)
}

fn main() {
    match LintrailOptions::from_args() {
        LintrailOptions::Bound {
            cipher,
            rounds,
            weight,
        } => {
            let cipher = match name_to_cipher(cipher.as_ref()) {
                Some(c) => c,
                None => {
                    eprintln!("Cipher not supported. Check --help for supported ciphers.");
                    process::exit(1);
                }
            };

            let (bounds, trail) = search::branch_bound::search(cipher.as_ref(), rounds, weight);

            println!("2^{}", bounds[rounds].log2());
            for mask in trail.iter().take(rounds + 1) {
                println!("{:016x}", mask);
            }
        }

        LintrailOptions::Collect {
            cipher,
            alpha,
            rounds,
            weight,
            keep,
            direct,
            save,
        } => {
            let cipher = match name_to_cipher(cipher.as_ref()) {
                Some(c) => c,
                None => {
                    eprintln!("Cipher not supported. Check --help for supported ciphers.");
                    process::exit(1);
                }
            };

            let alpha = match parse_alpha(&alpha) {
                Some(a) => a,
                None => {
                    eprintln!("Alpha must be a non-zero 64-bit hexadecimal mask.");
                    process::exit(1);
                }
            };

            let result = search::mask_set::collect(
                cipher.as_ref(),
                alpha,
                rounds,
                weight,
                keep,
                direct,
                save,
            );

            if let Err(error) = result {
                eprintln!("Mask-set search failed: {}", error);
                process::exit(1);
            }
        }
    }
}
