use structopt::StructOpt;

#[derive(Clone, StructOpt)]
#[structopt(
    name = "lintrail",
    about = "Search for high-correlation linear trails in SPN block ciphers."
)]
pub enum LintrailOptions {
    #[structopt(name = "bound")]
    /// Branch-and-bound search for the best R-round trail ELP.
    Bound {
        #[structopt(short = "c", long = "cipher")]
        /// Name of the cipher to analyse. Currently available:
        /// gift64, present, rectangle
        cipher: String,

        #[structopt(short = "r", long = "rounds")]
        /// The number of rounds to analyse.
        rounds: usize,

        #[structopt(short = "w", long = "weight", default_value = "4")]
        /// Maximum number of active S-boxes per round. The reported bound is
        /// only optimal with respect to this cap.
        weight: usize,
    },

    #[structopt(name = "collect")]
    /// Mask-set enumeration from a fixed input parity.
    Collect {
        #[structopt(short = "c", long = "cipher")]
        /// Name of the cipher to analyse. Currently available:
        /// gift64, present, rectangle
        cipher: String,

        #[structopt(short = "a", long = "alpha")]
        /// Input mask / parity (hex).
        alpha: String,

        #[structopt(short = "r", long = "rounds")]
        /// Number of rounds to enumerate.
        rounds: usize,

        #[structopt(short = "w", long = "weight", default_value = "4")]
        /// Maximum number of active S-boxes per round.
        weight: usize,

        #[structopt(short = "k", long = "keep", default_value = "4096")]
        /// Number of masks retained per round in top-K mode.
        keep: usize,

        #[structopt(long = "direct")]
        /// Accumulate ELP directly into an unbounded frontier instead of
        /// collecting the top K masks by back-propagation.
        direct: bool,

        #[structopt(long = "save")]
        /// Dump each round's masks to <alpha>-r<round>.masks in the working
        /// directory.
        save: bool,
    },
}
