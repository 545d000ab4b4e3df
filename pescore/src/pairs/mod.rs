//! Non-bonded pair interactions: analytic and tabulated pair potentials,
//! truncation at the cutoff, and their evaluation over a neighbor list.

mod truncation;
pub use self::truncation::Truncation;

mod potentials;
pub use self::potentials::{PairPotential, TabulatedParameters, TabulatedGrid};

mod part;
pub use self::part::{PairTerm, PairPart};
