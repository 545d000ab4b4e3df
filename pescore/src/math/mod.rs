pub use statrs::function::erf::{erf, erfc};

mod splines;
pub use self::splines::{HermitSplinePoint, HermitCubicSpline};

mod k_vectors;
pub use self::k_vectors::KVector;
pub use self::k_vectors::compute_k_vectors;
