//! Bonded interactions: internal coordinates (bond lengths, angles,
//! dihedrals, ...) computed from atomic positions, and the energy terms acting
//! on them.

mod coordinates;
pub use self::coordinates::{InternalCoordinate, InternalCoordinateList};

mod terms;
pub use self::terms::{ValenceTerm, ValenceList, ValenceParameters};
