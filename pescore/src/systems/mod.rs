//! Geometry of atomic systems: periodic cells, neighbor lists, displacement
//! vectors between atoms and bonded topology.

mod cell;
pub use self::cell::{UnitCell, CellShift};

mod neighbors;
pub use self::neighbors::{CellList, CellPair};
pub use self::neighbors::{NeighborList, NeighborListState, Pair};

mod deltas;
pub use self::deltas::{Delta, DeltaList};

mod topology;
pub use self::topology::{Topology, Scalings};
