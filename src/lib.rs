pub use simulation::{Simulation, SimulationParams, VehicleSnapshot};
pub use util::Interval;
pub use vehicle::{CarFollowing, Decision, Driver, Vehicle, VehicleAttributes};
pub use world::{LocalView, Neighbour, World};

mod simulation;
mod util;
mod vehicle;
mod world;

/// Unique ID of a [Vehicle].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleId(pub u64);

impl VehicleId {
    /// The ID reserved for the fixed boundary obstacle.
    pub const BOUNDARY: VehicleId = VehicleId(0);

    /// Whether this is the boundary obstacle's ID.
    pub fn is_boundary(&self) -> bool {
        *self == Self::BOUNDARY
    }
}

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_boundary() {
            f.write_str("boundary")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
