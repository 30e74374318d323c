use crate::util::Interval;
use crate::vehicle::Vehicle;
use crate::VehicleId;
use itertools::Itertools;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// What a vehicle knows about another vehicle near it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Neighbour {
    /// The other vehicle's ID.
    pub id: VehicleId,
    /// The other vehicle's position in m.
    pub pos: f64,
    /// The other vehicle's speed in m/s.
    pub speed: f64,
}

/// Everything a driver sees when deciding on a control.
#[derive(Clone, Debug, Default)]
pub struct LocalView {
    /// An acceleration imposed by the environment, e.g. road grade. Currently always zero.
    pub ext_force: f64,
    /// Every vehicle within the horizon, ahead or behind, including the observer.
    pub neighbours: SmallVec<[Neighbour; 8]>,
}

/// The set of vehicles on the lane.
#[derive(Clone, Debug)]
pub struct World {
    /// The vehicles, keyed by ID.
    vehicles: BTreeMap<VehicleId, Vehicle>,
    /// How far a vehicle can see, ahead and behind, in m.
    horizon: f64,
    /// Consecutive vehicles closer than this have collided, in m.
    vehicle_length: f64,
}

impl World {
    /// Creates an empty world.
    pub fn new(horizon: f64, vehicle_length: f64) -> Self {
        Self {
            vehicles: BTreeMap::new(),
            horizon,
            vehicle_length,
        }
    }

    /// Adds a vehicle, returning any vehicle it replaced.
    pub(crate) fn insert(&mut self, vehicle: Vehicle) -> Option<Vehicle> {
        self.vehicles.insert(vehicle.id(), vehicle)
    }

    /// Removes a vehicle, returning it if it was present.
    pub(crate) fn remove(&mut self, id: VehicleId) -> Option<Vehicle> {
        self.vehicles.remove(&id)
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    /// Returns an iterator over all the vehicles, in order of ID.
    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// The number of vehicles.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// Whether there are no vehicles.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Removes every vehicle for which `remove` returns `true`, returning their IDs.
    pub(crate) fn remove_where(
        &mut self,
        mut remove: impl FnMut(&Vehicle) -> bool,
    ) -> Vec<VehicleId> {
        let mut removed = vec![];
        self.vehicles.retain(|id, vehicle| {
            let gone = remove(vehicle);
            if gone {
                removed.push(*id);
            }
            !gone
        });
        removed
    }

    /// Computes what the given vehicle can currently see.
    pub fn local_view(&self, id: VehicleId) -> Option<LocalView> {
        let pos = self.vehicles.get(&id)?.pos();
        let neighbours = self.neighbours();
        Some(self.view_at(pos, &neighbours))
    }

    /// Advances every vehicle by `dt` seconds.
    ///
    /// All views are computed from the positions at the start of the step,
    /// so the outcome does not depend on the order vehicles are visited in.
    pub fn step(&mut self, dt: f64) {
        let neighbours = self.neighbours();
        let horizon = self.horizon;

        let controls = self
            .vehicles
            .values_mut()
            .map(|vehicle| {
                let view = Self::view_from(horizon, vehicle.pos(), &neighbours);
                (view.ext_force, vehicle.decide(&view.neighbours))
            })
            .collect::<Vec<_>>();

        for (vehicle, (ext_force, control)) in self.vehicles.values_mut().zip(controls) {
            vehicle.step(dt, ext_force, control);
        }
    }

    /// Marks vehicles that are closer than one vehicle length to the vehicle
    /// directly ahead or behind them as crashed. Only adjacent pairs are compared,
    /// so a vehicle is never marked because of a vehicle further away.
    ///
    /// Returns the number of vehicles which newly crashed.
    pub fn detect_collisions(&mut self) -> usize {
        let order = self
            .vehicles
            .values()
            .map(|vehicle| (vehicle.pos(), vehicle.id()))
            .sorted_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .collect::<Vec<_>>();

        let mut involved = vec![];
        for ((pos_a, id_a), (pos_b, id_b)) in order.into_iter().tuple_windows() {
            if pos_b - pos_a < self.vehicle_length {
                involved.push(id_a);
                involved.push(id_b);
            }
        }

        let mut crashes = 0;
        for id in involved {
            if let Some(vehicle) = self.vehicles.get_mut(&id) {
                if vehicle.crash() {
                    log::info!("Vehicle {} crashed at {:.1}", id, vehicle.pos());
                    crashes += 1;
                }
            }
        }
        crashes
    }

    /// Takes a snapshot of where every vehicle is.
    fn neighbours(&self) -> Vec<Neighbour> {
        self.vehicles
            .values()
            .map(|vehicle| Neighbour {
                id: vehicle.id(),
                pos: vehicle.pos(),
                speed: vehicle.speed(),
            })
            .collect()
    }

    fn view_at(&self, pos: f64, neighbours: &[Neighbour]) -> LocalView {
        Self::view_from(self.horizon, pos, neighbours)
    }

    /// Selects the vehicles within `horizon` of `pos`.
    fn view_from(horizon: f64, pos: f64, neighbours: &[Neighbour]) -> LocalView {
        let range = Interval::disc(pos, horizon);
        LocalView {
            ext_force: 0.0,
            neighbours: neighbours
                .iter()
                .filter(|other| range.contains(other.pos))
                .copied()
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle::{Driver, VehicleAttributes};

    fn world_with(positions: &[f64]) -> World {
        let mut world = World::new(100.0, 4.0);
        for (i, pos) in positions.iter().enumerate() {
            let id = VehicleId(i as u64 + 1);
            world.insert(Vehicle::new(id, VehicleAttributes::default(), *pos, 0.0, Driver::Idle));
        }
        world
    }

    fn crashed(world: &World) -> Vec<bool> {
        world.iter().map(|v| v.has_crashed()).collect()
    }

    #[test]
    fn view_includes_both_directions() {
        let world = world_with(&[100.0, 0.0, 200.0, 201.0, -1.0]);
        let view = world.local_view(VehicleId(1)).unwrap();
        let ids = view.neighbours.iter().map(|n| n.id.0).sorted().collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(view.ext_force, 0.0);
    }

    #[test]
    fn view_of_unknown_vehicle() {
        let world = world_with(&[0.0]);
        assert!(world.local_view(VehicleId(9)).is_none());
    }

    #[test]
    fn adjacent_pairs_crash() {
        let mut world = world_with(&[0.0, 3.0, 10.0]);
        assert_eq!(world.detect_collisions(), 2);
        assert_eq!(crashed(&world), vec![true, true, false]);
    }

    #[test]
    fn pile_up_through_adjacency() {
        let mut world = world_with(&[6.0, 0.0, 3.0, 20.0]);
        assert_eq!(world.detect_collisions(), 3);
        assert_eq!(crashed(&world), vec![true, true, true, false]);
    }

    #[test]
    fn exact_gap_is_safe() {
        let mut world = world_with(&[0.0, 4.0]);
        assert_eq!(world.detect_collisions(), 0);
        assert_eq!(crashed(&world), vec![false, false]);
    }

    #[test]
    fn collisions_are_idempotent() {
        let mut world = world_with(&[0.0, 3.0, 10.0, 12.0, 50.0]);
        world.detect_collisions();
        let first = crashed(&world);
        assert_eq!(world.detect_collisions(), 0);
        assert_eq!(crashed(&world), first);
    }

    #[test]
    fn empty_world_has_no_collisions() {
        let mut world = World::new(100.0, 4.0);
        assert_eq!(world.detect_collisions(), 0);
    }

    #[test]
    fn step_is_order_independent() {
        // Two vehicles 20 m apart, the rear one with the lower ID
        let mut world = World::new(100.0, 4.0);
        let attribs = VehicleAttributes::default();
        let follower = |id, pos| {
            Vehicle::new(VehicleId(id), attribs, pos, 10.0, Driver::car_following(17.0))
        };
        world.insert(follower(1, 0.0));
        world.insert(follower(2, 20.0));

        let mut swapped = World::new(100.0, 4.0);
        swapped.insert(follower(2, 0.0));
        swapped.insert(follower(1, 20.0));

        world.step(1.0);
        swapped.step(1.0);

        let rear = world.get(VehicleId(1)).unwrap();
        let rear_swapped = swapped.get(VehicleId(2)).unwrap();
        assert_eq!(rear.pos(), rear_swapped.pos());
        assert_eq!(rear.speed(), rear_swapped.speed());
        assert_eq!(rear.driver().decision(), rear_swapped.driver().decision());
    }

    #[test]
    fn remove_where_reports_ids() {
        let mut world = world_with(&[0.0, 1200.0, 500.0, 1001.0]);
        let removed = world.remove_where(|v| v.pos() > 1000.0);
        assert_eq!(removed, vec![VehicleId(2), VehicleId(4)]);
        assert_eq!(world.len(), 2);
    }
}
