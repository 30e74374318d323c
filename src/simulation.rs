use crate::vehicle::{Decision, Driver, Vehicle, VehicleAttributes};
use crate::{VehicleId, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// The parameters of a simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationParams {
    /// How far drivers can see, ahead and behind, in m.
    pub horizon: f64,
    /// Consecutive vehicles closer than this have collided, in m.
    pub vehicle_length: f64,
    /// Vehicles beyond this position leave the simulation, in m.
    pub far_end: f64,
    /// A vehicle is always spawned once the nearest vehicle is further
    /// than this from the start, in m.
    pub max_spawn_distance: f64,
    /// A vehicle may be spawned once the nearest vehicle is further
    /// than this from the start, in m.
    pub min_spawn_distance: f64,
    /// The chance per tick of spawning between the two spawn distances.
    pub spawn_probability: f64,
    /// The mean desired speed of spawned drivers in m/s.
    pub desired_speed_mean: f64,
    /// The standard deviation of the desired speed of spawned drivers in m/s.
    pub desired_speed_stddev: f64,
    /// Sampled desired speeds below this are raised to it, in m/s.
    pub min_desired_speed: f64,
    /// The absolute lower bound on desired speeds in m/s.
    pub desired_speed_floor: f64,
    /// The speed of spawned vehicles in m/s.
    pub entry_speed: f64,
    /// The speed of the occasional fast spawned vehicle in m/s.
    pub fast_entry_speed: f64,
    /// The chance that a spawned vehicle enters at `fast_entry_speed`.
    pub fast_entry_probability: f64,
    /// The attributes of every spawned vehicle.
    pub vehicle: VehicleAttributes,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            horizon: 100.0,
            vehicle_length: 4.0,
            far_end: 1000.0,
            max_spawn_distance: 50.0,
            min_spawn_distance: 20.0,
            spawn_probability: 0.1,
            desired_speed_mean: 17.0,
            desired_speed_stddev: 3.0,
            min_desired_speed: 10.0,
            desired_speed_floor: 5.0,
            entry_speed: 17.0,
            fast_entry_speed: 34.0,
            fast_entry_probability: 0.05,
            vehicle: VehicleAttributes::default(),
        }
    }
}

/// The publicly visible state of a vehicle, for display.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub pos: f64,
    pub speed: f64,
    /// The control applied during the last tick.
    pub control: f64,
    /// The control the driver asked for during the last tick.
    pub requested_control: f64,
    pub crashed: bool,
    /// The driver's last decision; `None` for idle drivers.
    pub decision: Option<Decision>,
}

impl From<&Vehicle> for VehicleSnapshot {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: vehicle.id(),
            pos: vehicle.pos(),
            speed: vehicle.speed(),
            control: vehicle.control(),
            requested_control: vehicle.requested_control(),
            crashed: vehicle.has_crashed(),
            decision: vehicle.driver().decision(),
        }
    }
}

/// A traffic simulation of a single lane which keeps itself populated.
pub struct Simulation<R = StdRng> {
    /// The parameters.
    params: SimulationParams,
    /// The vehicles being simulated.
    world: World,
    /// The source of randomness for spawning.
    rng: R,
    /// The distribution of desired speeds.
    desired_speed: Normal<f64>,
    /// The ID of the next spawned vehicle.
    next_id: u64,
    /// The number of ticks simulated.
    frame: usize,
    /// The simulated time in s.
    time: f64,
}

impl Simulation<StdRng> {
    /// Creates a new simulation seeded from the operating system.
    pub fn new(params: SimulationParams) -> Self {
        Self::with_rng(params, StdRng::from_entropy())
    }

    /// Creates a new simulation which will always play out the same way.
    pub fn seeded(params: SimulationParams, seed: u64) -> Self {
        Self::with_rng(params, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulation<R> {
    /// Creates a new simulation drawing random numbers from `rng`.
    pub fn with_rng(params: SimulationParams, rng: R) -> Self {
        let desired_speed = Normal::new(params.desired_speed_mean, params.desired_speed_stddev)
            .expect("Invalid desired speed standard deviation");
        Self {
            params,
            world: World::new(params.horizon, params.vehicle_length),
            rng,
            desired_speed,
            next_id: 1,
            frame: 0,
            time: 0.0,
        }
    }

    /// Adds a stationary obstacle at `pos`, replacing any existing one.
    pub fn add_boundary(&mut self, pos: f64) -> VehicleId {
        let id = VehicleId::BOUNDARY;
        let vehicle = Vehicle::new(id, self.params.vehicle, pos, 0.0, Driver::Idle);
        self.world.insert(vehicle);
        log::debug!("Added boundary at {:.1}", pos);
        id
    }

    /// Adds a vehicle to the simulation.
    pub fn add_vehicle(&mut self, pos: f64, speed: f64, driver: Driver) -> VehicleId {
        let id = VehicleId(self.next_id);
        self.next_id += 1;
        self.world
            .insert(Vehicle::new(id, self.params.vehicle, pos, speed, driver));
        id
    }

    /// Removes a vehicle from the simulation, returning it if it existed.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> Option<Vehicle> {
        let vehicle = self.world.remove(id);
        match &vehicle {
            Some(_) => log::debug!("Removed vehicle {}", id),
            None => log::debug!("Cannot remove vehicle {}: not found", id),
        }
        vehicle
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Removes vehicles past the far end, possibly spawns a new vehicle,
    /// moves every vehicle (including any just spawned), then checks for collisions.
    pub fn tick(&mut self, dt: f64) {
        let nearest = self.remove_exited();
        if self.should_spawn(nearest) {
            self.spawn();
        }
        self.world.step(dt);
        self.world.detect_collisions();
        self.frame += 1;
        self.time += dt;
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Gets the total simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Gets the parameters of the simulation.
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Gets the vehicles being simulated.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.world.iter()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.world.get(vehicle_id)
    }

    /// Captures the state of every vehicle, ordered by position and then ID.
    pub fn snapshot(&self) -> Vec<VehicleSnapshot> {
        let mut snapshot = self
            .world
            .iter()
            .map(VehicleSnapshot::from)
            .collect::<Vec<_>>();
        snapshot.sort_by(|a, b| a.pos.total_cmp(&b.pos).then(a.id.cmp(&b.id)));
        snapshot
    }

    /// Removes the vehicles which have passed the far end and
    /// returns the position of the remaining vehicle closest to the start.
    fn remove_exited(&mut self) -> Option<f64> {
        let far_end = self.params.far_end;
        for id in self.world.remove_where(|vehicle| vehicle.pos() > far_end) {
            log::debug!("Vehicle {} left the lane", id);
        }
        self.world
            .iter()
            .map(|vehicle| vehicle.pos())
            .min_by(f64::total_cmp)
    }

    /// Decides whether to spawn a vehicle given the position of the vehicle closest to the start.
    fn should_spawn(&mut self, nearest: Option<f64>) -> bool {
        let Some(nearest) = nearest else {
            return true;
        };
        nearest > self.params.max_spawn_distance
            || (nearest > self.params.min_spawn_distance
                && self.rng.gen::<f64>() < self.params.spawn_probability)
    }

    /// Spawns a car following vehicle at the start of the lane.
    fn spawn(&mut self) -> VehicleId {
        let params = &self.params;
        let sample = self.desired_speed.sample(&mut self.rng);
        let desired_speed =
            f64::max(params.min_desired_speed, sample).max(params.desired_speed_floor);
        let speed = if self.rng.gen::<f64>() < params.fast_entry_probability {
            params.fast_entry_speed
        } else {
            params.entry_speed
        };
        let id = self.add_vehicle(0.0, speed, Driver::car_following(desired_speed));
        log::debug!(
            "Spawned vehicle {} at {:.1} m/s, desired {:.1} m/s",
            id,
            speed,
            desired_speed
        );
        id
    }
}
