pub use self::driver::{CarFollowing, Decision, Driver};
use crate::util::Interval;
use crate::world::Neighbour;
use crate::VehicleId;

pub(crate) mod driver;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// The acceleration limits.
    attributes: VehicleAttributes,
    /// The longitudinal position along the lane, in m.
    pos: f64,
    /// The speed in m/s, never negative.
    speed: f64,
    /// The control most recently applied, after clamping, in m/s^2.
    control: f64,
    /// The control most recently requested by the driver, in m/s^2.
    requested_control: f64,
    /// Whether the vehicle has been involved in a collision.
    crashed: bool,
    /// The policy deciding the vehicle's control.
    driver: Driver,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleAttributes {
    /// The maximum acceleration when stationary, in m/s^2.
    pub max_acc_at_rest: f64,
    /// The maximum acceleration at and above `ref_speed`, in m/s^2.
    pub max_acc_at_ref: f64,
    /// The speed beyond which the maximum acceleration stops decreasing, in m/s.
    pub ref_speed: f64,
    /// The maximum deceleration, a negative number in m/s^2.
    pub max_decel: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            max_acc_at_rest: 10.0,
            max_acc_at_ref: 2.0,
            ref_speed: 17.0,
            max_decel: -10.0,
        }
    }
}

impl VehicleAttributes {
    /// The maximum acceleration at the given speed, in m/s^2.
    ///
    /// Falls linearly from `max_acc_at_rest` at a standstill
    /// to `max_acc_at_ref` at `ref_speed`, and stays there beyond.
    pub fn max_acc(&self, speed: f64) -> f64 {
        if speed < 0.0 {
            return self.max_acc_at_rest;
        }
        if speed < self.ref_speed {
            let t = Interval::new(0.0, self.ref_speed).inv_lerp(speed);
            return Interval::new(self.max_acc_at_rest, self.max_acc_at_ref).lerp(t);
        }
        self.max_acc_at_ref
    }

    /// The range of controls a vehicle can apply at the given speed.
    pub fn control_range(&self, speed: f64) -> Interval<f64> {
        Interval::new(self.max_decel, self.max_acc(speed))
    }
}

impl Vehicle {
    /// Creates a new vehicle and binds its driver to it.
    pub(crate) fn new(
        id: VehicleId,
        attributes: VehicleAttributes,
        pos: f64,
        speed: f64,
        mut driver: Driver,
    ) -> Self {
        driver.bind(id);
        Self {
            id,
            attributes,
            pos,
            speed: f64::max(speed, 0.0),
            control: 0.0,
            requested_control: 0.0,
            crashed: false,
            driver,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's acceleration limits.
    pub fn attributes(&self) -> &VehicleAttributes {
        &self.attributes
    }

    /// The longitudinal position of the vehicle in m.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The vehicle's speed in m/s.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The control applied during the last step, after clamping.
    pub fn control(&self) -> f64 {
        self.control
    }

    /// The control the driver asked for during the last step, before clamping.
    pub fn requested_control(&self) -> f64 {
        self.requested_control
    }

    /// Whether the driver asked to brake harder than the vehicle can.
    pub fn is_over_braking(&self) -> bool {
        self.requested_control < self.attributes.max_decel
    }

    /// Whether the vehicle has been involved in a collision.
    pub fn has_crashed(&self) -> bool {
        self.crashed
    }

    /// The vehicle's driver.
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Asks the driver for a control given what the vehicle can see.
    pub(crate) fn decide(&mut self, view: &[Neighbour]) -> f64 {
        let control = self.driver.decide(self.pos, self.speed, view);
        self.requested_control = control;
        control
    }

    /// Marks the vehicle as crashed. Returns `true` if it had not crashed before.
    pub(crate) fn crash(&mut self) -> bool {
        !std::mem::replace(&mut self.crashed, true)
    }

    /// Integrates the vehicle's speed and position.
    /// Crashed vehicles keep moving.
    ///
    /// # Parameters
    /// * `dt` - The time step in seconds
    /// * `ext_force` - An acceleration imposed by the environment, in m/s^2
    /// * `control` - The acceleration requested by the driver, in m/s^2
    pub fn step(&mut self, dt: f64, ext_force: f64, control: f64) {
        let control = self.attributes.control_range(self.speed).clamp(control);
        self.control = control;

        let total = ext_force + control;
        self.speed = f64::max(self.speed + total * dt, 0.0);
        self.pos += self.speed * dt;
    }
}
