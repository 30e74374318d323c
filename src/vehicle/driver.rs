use crate::world::Neighbour;
use crate::VehicleId;
use std::fmt;

/// Gaps smaller than this trigger a hard stop, in m.
const MIN_COMFORT_GAP: f64 = 8.0; // m

/// The fixed part of the comfortable following distance, in m.
const COMFORT_BASE: f64 = 10.0; // m

/// The speed dependent part of the comfortable following distance, in s.
const TIME_INTERVAL: f64 = 2.0; // s

/// Closing on the vehicle ahead is only acted upon
/// when the time to collision is below this, in s.
const COMFORT_TIME: f64 = 10.0; // s

/// Extra deceleration added whenever the driver chooses to brake, in m/s^2.
const MIN_BRAKE: f64 = 0.2; // m/s^2

/// The control requested in an emergency, in m/s^2.
/// It is far beyond what any vehicle can deliver and gets clamped.
pub const HARD_BRAKE: f64 = -1000.0; // m/s^2

/// The policy which decides how a vehicle accelerates.
#[derive(Clone, Debug)]
pub enum Driver {
    /// Never accelerates or brakes. Used for the fixed boundary obstacle.
    Idle,
    /// Cruises towards a desired speed and keeps a comfortable gap to the vehicle ahead.
    CarFollowing(CarFollowing),
}

/// A driver that follows the nearest vehicle ahead.
#[derive(Clone, Debug)]
pub struct CarFollowing {
    /// The vehicle this driver is bound to.
    vehicle_id: Option<VehicleId>,
    /// The target cruising speed in m/s.
    desired_speed: f64,
    /// The most recent decision, for inspection only.
    decision: Option<Decision>,
}

/// The situation a [CarFollowing] driver identified when it last decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Decision {
    /// Nothing ahead within the horizon.
    NoCar,
    /// Dangerously close to the vehicle ahead.
    Near,
    /// Closer than comfortable, but the vehicle ahead is pulling away.
    Leaving,
    /// Closer than comfortable, braking to restore the gap.
    ToTwoSeconds,
    /// Within the comfortable band, matching the speed of the vehicle ahead.
    Following,
    /// Far behind a vehicle that is not slower.
    Free,
    /// Far behind, but closing quickly enough to brake.
    Collision,
    /// Far behind and closing slowly; no action needed yet.
    Hold,
}

impl Decision {
    /// A short label suitable for display next to the vehicle.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::NoCar => "no-car",
            Decision::Near => "near",
            Decision::Leaving => "leaving",
            Decision::ToTwoSeconds => "to-2s",
            Decision::Following => "following",
            Decision::Free => "free",
            Decision::Collision => "coll",
            Decision::Hold => "0",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Driver {
    /// Creates a car following driver with the given desired speed in m/s.
    pub fn car_following(desired_speed: f64) -> Self {
        Driver::CarFollowing(CarFollowing::new(desired_speed))
    }

    /// Associates the driver with the vehicle it controls.
    pub(crate) fn bind(&mut self, vehicle_id: VehicleId) {
        if let Driver::CarFollowing(driver) = self {
            driver.vehicle_id = Some(vehicle_id);
        }
    }

    /// Computes the control (an acceleration in m/s^2) the driver would like to apply.
    ///
    /// # Parameters
    /// * `pos` - The position of the driver's own vehicle in m.
    /// * `speed` - The speed of the driver's own vehicle in m/s.
    /// * `view` - The vehicles near the driver's own vehicle.
    pub fn decide(&mut self, pos: f64, speed: f64, view: &[Neighbour]) -> f64 {
        match self {
            Driver::Idle => 0.0,
            Driver::CarFollowing(driver) => driver.decide(pos, speed, view),
        }
    }

    /// The most recent decision, or `None` for drivers that never decide anything.
    pub fn decision(&self) -> Option<Decision> {
        match self {
            Driver::Idle => None,
            Driver::CarFollowing(driver) => driver.decision,
        }
    }

    /// The desired cruising speed, if the driver has one.
    pub fn desired_speed(&self) -> Option<f64> {
        match self {
            Driver::Idle => None,
            Driver::CarFollowing(driver) => Some(driver.desired_speed),
        }
    }
}

impl CarFollowing {
    /// Creates a new car following driver.
    pub fn new(desired_speed: f64) -> Self {
        Self {
            vehicle_id: None,
            desired_speed,
            decision: None,
        }
    }

    /// The ID of the vehicle this driver controls, once bound.
    pub fn vehicle_id(&self) -> Option<VehicleId> {
        self.vehicle_id
    }

    /// The target cruising speed in m/s.
    pub fn desired_speed(&self) -> f64 {
        self.desired_speed
    }

    /// The most recent decision.
    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Decides on a control and records the decision.
    pub fn decide(&mut self, pos: f64, speed: f64, view: &[Neighbour]) -> f64 {
        let ahead = nearest_ahead(pos, view);
        let (control, decision) = self.control(pos, speed, ahead);
        log::trace!(
            "driver of {:?} at {:.1} chose {:.2} ({})",
            self.vehicle_id,
            pos,
            control,
            decision
        );
        self.decision = Some(decision);
        control
    }

    /// Computes the control for the given situation.
    /// Depends only on its arguments and the desired speed.
    pub fn control(&self, pos: f64, speed: f64, ahead: Option<&Neighbour>) -> (f64, Decision) {
        let Some(ahead) = ahead else {
            return (self.desired_speed - speed, Decision::NoCar);
        };

        let dx = ahead.pos - pos;
        let d_speed = ahead.speed - speed;

        if dx < MIN_COMFORT_GAP {
            return (HARD_BRAKE, Decision::Near);
        }

        let comfort_low = speed * TIME_INTERVAL + COMFORT_BASE;
        let comfort_high = 2.0 * speed * TIME_INTERVAL + COMFORT_BASE;

        if dx < comfort_low {
            let target_ds = (comfort_low - dx) / 3.0;
            let target_speed = ahead.speed - target_ds;
            if target_speed > speed {
                return (0.0, Decision::Leaving);
            }
            return (target_speed - speed - MIN_BRAKE, Decision::ToTwoSeconds);
        }

        if dx < comfort_high {
            return (d_speed, Decision::Following);
        }

        if d_speed >= 0.0 {
            return (0.5 * (self.desired_speed - speed), Decision::Free);
        }

        // `d_speed` is negative, so this is positive
        let collision_time = -dx / d_speed;
        if collision_time < COMFORT_TIME {
            (d_speed / (0.3 * collision_time) - MIN_BRAKE, Decision::Collision)
        } else {
            (0.0, Decision::Hold)
        }
    }
}

/// Finds the closest vehicle strictly ahead of `pos`.
/// Ties are broken by the lowest ID.
pub fn nearest_ahead(pos: f64, view: &[Neighbour]) -> Option<&Neighbour> {
    view.iter()
        .filter(|other| other.pos > pos)
        .min_by(|a, b| a.pos.total_cmp(&b.pos).then(a.id.cmp(&b.id)))
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn neighbour(id: u64, pos: f64, speed: f64) -> Neighbour {
        Neighbour {
            id: VehicleId(id),
            pos,
            speed,
        }
    }

    #[test]
    fn no_car_ahead() {
        let driver = CarFollowing::new(17.0);
        for speed in [0.0, 5.0, 17.0, 34.0] {
            let (ctrl, decision) = driver.control(10.0, speed, None);
            assert_eq!(ctrl, 17.0 - speed);
            assert_eq!(decision, Decision::NoCar);
        }
    }

    #[test]
    fn ignores_vehicles_behind() {
        let mut driver = CarFollowing::new(20.0);
        let view = [neighbour(1, 50.0, 3.0), neighbour(2, 100.0, 12.0)];
        assert_eq!(driver.decide(100.0, 12.0, &view), 8.0);
        assert_eq!(driver.decision(), Some(Decision::NoCar));
    }

    #[test]
    fn picks_nearest_ahead() {
        let view = [
            neighbour(3, 80.0, 0.0),
            neighbour(1, 10.0, 0.0),
            neighbour(4, 40.0, 0.0),
            neighbour(2, 40.0, 0.0),
        ];
        let ahead = nearest_ahead(20.0, &view).unwrap();
        assert_eq!(ahead.id, VehicleId(2));
    }

    #[test]
    fn emergency_brake() {
        let driver = CarFollowing::new(17.0);
        for (speed, their_speed) in [(0.0, 0.0), (17.0, 30.0), (34.0, 0.0)] {
            let ahead = neighbour(1, 7.9, their_speed);
            let (ctrl, decision) = driver.control(0.0, speed, Some(&ahead));
            assert_eq!(ctrl, HARD_BRAKE);
            assert_eq!(decision, Decision::Near);
        }
    }

    #[test]
    fn closer_than_comfortable() {
        let driver = CarFollowing::new(17.0);

        // comfort_low = 10 * 2 + 10 = 30, target_ds = (30 - 24) / 3 = 2
        let ahead = neighbour(1, 24.0, 10.0);
        let (ctrl, decision) = driver.control(0.0, 10.0, Some(&ahead));
        assert_eq!(decision, Decision::ToTwoSeconds);
        assert_approx_eq!(ctrl, 8.0 - 10.0 - 0.2);

        let ahead = neighbour(1, 24.0, 15.0);
        let (ctrl, decision) = driver.control(0.0, 10.0, Some(&ahead));
        assert_eq!(decision, Decision::Leaving);
        assert_eq!(ctrl, 0.0);
    }

    #[test]
    fn following() {
        let driver = CarFollowing::new(17.0);
        // comfort_low = 30, comfort_high = 50
        let ahead = neighbour(1, 40.0, 7.0);
        let (ctrl, decision) = driver.control(0.0, 10.0, Some(&ahead));
        assert_eq!(decision, Decision::Following);
        assert_approx_eq!(ctrl, -3.0);
    }

    #[test]
    fn far_behind() {
        let driver = CarFollowing::new(17.0);

        let ahead = neighbour(1, 60.0, 12.0);
        let (ctrl, decision) = driver.control(0.0, 10.0, Some(&ahead));
        assert_eq!(decision, Decision::Free);
        assert_approx_eq!(ctrl, 3.5);

        // Closing at 2 m/s from 60 m: 30 s to collision
        let ahead = neighbour(1, 60.0, 8.0);
        let (ctrl, decision) = driver.control(0.0, 10.0, Some(&ahead));
        assert_eq!(decision, Decision::Hold);
        assert_eq!(ctrl, 0.0);

        // Closing at 10 m/s from 60 m: 6 s to collision
        let ahead = neighbour(1, 60.0, 0.0);
        let (ctrl, decision) = driver.control(0.0, 10.0, Some(&ahead));
        assert_eq!(decision, Decision::Collision);
        assert_approx_eq!(ctrl, -10.0 / (0.3 * 6.0) - 0.2);
    }

    #[test]
    fn idle_never_accelerates() {
        let mut driver = Driver::Idle;
        driver.bind(VehicleId::BOUNDARY);
        let view = [neighbour(1, 1.0, 30.0)];
        assert_eq!(driver.decide(0.0, 0.0, &view), 0.0);
        assert_eq!(driver.decision(), None);
        assert_eq!(driver.desired_speed(), None);
    }

    #[test]
    fn bind_records_vehicle() {
        let mut driver = Driver::car_following(15.0);
        driver.bind(VehicleId(7));
        match driver {
            Driver::CarFollowing(driver) => assert_eq!(driver.vehicle_id(), Some(VehicleId(7))),
            Driver::Idle => unreachable!(),
        }
    }
}
