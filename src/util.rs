//! Miscellaneous utility structs and functions.

use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An interval on the real number line.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

impl<T> Interval<T> {
    /// Creates a new interval.
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: std::cmp::PartialOrd> Interval<T> {
    /// Returns true if this interval contains the value.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }

    /// Restricts the value to the interval.
    /// The lower bound wins if the interval is empty.
    pub fn clamp(&self, value: T) -> T
    where
        T: Copy,
    {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

impl Interval<f64> {
    /// Creates an interval with the given centre and radius.
    pub fn disc(centre: f64, radius: f64) -> Self {
        Self {
            min: centre - radius,
            max: centre + radius,
        }
    }

    pub fn lerp(&self, t: f64) -> f64 {
        self.min + t * (self.max - self.min)
    }

    pub fn inv_lerp(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }
}

impl<T: Debug> Debug for Interval<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interval({:?}, {:?})", &self.min, &self.max)
    }
}

#[cfg(test)]
mod test {
    use super::Interval;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn clamp_to_bounds() {
        let range = Interval::new(-10.0, 2.0);
        assert_eq!(range.clamp(-1000.0), -10.0);
        assert_eq!(range.clamp(0.5), 0.5);
        assert_eq!(range.clamp(7.0), 2.0);
    }

    #[test]
    fn disc_is_inclusive() {
        let range = Interval::disc(50.0, 100.0);
        assert!(range.contains(150.0));
        assert!(range.contains(-50.0));
        assert!(!range.contains(150.001));
    }

    #[test]
    fn lerp_and_inverse() {
        let range = Interval::new(10.0, 2.0);
        assert_approx_eq!(range.lerp(0.5), 6.0);
        assert_approx_eq!(range.inv_lerp(6.0), 0.5);
    }
}
