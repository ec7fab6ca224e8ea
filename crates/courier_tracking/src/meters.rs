use std::{
    iter::Sum,
    ops::{Add, AddAssign, Div, Sub},
};

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::kmh::Kmh;

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Meters(f64);

impl Meters {
    pub const ZERO: Meters = Meters(0.0);

    pub fn new(value: f64) -> Self {
        Meters(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    /// Negative or NaN distances collapse to zero.
    pub fn non_negative(self) -> Meters {
        if self.0 > 0.0 { self } else { Meters::ZERO }
    }
}

impl Eq for Meters {}

impl PartialOrd for Meters {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Meters {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for Meters {
    fn from(value: f64) -> Self {
        Meters::new(value)
    }
}

impl Add for Meters {
    type Output = Meters;

    fn add(self, other: Meters) -> Meters {
        Meters(self.0 + other.0)
    }
}

impl AddAssign for Meters {
    fn add_assign(&mut self, other: Meters) {
        self.0 += other.0;
    }
}

impl Sub for Meters {
    type Output = Meters;

    fn sub(self, other: Meters) -> Meters {
        Meters(self.0 - other.0)
    }
}

/// Travel time at a constant speed. Fails when the result is not a finite
/// duration, e.g. for a zero speed.
impl Div<Kmh> for Meters {
    type Output = Result<SignedDuration, jiff::Error>;

    fn div(self, speed: Kmh) -> Result<SignedDuration, jiff::Error> {
        let seconds = self.0 * 3.6 / speed.value();
        SignedDuration::try_from_secs_f64(seconds)
    }
}

/// Average speed over an elapsed duration, zero when no time has elapsed.
impl Div<SignedDuration> for Meters {
    type Output = Kmh;

    fn div(self, elapsed: SignedDuration) -> Kmh {
        let seconds = elapsed.as_secs_f64();
        if seconds <= 0.0 {
            return Kmh::ZERO;
        }

        Kmh::from_meters_per_second(self.0 / seconds)
    }
}

impl Div<Meters> for Meters {
    type Output = f64;

    fn div(self, other: Meters) -> f64 {
        self.0 / other.0
    }
}

impl Sum for Meters {
    fn sum<I: Iterator<Item = Meters>>(iter: I) -> Meters {
        iter.fold(Meters::ZERO, |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compute_travel_time() {
        let duration = (Meters::new(1000.0) / Kmh::new(36.0)).unwrap();
        assert_eq!(duration.as_secs(), 100);
    }

    #[test]
    fn should_reject_travel_time_that_is_not_finite() {
        assert!((Meters::new(1000.0) / Kmh::ZERO).is_err());
        assert!((Meters::new(f64::NAN) / Kmh::new(30.0)).is_err());
    }

    #[test]
    fn should_compute_average_speed() {
        let speed = Meters::new(50.0) / SignedDuration::from_secs(10);
        assert!((speed.value() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn should_return_zero_speed_without_elapsed_time() {
        assert_eq!(Meters::new(50.0) / SignedDuration::ZERO, Kmh::ZERO);
    }

    #[test]
    fn should_clamp_negative_distances() {
        assert_eq!(Meters::new(-3.0).non_negative(), Meters::ZERO);
        assert_eq!(Meters::new(f64::NAN).non_negative(), Meters::ZERO);
        assert_eq!(Meters::new(3.0).non_negative(), Meters::new(3.0));
    }
}
