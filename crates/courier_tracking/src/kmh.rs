use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Kmh(f64);

impl Kmh {
    pub const ZERO: Kmh = Kmh(0.0);

    pub fn new(value: f64) -> Self {
        Kmh(value)
    }

    pub fn from_meters_per_second(value: f64) -> Self {
        Kmh(value * 3.6)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn meters_per_second(&self) -> f64 {
        self.0 / 3.6
    }
}
