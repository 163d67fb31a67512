use std::fmt;

use serde::{Deserialize, Serialize};

// We use `Box<str>` for strings that are never resized after decoding. This
// keeps the per-drone footprint compact since snapshots clone them often.
type BoxStr = Box<str>;

/// Stable identifier of a tracked drone, as assigned by the telemetry source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DroneId(pub BoxStr);

impl DroneId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DroneId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for DroneId {
    fn from(value: String) -> Self {
        Self(value.into_boxed_str())
    }
}

/// Percentage value in the range 0–100 (inclusive).
///
/// Decoding rejects anything outside that range, so a stored drone can never
/// carry an impossible battery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct Percentage(u8);

impl Percentage {
    pub const MAX: u8 = 100;

    /// Clamp `value` into range instead of rejecting it.
    pub fn saturating(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<f64> for Percentage {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !(0.0..=f64::from(Self::MAX)).contains(&value) {
            return Err(format!("percentage out of range: {value}"));
        }
        Ok(Self(value.round() as u8))
    }
}

impl From<Percentage> for u8 {
    fn from(value: Percentage) -> Self {
        value.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Operational status reported by the drone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneStatus {
    Active,
    Inactive,
    Restricted,
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DroneStatus::Active => "active",
            DroneStatus::Inactive => "inactive",
            DroneStatus::Restricted => "restricted",
        };
        f.write_str(s)
    }
}

/// Geodetic position in degrees, altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

/// Latest known snapshot of one drone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drone {
    /// Stable identity of this drone.
    pub id: DroneId,
    /// Human readable name, e.g. `Alpha-1`.
    pub name: BoxStr,
    pub status: DroneStatus,
    /// Battery charge level.
    pub battery: Percentage,
    #[serde(flatten)]
    pub position: Position,
    /// Ground speed in meters per second.
    #[serde(default)]
    pub speed: f64,
    /// Source timestamp of this snapshot. Arrival time if the source omits it.
    #[serde(default = "jiff::Timestamp::now")]
    pub last_update: jiff::Timestamp,
    /// Registration code used for allowed/restricted classification.
    #[serde(default)]
    pub registration: BoxStr,
}

impl Drone {
    /// Whether this snapshot is older than `max_age` at `now`.
    ///
    /// Drones are never removed from the fleet, they just go stale.
    pub fn is_stale(&self, now: jiff::Timestamp, max_age: jiff::SignedDuration) -> bool {
        now.duration_since(self.last_update) > max_age
    }
}

/// Longitude/latitude pair, serialized as a `[lon, lat]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LonLat {
    pub longitude: f64,
    pub latitude: f64,
}

impl From<[f64; 2]> for LonLat {
    fn from([longitude, latitude]: [f64; 2]) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

impl From<LonLat> for [f64; 2] {
    fn from(value: LonLat) -> Self {
        [value.longitude, value.latitude]
    }
}

/// One recorded position on a drone's recent flight path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub coordinates: LonLat,
    #[serde(default = "jiff::Timestamp::now")]
    pub timestamp: jiff::Timestamp,
}

/// A trajectory point addressed to a drone, as carried by a path update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathUpdate {
    pub drone_id: DroneId,
    #[serde(flatten)]
    pub point: TrajectoryPoint,
}
