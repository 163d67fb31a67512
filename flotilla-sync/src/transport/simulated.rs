//! A telemetry source that makes up its own fleet.
//!
//! Used for demos and for running the monitor without a backend. Every tick
//! each drone moves a little and reports a `drone_update` followed by a
//! `flight_path_update`, encoded exactly as a real server would send them.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use flotilla_core::{
    Drone, DroneId, DroneStatus, LonLat, PathUpdate, Percentage, Position, TrajectoryPoint,
};
use rand::Rng;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{Connector, Link};
use crate::decode::WireMessage;

const NAMES: [&str; 8] = [
    "Alpha", "Beta", "Gamma", "Delta", "Echo", "Foxtrot", "Golf", "Hotel",
];

/// Metres per degree of latitude.
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Connector producing a simulated fleet around a center point.
///
/// The fleet lives in the connector, so drones keep their positions across
/// reconnects.
pub struct SimulatedFleet {
    drones: Arc<Mutex<Vec<SimDrone>>>,
    interval: Duration,
    session_length: Option<Duration>,
}

impl SimulatedFleet {
    /// Lower Manhattan.
    pub const DEFAULT_CENTER: (f64, f64) = (40.7128, -74.006);

    /// Shorter intervals are raised to this.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    pub fn new(drone_count: usize, interval: Duration) -> Self {
        let (latitude, longitude) = Self::DEFAULT_CENTER;
        Self::centered_at(drone_count, interval, latitude, longitude)
    }

    pub fn centered_at(drone_count: usize, interval: Duration, latitude: f64, longitude: f64) -> Self {
        let interval = interval.max(Self::MIN_INTERVAL);
        let drones = (0..drone_count)
            .map(|n| SimDrone::spawn(n, latitude, longitude))
            .collect();

        Self {
            drones: Arc::new(Mutex::new(drones)),
            interval,
            session_length: None,
        }
    }

    /// End every session after `length`, forcing the manager to reconnect.
    pub fn with_session_length(mut self, length: Duration) -> Self {
        self.session_length = Some(length);
        self
    }

    pub fn drone_ids(&self) -> Vec<DroneId> {
        lock(&self.drones).iter().map(|d| d.id.clone()).collect()
    }
}

#[async_trait]
impl Connector for SimulatedFleet {
    type Error = Infallible;
    type Link = SimulatedLink;

    async fn connect(&self) -> Result<Self::Link, Self::Error> {
        info!(
            drone_count = lock(&self.drones).len(),
            interval_ms = self.interval.as_millis() as u64,
            "Starting simulated session"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(SimulatedLink {
            drones: Arc::clone(&self.drones),
            ticker,
            step: self.interval,
            pending: VecDeque::new(),
            deadline: self.session_length.map(|length| Instant::now() + length),
            closed: false,
        })
    }

    fn endpoint(&self) -> String {
        "simulated".to_owned()
    }
}

pub struct SimulatedLink {
    drones: Arc<Mutex<Vec<SimDrone>>>,
    ticker: Interval,
    step: Duration,
    pending: VecDeque<String>,
    deadline: Option<Instant>,
    closed: bool,
}

impl SimulatedLink {
    /// Move every drone one step and queue its reports.
    fn advance(&mut self) {
        let now = jiff::Timestamp::now();
        let mut rng = rand::rng();
        let mut drones = lock(&self.drones);

        for drone in drones.iter_mut() {
            drone.step(&mut rng, self.step);

            let messages = [
                WireMessage::DroneUpdate {
                    drone: drone.snapshot(now),
                },
                WireMessage::FlightPathUpdate {
                    path: drone.path_point(now),
                },
            ];
            for message in messages {
                match message.encode() {
                    Ok(encoded) => self.pending.push_back(encoded),
                    Err(e) => warn!(id = %drone.id, error = %e, "Failed to encode simulated update"),
                }
            }
        }
    }
}

#[async_trait]
impl Link for SimulatedLink {
    type Error = Infallible;

    async fn recv(&mut self) -> Option<Result<String, Self::Error>> {
        loop {
            if self.closed {
                return None;
            }
            if let Some(message) = self.pending.pop_front() {
                return Some(Ok(message));
            }

            let expired = match self.deadline {
                Some(deadline) => tokio::select! {
                    _ = self.ticker.tick() => false,
                    _ = tokio::time::sleep_until(deadline) => true,
                },
                None => {
                    self.ticker.tick().await;
                    false
                }
            };

            if expired {
                debug!("Simulated session ended");
                self.closed = true;
            } else {
                self.advance();
            }
        }
    }

    async fn send(&mut self, message: String) -> Result<(), Self::Error> {
        debug!(len = message.len(), "Simulated source ignores outbound message");
        Ok(())
    }

    async fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
    }
}

fn lock(drones: &Mutex<Vec<SimDrone>>) -> std::sync::MutexGuard<'_, Vec<SimDrone>> {
    drones.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A simulated drone with a stable id.
struct SimDrone {
    id: DroneId,
    name: String,
    registration: String,
    status: DroneStatus,
    battery: f64,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    /// Radians, clockwise from north.
    heading: f64,
    /// Metres per second while flying.
    cruise_speed: f64,
}

impl SimDrone {
    fn spawn(n: usize, center_latitude: f64, center_longitude: f64) -> Self {
        let mut rng = rand::rng();

        // mostly B-series, every third one foreign
        let series = if n % 3 == 2 { 'N' } else { 'B' };
        let status = match n % 5 {
            1 => DroneStatus::Inactive,
            2 => DroneStatus::Restricted,
            _ => DroneStatus::Active,
        };

        Self {
            id: DroneId::from(format!("drone-{:03}", n + 1)),
            name: format!("{}-{}", NAMES[n % NAMES.len()], n + 1),
            registration: format!("{series}-{:04}", rng.random_range(1000..10000)),
            status,
            battery: rng.random_range(40.0..100.0),
            latitude: center_latitude + rng.random_range(-0.05..0.05),
            longitude: center_longitude + rng.random_range(-0.05..0.05),
            altitude: rng.random_range(80.0..220.0),
            heading: rng.random_range(0.0..std::f64::consts::TAU),
            cruise_speed: rng.random_range(8.0..20.0),
        }
    }

    fn step(&mut self, rng: &mut impl Rng, elapsed: Duration) {
        match self.status {
            DroneStatus::Active => {
                self.heading = (self.heading + rng.random_range(-0.3_f64..0.3))
                    .rem_euclid(std::f64::consts::TAU);

                let distance = self.cruise_speed * elapsed.as_secs_f64();
                self.latitude += distance * self.heading.cos() / METRES_PER_DEGREE;
                self.longitude += distance * self.heading.sin()
                    / (METRES_PER_DEGREE * self.latitude.to_radians().cos());

                self.battery -= rng.random_range(0.05_f64..0.4);
                if self.battery < 15.0 {
                    // back to the pad
                    self.status = DroneStatus::Inactive;
                }
            }
            DroneStatus::Inactive => {
                self.battery += 1.5;
                if self.battery >= 95.0 {
                    self.status = DroneStatus::Active;
                }
            }
            DroneStatus::Restricted => {
                if rng.random_ratio(1, 50) {
                    self.status = DroneStatus::Active;
                }
            }
        }
        self.battery = self.battery.clamp(0.0, 100.0);
    }

    fn speed(&self) -> f64 {
        if self.status == DroneStatus::Active {
            self.cruise_speed
        } else {
            0.0
        }
    }

    fn snapshot(&self, now: jiff::Timestamp) -> Drone {
        Drone {
            id: self.id.clone(),
            name: self.name.as_str().into(),
            status: self.status,
            battery: Percentage::saturating(self.battery.round() as u8),
            position: Position {
                latitude: self.latitude,
                longitude: self.longitude,
                altitude: if self.status == DroneStatus::Inactive {
                    0.0
                } else {
                    self.altitude
                },
            },
            speed: self.speed(),
            last_update: now,
            registration: self.registration.as_str().into(),
        }
    }

    fn path_point(&self, now: jiff::Timestamp) -> PathUpdate {
        PathUpdate {
            drone_id: self.id.clone(),
            point: TrajectoryPoint {
                coordinates: LonLat {
                    longitude: self.longitude,
                    latitude: self.latitude,
                },
                timestamp: now,
            },
        }
    }
}
