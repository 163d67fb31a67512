use flotilla_core::{Drone, PathUpdate};
use serde::{Deserialize, Serialize};

/// Message kinds understood by the engine, in their JSON wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Full snapshot of one drone.
    #[serde(alias = "entity_update")]
    DroneUpdate { drone: Drone },
    /// One new point on a drone's flight path.
    FlightPathUpdate { path: PathUpdate },
}

impl WireMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::DroneUpdate { .. } => "drone_update",
            WireMessage::FlightPathUpdate { .. } => "flight_path_update",
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A successfully decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Drone(Drone),
    Path(PathUpdate),
    /// Well-formed message of a kind we do not handle.
    Ignored { kind: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload has no string `type` field")]
    MissingType,
}

const KNOWN_KINDS: [&str; 3] = ["drone_update", "entity_update", "flight_path_update"];

/// Decode and classify one raw payload.
///
/// Unknown kinds are not an error: they come back as [`Inbound::Ignored`].
pub fn decode(raw: &str) -> Result<Inbound, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;

    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(DecodeError::MissingType)?;

    if !KNOWN_KINDS.contains(&kind) {
        return Ok(Inbound::Ignored {
            kind: kind.to_owned(),
        });
    }

    let inbound = match serde_json::from_value::<WireMessage>(value)? {
        WireMessage::DroneUpdate { drone } => Inbound::Drone(drone),
        WireMessage::FlightPathUpdate { path } => Inbound::Path(path),
    };
    Ok(inbound)
}
