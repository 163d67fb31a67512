use flotilla_core::{DroneId, DroneStatus};
use flotilla_sync::{ConnectionState, FilterPredicate, FilterUpdate, MessageCounters};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Envelope for every API response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Status selector of the drone list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    All,
    Active,
    Inactive,
    Restricted,
}

impl From<StatusFilter> for Option<DroneStatus> {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::All => None,
            StatusFilter::Active => Some(DroneStatus::Active),
            StatusFilter::Inactive => Some(DroneStatus::Inactive),
            StatusFilter::Restricted => Some(DroneStatus::Restricted),
        }
    }
}

/// Query parameters of `GET /drones`. Anything left out keeps its default.
#[derive(Debug, Default, Deserialize)]
pub struct DroneQuery {
    pub search: Option<String>,
    pub allowed: Option<bool>,
    pub restricted: Option<bool>,
    pub status: Option<StatusFilter>,
}

impl DroneQuery {
    pub fn predicate(self) -> FilterPredicate {
        let mut predicate = FilterPredicate::default();
        predicate.apply(FilterUpdate {
            search: self.search,
            include_allowed: self.allowed,
            include_restricted: self.restricted,
            status: self.status.map(Option::from),
        });
        predicate
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectionBody {
    pub id: Option<DroneId>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub state: ConnectionState,
    pub since: Timestamp,
    /// Arrival time of the last inbound message, the "last sync".
    pub last_message_at: Option<Timestamp>,
    pub counters: MessageCounters,
}
