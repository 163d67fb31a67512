use flotilla_core::{Drone, DroneStatus};
use serde::Serialize;

/// Permission category derived from a registration code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Allowed,
    Restricted,
}

/// Deterministic mapping from registration code to [`Classification`].
pub trait Classifier: Send + Sync {
    fn classify(&self, registration: &str) -> Classification;
}

/// Allows registrations that start with one of a list of prefixes,
/// ignoring case. Everything else, including an empty registration, is
/// restricted.
#[derive(Debug, Clone)]
pub struct RegistrationPrefixClassifier {
    prefixes: Vec<String>,
}

impl RegistrationPrefixClassifier {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|p| p.into().to_uppercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }
}

impl Default for RegistrationPrefixClassifier {
    /// The B-series rule.
    fn default() -> Self {
        Self::new(["B"])
    }
}

impl Classifier for RegistrationPrefixClassifier {
    fn classify(&self, registration: &str) -> Classification {
        let registration = registration.trim().to_uppercase();
        if self.prefixes.iter().any(|p| registration.starts_with(p)) {
            Classification::Allowed
        } else {
            Classification::Restricted
        }
    }
}

/// Which drones a consumer wants to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    /// Case-insensitive substring of name or registration. Empty matches all.
    pub search: String,
    pub include_allowed: bool,
    pub include_restricted: bool,
    /// Only drones with this status, if set.
    pub status: Option<DroneStatus>,
}

impl Default for FilterPredicate {
    fn default() -> Self {
        Self {
            search: String::new(),
            include_allowed: true,
            include_restricted: true,
            status: None,
        }
    }
}

impl FilterPredicate {
    pub fn builder() -> FilterPredicateBuilder {
        FilterPredicateBuilder::new()
    }

    /// Merge a partial update coming from a filter control.
    pub fn apply(&mut self, update: FilterUpdate) {
        if let Some(search) = update.search {
            self.search = search;
        }
        if let Some(include) = update.include_allowed {
            self.include_allowed = include;
        }
        if let Some(include) = update.include_restricted {
            self.include_restricted = include;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }

    fn matches(&self, drone: &Drone, needle: &str, classifier: &dyn Classifier) -> bool {
        if !needle.is_empty()
            && !drone.name.to_lowercase().contains(needle)
            && !drone.registration.to_lowercase().contains(needle)
        {
            return false;
        }

        let included = match classifier.classify(&drone.registration) {
            Classification::Allowed => self.include_allowed,
            Classification::Restricted => self.include_restricted,
        };
        if !included {
            return false;
        }

        if let Some(status) = self.status
            && drone.status != status
        {
            return false;
        }

        true
    }
}

/// Partial update of a [`FilterPredicate`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    pub search: Option<String>,
    pub include_allowed: Option<bool>,
    pub include_restricted: Option<bool>,
    /// `Some(None)` clears the status constraint.
    pub status: Option<Option<DroneStatus>>,
}

#[derive(Default)]
pub struct FilterPredicateBuilder {
    predicate: FilterPredicate,
}

impl FilterPredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search<S>(mut self, search: S) -> Self
    where
        S: Into<String>,
    {
        self.predicate.search = search.into();
        self
    }

    pub fn include_allowed(mut self, include: bool) -> Self {
        self.predicate.include_allowed = include;
        self
    }

    pub fn include_restricted(mut self, include: bool) -> Self {
        self.predicate.include_restricted = include;
        self
    }

    pub fn status(mut self, status: DroneStatus) -> Self {
        self.predicate.status = Some(status);
        self
    }

    pub fn build(self) -> FilterPredicate {
        self.predicate
    }
}

/// Filter `drones` by `predicate`, sorted by name then id.
pub fn project(
    drones: &[Drone],
    predicate: &FilterPredicate,
    classifier: &dyn Classifier,
) -> Vec<Drone> {
    let needle = predicate.search.to_lowercase();

    let mut projected: Vec<Drone> = drones
        .iter()
        .filter(|drone| predicate.matches(drone, &needle, classifier))
        .cloned()
        .collect();

    projected.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    projected
}

/// Fleet counters for presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FleetStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    /// Drones reporting the `restricted` status.
    pub restricted_status: usize,
    /// Active drones with an allowed registration.
    pub allowed: usize,
    /// Active drones with a restricted registration.
    pub restricted: usize,
}

/// Compute [`FleetStats`] in a single pass.
///
/// Only active drones are split into allowed and restricted, so
/// `allowed + restricted == active` always holds.
pub fn stats(drones: &[Drone], classifier: &dyn Classifier) -> FleetStats {
    drones.iter().fold(FleetStats::default(), |mut acc, drone| {
        acc.total += 1;
        match drone.status {
            DroneStatus::Active => {
                acc.active += 1;
                match classifier.classify(&drone.registration) {
                    Classification::Allowed => acc.allowed += 1,
                    Classification::Restricted => acc.restricted += 1,
                }
            }
            DroneStatus::Inactive => acc.inactive += 1,
            DroneStatus::Restricted => acc.restricted_status += 1,
        }
        acc
    })
}
