pub mod config;
pub mod decode;
pub mod engine;
pub mod projection;
pub mod render;
pub mod selection;
pub mod state;
pub mod store;
pub mod transport;

pub use config::SyncConfig;
pub use engine::{FleetView, SyncEngine};
pub use projection::{
    Classification, Classifier, FilterPredicate, FilterUpdate, FleetStats,
    RegistrationPrefixClassifier,
};
pub use render::{NullRenderer, Renderer};
pub use selection::{SelectionEvent, SelectionSender, SelectionSubscription};
pub use state::MessageCounters;
pub use transport::{
    ConnectionHandle, ConnectionManager, ConnectionState, ConnectionStatus, Connector, Link,
    TransportEvent, TransportSettings,
};
