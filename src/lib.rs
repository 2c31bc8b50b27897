/// Settings loading: defaults, config file, environment, CLI overrides.
pub mod config;
/// Application errors on top of `operator-error`.
pub mod error;
/// Logging setup (filter, console and file sinks).
pub mod logging;
/// HTTP front-end and server bootstrap.
pub mod network;
/// Rendezvous engine: address-keyed handoff from publish to subscribe.
pub mod rendezvous;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::{Settings, SettingsOverrides};
/// Operation errors and result types.
pub use error::{OperatorError, OperatorResult, RequestError};
/// Logging.
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingHandle};
/// Error taxonomy shared with the error crate.
pub use operator_error::{ContextError, ErrorExt, RendezvousError, RendezvousResult, StatusCode};
/// Rendezvous API.
pub use rendezvous::{
    CancelHandle, Context, EngineConfig, PendingCounts, RendezvousEngine, StatsSnapshot,
};
