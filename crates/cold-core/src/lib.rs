//! Shared contracts for the cold cluster console: the snapshot model pushed by
//! the cluster controller, the lifecycle gate over operator commands, derived
//! progress figures, the solver catalog, and the reducer that owns console state.

pub mod console_ipc;
pub mod console_state;
pub mod lifecycle;
pub mod magnitude;
pub mod progress;
pub mod snapshot;
pub mod solver;

pub use console_ipc::{decode_snapshot, ConsoleRequest, ProtocolError, CONSOLE_UPDATE_PATH};
pub use console_state::{reduce, ConsoleEvent, ConsoleState, Exchange, Notice, NoticeLevel};
pub use lifecycle::{
    offered_commands, ClusterStatus, Command, ControlVocabulary, VocabularyPreference,
};
pub use magnitude::{format_magnitude, group_thousands, parse_magnitude};
pub use progress::{aggregate_rate, rate_label, ClusterProgress, RATE_SUFFIX};
pub use snapshot::{ClusterSnapshot, SnapshotError, SolvedUnit, WorkerStatus};
pub use solver::{
    CatalogError, SelectError, SolverCatalog, SolverSelector, SolverSpec, SolverSummary,
};
