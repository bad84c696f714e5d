pub mod config;
pub mod model;
pub mod msg;
pub mod store;
pub mod watcher;

pub use config::ControllerConfig;
pub use model::{CommandLogEntry, InitPhase, Loadable, RepoState};
pub use msg::{StoreEvent, Topic};
pub use store::RepoController;
pub use watcher::{RepoWatcher, WatchConfig, WatchSignal, is_relevant_path};
