pub mod channel;
pub mod config;
pub mod daemon;
pub mod domain_matcher;
pub mod error;
pub mod ipc;
pub mod messages;
pub mod readiness;
pub mod reminder;
pub mod tabs;
pub mod watch;

pub use channel::{DeliveryResult, ObserverHub, ReminderChannel};
pub use config::{get_data_dir, DaemonConfig};
pub use daemon::{Daemon, DaemonStatus};
pub use domain_matcher::{extract_domain, DomainMatcher};
pub use error::WatchError;
pub use ipc::{IpcClient, IpcRequest, IpcResponse, ObserverConnection};
pub use messages::{ObserverMessage, TabId, WatchEvent};
pub use watch::{DwellWatch, WatchPhase, WatchSnapshot, WatchState};
