//! Subscriber coordinators.
//!
//! Each coordinator owns one category of side effect and knows nothing about
//! the others. They only see [`TimerEvent`](crate::events::TimerEvent)s,
//! read configuration live through a [`ConfigHandle`](crate::storage::ConfigHandle),
//! and log-and-swallow every sink failure so the timer keeps running.
//!
//! ```ignore
//! let bell = Arc::new(BellCoordinator::new(notifier, config.clone()));
//! let _sub = bell.attach(&machine);
//! ```

mod bell;
mod persistence;
mod status;
mod window;

pub use bell::{overtime_message, BellCoordinator, OVERTIME_TITLE};
pub use persistence::PersistenceCoordinator;
pub use status::StatusPublisher;
pub use window::{ModeListener, WindowCoordinator};
