// crates/server/src/lib.rs
pub mod broadcast;
pub mod error;
pub mod routes;
pub mod watch;

pub use broadcast::{Broadcaster, Subscription};
pub use error::WatchError;
pub use routes::router;
pub use watch::{WatchSession, WatchState, POLL_INTERVAL};
