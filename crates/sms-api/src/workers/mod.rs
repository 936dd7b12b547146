//! Background workers: the dispatcher (component G), the status poller
//! (component I), and the stuck-lease reaper (§5). Each runs as its own
//! periodic `tokio::spawn` loop, started from `main`.

pub mod dispatcher;
pub mod poller;
pub mod reaper;

pub use dispatcher::{DispatchTally, Dispatcher};
pub use poller::{PollTally, StatusPoller};
pub use reaper::{ReapTally, StuckLeaseReaper};
