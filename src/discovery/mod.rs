pub mod driver;
pub mod engine;
pub mod ranking;
pub mod runlog;
pub mod scheduler;
pub mod search;
pub mod worker;

pub use engine::{DiscoveryEngine, DiscoveryOutcome};
