pub mod scanner;
pub mod tracker;

pub use scanner::{open_adapter, watch_advertisements};
pub use tracker::AdvertisementTracker;
