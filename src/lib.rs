//! Decode RuuviTag RAWv2 advertisements, attribute them to configured sensors and
//! forward the readings to a time-series table.

pub mod bluetooth;
pub mod config;
pub mod database;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod ruuvi;
pub mod utils;

pub use models::{HardwareAddress, PhysicalReading, RawReading};
pub use pipeline::{forward, process, Advertisement, Discard, ReadingSink};
pub use registry::{SensorRegistry, SensorRegistryEntry};
