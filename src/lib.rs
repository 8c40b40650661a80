pub mod capacity;
pub mod client;
pub mod config;
pub mod controller;
pub mod crds;
pub mod error;
pub mod reconciler;
pub mod resources;
pub mod telemetry;
pub mod utils;

#[cfg(test)]
mod testing;
