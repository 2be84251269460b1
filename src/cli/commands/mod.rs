//! CLI command implementations.

mod config;
mod tour;

pub use config::run_config;
pub use tour::{run_tour, TourOptions};
