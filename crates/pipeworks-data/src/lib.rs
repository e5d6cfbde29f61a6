//! Data-driven configuration for Pipeworks.
//!
//! A data directory holds `fluids` (required), `producers` and `settings`
//! files in RON, TOML or JSON. [`load_fluid_data`] reads them, resolves
//! fluid names and returns the frozen registry, the producer types and the
//! simulation settings.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, FluidData, load_fluid_data};
