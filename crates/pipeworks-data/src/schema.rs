//! Serde data file structs for fluid content definitions.
//!
//! These structs define the on-disk format for fluid types, producer types
//! and simulation settings. They are deserialized from RON, JSON, or TOML
//! data files and then resolved into simulation types by the loader.

use pipeworks_core::registry::FluidTemperature;
use pipeworks_fluid::TieBreak;
use serde::Deserialize;

// ===========================================================================
// Fluids
// ===========================================================================

/// A fluid type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct FluidTypeData {
    pub name: String,
    #[serde(default)]
    pub temperature: Option<TemperatureData>,
    #[serde(default)]
    pub gaseous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureData {
    Cold,
    Normal,
    Hot,
}

impl From<TemperatureData> for FluidTemperature {
    fn from(t: TemperatureData) -> Self {
        match t {
            TemperatureData::Cold => FluidTemperature::Cold,
            TemperatureData::Normal => FluidTemperature::Normal,
            TemperatureData::Hot => FluidTemperature::Hot,
        }
    }
}

// ===========================================================================
// Producers
// ===========================================================================

/// A named producer type: one fluid at a constant rate per reference
/// interval.
#[derive(Debug, Clone, Deserialize)]
pub struct ProducerData {
    pub name: String,
    pub fluid: String,
    pub rate: f64,
}

// ===========================================================================
// Settings
// ===========================================================================

/// Simulation settings. Every field is optional and falls back to the
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsData {
    #[serde(default)]
    pub tick_interval: Option<u32>,
    #[serde(default)]
    pub reference_interval: Option<u32>,
    #[serde(default)]
    pub max_edge_rate: Option<f64>,
    #[serde(default)]
    pub max_component_rate: Option<f64>,
    #[serde(default)]
    pub tie_break: Option<TieBreakData>,
    #[serde(default)]
    pub supply_epsilon: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakData {
    AscendingId,
    DescendingId,
    RoundRobin,
    EvenSplit,
}

impl From<TieBreakData> for TieBreak {
    fn from(t: TieBreakData) -> Self {
        match t {
            TieBreakData::AscendingId => TieBreak::AscendingId,
            TieBreakData::DescendingId => TieBreak::DescendingId,
            TieBreakData::RoundRobin => TieBreak::RoundRobin,
            TieBreakData::EvenSplit => TieBreak::EvenSplit,
        }
    }
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

/// Wrapper for a list of fluids in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlFluids {
    pub fluids: Vec<FluidTypeData>,
}

/// Wrapper for a list of producers in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlProducers {
    pub producers: Vec<ProducerData>,
}
