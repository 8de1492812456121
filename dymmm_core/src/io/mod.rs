//! Module for reading and writing reactor setups and trajectories
pub mod json;
