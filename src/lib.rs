//! Crop recommendation: a random forest trained on soil and weather
//! measurements, served over a small HTTP API.

pub mod api;
pub mod classifier;
pub mod config;
pub mod crop_data;
pub mod dataset;
pub mod decision_tree;
pub mod features;
pub mod functions;
pub mod node;
pub mod predict;
pub mod random_forest;
pub mod training;

#[cfg(test)]
mod fixtures;
