// Pocket Cache Simulator Library

pub mod baselines;
pub mod generator;
pub mod input;
pub mod models;
pub mod runner;
pub mod stats;
