//! Logic Module - Simulation & Analysis Engines
//!
//! Contains the engines behind the dashboard: Log Store, Progression Engine,
//! AI Bridge and the controller that owns session state.

// Data model
pub mod types;
pub mod accounts;

// Engines
pub mod log_store;
pub mod progression;
pub mod ai_bridge;
pub mod chart;

// Session owner
pub mod controller;
