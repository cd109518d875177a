// src/stabilizer.rs

//! # Stabilizer Module
//!
//! The motor mixer / PID bank and the interface it implements.

pub mod flight_stabilizer;
pub mod mixer;

pub use flight_stabilizer::*;
pub use mixer::*;
