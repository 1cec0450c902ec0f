// src/services/mod.rs
pub mod calculator;
pub mod clock;
pub mod exports;
pub mod formatting;
pub mod series;
