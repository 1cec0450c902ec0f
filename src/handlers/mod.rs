// src/handlers/mod.rs
pub mod calculator;
pub mod error;
pub mod exports;
pub mod health;
pub mod historical;
