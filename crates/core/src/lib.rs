//! Shared domain types for the texgen platform.
//!
//! Kept free of I/O and async dependencies so every other crate can pull
//! these in without dragging the runtime along.

pub mod error;
pub mod imaging;
pub mod stages;
pub mod types;
