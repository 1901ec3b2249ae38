//! # FPGA Register Map
//!
//! This small library describes the memory-mapped register layout of the
//! FPGA-controlled laser driver channels (TA, Seed, and the two safety
//! subsystems). Each channel sits behind an I2C multiplexer and exposes a
//! set of named registers with a byte offset, a bit width, an access
//! direction, and (for measurement registers) a linear scale factor to an
//! engineering unit.
//!
//! The table is validated once at load time and is immutable afterwards, so
//! a [`map::RegisterMap`] can be shared by reference across threads without
//! synchronization. Bus access itself lives elsewhere; this crate only
//! answers "where is this register and what does its raw value mean".

#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builtin;
pub mod map;
pub mod model_file;
pub mod schema;

pub use map::RegisterMap;
pub use schema::load;
