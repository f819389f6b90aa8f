//! Domain layer: the five checkers and their errors.

pub mod basic;
pub mod checker;
pub mod epoch;
pub mod errors;
pub mod gas_power;
pub mod heavy;
pub mod parents;
