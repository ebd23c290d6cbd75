//! Hardware Abstraction Layer
//!
//! Binds the bus models to STM32G474 peripherals through the
//! `embedded-hal` traits.

pub mod bus;
