//! Domain layer: exchange records, value objects and the ports the rest of
//! the system is written against.

pub mod currency;
pub mod media;
pub mod money;
pub mod order;
pub mod ports;
pub mod user;
