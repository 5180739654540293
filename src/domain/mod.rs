//! Domain layer: entities, value objects and the ports the application
//! layer talks through.

pub mod admin;
pub mod customer;
pub mod ids;
pub mod money;
pub mod order;
pub mod payment;
pub mod ports;
pub mod product;
pub mod support;
