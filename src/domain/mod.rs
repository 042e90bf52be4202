//! Domain types and the ports the application layer talks through.

pub mod events;
pub mod order;
pub mod order_id;
pub mod ports;
pub mod webhook;
