//! Headless riftlink client.
//!
//! Wires configuration, logging, and the network layer into a tick loop that
//! dispatches server messages to an in-memory [`world::HeadlessWorld`].

pub mod platform;
pub mod session;
pub mod world;
