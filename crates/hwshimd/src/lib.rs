//! hwshim daemon - activates the virtual identity and holds it until shutdown.

pub mod logging;
pub mod service;

pub use service::Service;
