//! Ports layer (Hexagonal Architecture)

mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
