pub mod compose;
pub mod smtp;

pub use compose::OutboundMessage;
