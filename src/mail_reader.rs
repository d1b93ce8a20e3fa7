pub mod display;
pub mod imap;
pub mod message;
pub mod search;

pub use message::{ContainerPart, Headers, LeafPart, ParsedMessage, Payload};
pub use search::SearchCriteria;
