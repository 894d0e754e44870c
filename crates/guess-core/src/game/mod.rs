pub mod engine;
pub mod registry;
pub mod serialization;
pub mod session;

pub use engine::{Engine, Opening, SuggestionAck, Turn};
pub use registry::SessionRegistry;
pub use session::{Session, SessionId};
