#![deny(warnings)]
pub mod belief;
pub mod config;
pub mod error;
pub mod game;
pub mod learning;
pub mod model;
pub mod policy;
pub mod select;
pub mod shared;
pub mod store;

pub use config::EngineConfig;
pub use error::{GameError, StoreError};
pub use game::{Engine, Opening, Session, SessionId, SessionRegistry, SuggestionAck, Turn};

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "guess"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
