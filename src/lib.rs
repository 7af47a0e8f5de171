pub mod analytics;
pub mod api;
pub mod billing;
pub mod core;
pub mod email;
pub mod interpreter;
pub mod ledger;
pub mod llm;
pub mod products;
pub mod security;
pub mod store;

pub use crate::core::config::AppConfig;
pub use crate::core::shared::state::AppState;
pub use crate::interpreter::{ChatResponse, Command, Interpreter};
