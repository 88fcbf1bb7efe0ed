pub mod config;

pub use config::{load_dotenv, ActionsConfig, Config, RulesConfig, SyncConfig};
