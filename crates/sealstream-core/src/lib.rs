pub mod config;
pub mod error;
pub mod keyfile;
pub mod paths;

pub use config::SealConfig;
pub use error::{SealError, SealResult};
pub use keyfile::{load_key, save_key};
pub use paths::OutputPaths;
