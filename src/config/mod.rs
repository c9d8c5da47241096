// Configuration module
// Public interface for configuration loading

mod backend;
mod loader;
mod settings;

pub use backend::BackendDevice;
pub use loader::{default_config_path, load_config, load_config_from};
pub use settings::{ZooConfig, ROOT_S3_BUCKET};
