pub mod settings;

pub use settings::{init_app_config, AppConfig, DEFAULT_API_BASE_URL};
