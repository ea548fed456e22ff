use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::de::DeserializeOwned;

/// Environment variable prefix, e.g. `APP_SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "APP";

/// Loads a service configuration from an optional `file_stem` file
/// (`configuration.yaml`, `.toml`, ...) overlaid with `APP_*` variables.
///
/// A `.env` file in the working directory is read first if present.
pub fn load_configuration<T: DeserializeOwned>(file_stem: &str) -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let config = Cfg::builder()
        .add_source(File::with_name(file_stem).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
