use crate::{AppSettings, RawSettings};
use color_eyre::eyre::Result;
use std::path::Path;

/// Loads settings from `config/settings.yaml`, with `APP__`-prefixed
/// environment variables taking precedence over the file.
pub fn load_app_settings() -> Result<AppSettings> {
    // Need dotenv first so a local .env can overwrite the database url.
    dotenv::from_path(".env").ok();
    let config_path = Path::new("config/settings.yaml").canonicalize()?;

    let builder = config::Config::builder()
        .add_source(config::File::from(config_path))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    let settings: AppSettings = raw_settings.into();

    std::fs::create_dir_all(&settings.storage.blob_folder)?;

    Ok(settings)
}
