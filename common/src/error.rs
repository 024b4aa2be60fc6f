use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("calibration field `{0}` must be finite")]
    NotFinite(&'static str),
    #[error("humidity factor {0} outside (0, 2]")]
    HumidityFactor(f32),
    #[error("{0} must be positive, got {1}")]
    Voltage(&'static str, f32),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("target store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("target store payload invalid: {0}")]
    Json(#[from] serde_json::Error),
}
