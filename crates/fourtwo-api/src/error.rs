//! API error model
use fourtwo_registry::RegistryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("CONFIG/READ {path}: {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },

    #[error("CONFIG/PARSE: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("REGISTRY/{0}")]
    Registry(#[from] RegistryError),

    #[error("METRICS/{0}")]
    Metrics(#[from] prometheus::Error),

    #[error("SERVE/{0}")]
    Serve(#[from] std::io::Error),
}
