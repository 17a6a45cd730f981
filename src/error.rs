use thiserror::Error;

/// Fatal configuration problems, reported before a run starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing regime table entry for {0}")]
    MissingRegime(String),

    #[error("no expected swing baseline configured for instrument {0}")]
    MissingSwingBaseline(String),

    #[error("{}", describe_invalid(.0))]
    Invalid(Vec<String>),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

fn describe_invalid(errors: &[String]) -> String {
    format!(
        "configuration validation failed ({} error{}):\n  - {}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" },
        errors.join("\n  - ")
    )
}

/// Order submission failures; never fatal to a simulation run
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange API error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("missing exchange credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("order rejected: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Parse an exchange error body of the form `{"code": -1013, "msg": "..."}`
    pub fn from_api_response(status: u16, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiError {
            code: i32,
            msg: String,
        }

        match serde_json::from_str::<ApiError>(body) {
            Ok(err) => GatewayError::Api {
                code: err.code,
                message: err.msg,
            },
            Err(_) => GatewayError::Api {
                code: i32::from(status),
                message: body.to_string(),
            },
        }
    }
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum MidasError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MidasError>;
