use thiserror::Error;

/// Raised when a prompt template cannot be rendered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Prompt template is missing required slot(s): {}", .0.join(", "))]
    MissingSlots(Vec<&'static str>),
}

/// Every failure on the way from a request to raw model text.
///
/// Both the in-process and the remote gateway report through this one type so
/// callers have a single error path for inference.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to inference service: {0}")]
    Request(reqwest::Error),
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response from inference service: {0}")]
    Malformed(String),
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Local inference is not available: {0}")]
    Unavailable(String),
    #[error("Failed to read prompt input '{path}': {source}")]
    PromptInput {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Raised when the generated statement cannot be executed.
#[derive(Error, Debug)]
pub enum QueryExecutionError {
    #[error("Failed to open database '{path}': {message}")]
    Connection { path: String, message: String },
    #[error("Query execution failed: {0}")]
    Statement(String),
}

/// Raised while loading the application configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    General(#[from] config::ConfigError),
    #[error("Configuration file not found at '{0}'")]
    NotFound(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// The error type of one chat interaction.
///
/// Every variant is scoped to a single request; the transcript and the example
/// log remain valid after any of them.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Template(TemplateError),
    #[error(transparent)]
    Gateway(GatewayError),
    #[error(transparent)]
    QueryExecution(#[from] QueryExecutionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TemplateError> for ChatError {
    fn from(err: TemplateError) -> Self {
        ChatError::Template(err)
    }
}

/// Template failures raised inside a local gateway surface as `Template`, not as
/// an inference failure.
impl From<GatewayError> for ChatError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Template(e) => ChatError::Template(e),
            other => ChatError::Gateway(other),
        }
    }
}
