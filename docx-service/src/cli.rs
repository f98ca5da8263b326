use clap::Parser;

/// CLI/env surface for the docx edit service (§6.4). Every field is also
/// readable as an environment variable; `API_KEY` has no default so the
/// process refuses to start without one configured.
#[derive(Debug, Clone, Parser)]
#[command(name = "docx-service", about = "HTTP service for reading and editing DOCX documents")]
pub struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Tracing filter directive or bare level (e.g. "info", "debug")
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Shared secret required on every `/v1` request's Authorization header.
    /// No default: the service fails closed rather than run unauthenticated.
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Maximum accepted upload size, in bytes
    #[arg(long, env = "MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: u64,

    /// Maximum number of documents open concurrently (concurrency gate width)
    #[arg(long, env = "MAX_DOCUMENT_CONCURRENCY", default_value = "4")]
    pub max_document_concurrency: usize,

    /// Per-request deadline, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "120000")]
    pub request_timeout_ms: u64,

    /// Author name attributed to edits that don't specify one
    #[arg(long, env = "DEFAULT_AUTHOR_NAME", default_value = "Docx Edit Service")]
    pub default_author_name: String,

    /// Author email attributed to edits that don't specify one
    #[arg(long, env = "DEFAULT_AUTHOR_EMAIL", default_value = "noreply@example.com")]
    pub default_author_email: String,
}
