use std::time::Duration;

use docx_core::Author;

use crate::cli::Cli;

/// Runtime configuration derived from CLI/env (§6.4). Holds the values every
/// other module needs without passing `Cli` itself around.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub log_level: String,
    pub api_key: String,
    pub max_file_size: u64,
    pub max_document_concurrency: usize,
    pub request_timeout: Duration,
    pub default_author: Author,
}

impl ServiceConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            port: cli.port,
            log_level: cli.log_level.clone(),
            api_key: cli.api_key.clone(),
            max_file_size: cli.max_file_size,
            max_document_concurrency: cli.max_document_concurrency.max(1),
            request_timeout: Duration::from_millis(cli.request_timeout_ms),
            default_author: Author {
                name: cli.default_author_name.clone(),
                email: cli.default_author_email.clone(),
            },
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            port: 3000,
            log_level: "info".to_string(),
            api_key: "test-key".to_string(),
            max_file_size: 52_428_800,
            max_document_concurrency: 0,
            request_timeout_ms: 120_000,
            default_author_name: "Docx Edit Service".to_string(),
            default_author_email: "noreply@example.com".to_string(),
        }
    }

    #[test]
    fn zero_concurrency_is_clamped_to_one() {
        let cfg = ServiceConfig::from_cli(&base_cli());
        assert_eq!(cfg.max_document_concurrency, 1);
    }

    #[test]
    fn listen_addr_binds_all_interfaces_on_configured_port() {
        let mut cli = base_cli();
        cli.port = 4100;
        let cfg = ServiceConfig::from_cli(&cli);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:4100");
    }

    #[test]
    fn request_timeout_converts_millis_to_duration() {
        let cfg = ServiceConfig::from_cli(&base_cli());
        assert_eq!(cfg.request_timeout, Duration::from_secs(120));
    }
}
