//! Command line / environment configuration

use clap::builder::BoolishValueParser;
use clap::Parser;

/// Diagnostic HTTP server that answers every request with a JSON description
/// of that request.
#[derive(Parser, Debug, Clone)]
#[command(name = "http-echo", author, version, about, long_about = None)]
pub struct Config {
    /// Host to listen on
    #[arg(long, env = "LISTEN_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port to listen on
    #[arg(long, env = "LISTEN_HTTP", default_value_t = 8080)]
    pub http: u16,

    /// HTTPS port to listen on, 0 turns it off
    #[arg(long, env = "LISTEN_HTTPS", default_value_t = 8443)]
    pub https: u16,

    /// PEM certificate for HTTPS (self-signed when omitted)
    #[arg(long, env = "TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<String>,

    /// PEM private key for HTTPS
    #[arg(long, env = "TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<String>,

    /// Allow CORS from any origin
    #[arg(long, env = "CORS_ENABLED", value_parser = BoolishValueParser::new())]
    pub cors: bool,

    /// Enable decoding of the JWT header
    #[arg(long, env = "JWT_ENABLED", value_parser = BoolishValueParser::new())]
    pub jwt: bool,

    /// JWT header name
    #[arg(long, env = "JWT_HEADER", default_value = "Authorization")]
    pub jwt_header: String,

    /// Log as JSON lines
    #[arg(long, env = "LOG_JSON", value_parser = BoolishValueParser::new())]
    pub log_json: bool,

    /// Log filter (`info`, `debug`, `echo_core=trace`, ...)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Runtime worker threads (defaults to the CPU count)
    #[arg(long, env = "WORKERS")]
    pub workers: Option<usize>,
}

impl Config {
    /// Header the echo handler decodes tokens from; empty when disabled
    pub fn token_header(&self) -> &str {
        if self.jwt {
            &self.jwt_header
        } else {
            ""
        }
    }

    pub fn https_enabled(&self) -> bool {
        self.https > 0
    }

    pub fn worker_threads(&self) -> usize {
        self.workers.filter(|w| *w > 0).unwrap_or_else(num_cpus::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("http-echo").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.http, 8080);
        assert_eq!(config.https, 8443);
        assert!(config.https_enabled());
        assert!(!config.cors);
        assert_eq!(config.token_header(), "");
        assert!(config.worker_threads() > 0);
    }

    #[test]
    fn test_jwt_header() {
        let config = parse(&["--jwt"]);
        assert_eq!(config.token_header(), "Authorization");

        let config = parse(&["--jwt", "--jwt-header", "X-Token"]);
        assert_eq!(config.token_header(), "X-Token");

        let config = parse(&["--jwt-header", "X-Token"]);
        assert_eq!(config.token_header(), "");
    }

    #[test]
    fn test_https_off() {
        let config = parse(&["--https", "0", "--http", "9000"]);
        assert!(!config.https_enabled());
        assert_eq!(config.http, 9000);
    }

    #[test]
    fn test_tls_files_go_together() {
        let result = Config::try_parse_from(["http-echo", "--tls-cert", "cert.pem"]);
        assert!(result.is_err());

        let config = parse(&["--tls-cert", "cert.pem", "--tls-key", "key.pem"]);
        assert_eq!(config.tls_key.as_deref(), Some("key.pem"));
    }

    #[test]
    fn test_workers() {
        assert_eq!(parse(&["--workers", "3"]).worker_threads(), 3);
        assert_eq!(parse(&["--workers", "0"]).worker_threads(), num_cpus::get());
    }
}
