//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional. With none set the server runs in local
//! development mode: mail is logged instead of sent and content comes from
//! the built-in mock dataset.
//!
//! ## Server
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: <http://localhost:3000>)
//!
//! ## Mail
//! - `CONTACT_EMAIL` - Business inbox that receives orders and contact messages
//! - `MAIL_FROM` - Sender mailbox (default: `The Nut Barn <orders@thenutbarn.com>`)
//! - `SMTP_HOST` - SMTP relay hostname. Setting it enables sending and makes
//!   `SMTP_USERNAME` and `SMTP_PASSWORD` required
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password (high entropy)
//!
//! ## Rate limiting
//! - `RATE_LIMIT_MAX_REQUESTS` - Submissions allowed per window per address (default: 3)
//! - `RATE_LIMIT_WINDOW_SECS` - Window length in seconds (default: 60)
//!
//! ## Content
//! - `WORDPRESS_API_URL` - WPGraphQL endpoint for events and posts
//!
//! ## Error tracking
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Environment tag (e.g. production)
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use nut_barn_core::Email;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default sender mailbox.
pub const DEFAULT_MAIL_FROM: &str = "The Nut Barn <orders@thenutbarn.com>";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Mail delivery configuration
    pub mail: MailConfig,
    /// Submission rate limit policy
    pub rate_limit: RateLimitConfig,
    /// WPGraphQL endpoint; `None` serves mock content
    pub wordpress_api_url: Option<Url>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Where mail goes and how it is sent.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Business inbox for order and contact notifications
    pub contact_email: Option<Email>,
    /// Sender mailbox, may include a display name
    pub from: String,
    /// SMTP relay; `None` logs mail instead of sending it
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname
    pub host: String,
    /// SMTP server port
    pub port: u16,
    /// SMTP authentication username
    pub username: String,
    /// SMTP authentication password
    pub password: SecretString,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Fixed-window rate limit policy for the submission endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per window per source address
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: Duration::from_secs(60),
        }
    }
}

impl Default for StorefrontConfig {
    /// Local development settings: loopback, no mail relay, mock content.
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            mail: MailConfig {
                contact_email: None,
                from: DEFAULT_MAIL_FROM.to_string(),
                smtp: None,
            },
            rate_limit: RateLimitConfig::default(),
            wordpress_api_url: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, if the SMTP
    /// group is only partly set, or if the SMTP password fails validation
    /// (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let defaults = Self::default();

        let host = env.parsed("STOREFRONT_HOST", defaults.host)?;
        let port = env.parsed("STOREFRONT_PORT", defaults.port)?;
        let base_url = env.get("STOREFRONT_BASE_URL").unwrap_or(defaults.base_url);

        let mail = MailConfig::from_env(&env)?;
        let rate_limit = RateLimitConfig::from_env(&env)?;

        let wordpress_api_url = env
            .get("WORDPRESS_API_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("WORDPRESS_API_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            host,
            port,
            base_url,
            mail,
            rate_limit,
            wordpress_api_url,
            sentry_dsn: env.get("SENTRY_DSN"),
            sentry_environment: env.get("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parsed("SENTRY_SAMPLE_RATE", defaults.sentry_sample_rate)?,
            sentry_traces_sample_rate: env
                .parsed("SENTRY_TRACES_SAMPLE_RATE", defaults.sentry_traces_sample_rate)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl MailConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        let contact_email = env
            .get("CONTACT_EMAIL")
            .map(|raw| {
                Email::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("CONTACT_EMAIL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let from = env
            .get("MAIL_FROM")
            .unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string());

        let smtp = match env.get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: env.parsed("SMTP_PORT", 587)?,
                username: env.required("SMTP_USERNAME")?,
                password: env.validated_secret("SMTP_PASSWORD")?,
            }),
            None => None,
        };

        Ok(Self {
            contact_email,
            from,
            smtp,
        })
    }
}

impl RateLimitConfig {
    fn from_env<F: Fn(&str) -> Option<String>>(env: &Env<F>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_requests = env.parsed("RATE_LIMIT_MAX_REQUESTS", defaults.max_requests)?;
        let window_secs = env.parsed("RATE_LIMIT_WINDOW_SECS", defaults.window.as_secs())?;

        if max_requests == 0 || window_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                if max_requests == 0 {
                    "RATE_LIMIT_MAX_REQUESTS"
                } else {
                    "RATE_LIMIT_WINDOW_SECS"
                }
                .to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source with the lookup helpers.
struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable. Blank values count as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Load and validate a required secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG_PASSWORD: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_any_variables() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.mail.from, DEFAULT_MAIL_FROM);
        assert!(config.mail.contact_email.is_none());
        assert!(config.mail.smtp.is_none());
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert!(config.wordpress_api_url.is_none());
    }

    #[test]
    fn test_full_mail_configuration() {
        let config = load(&[
            ("CONTACT_EMAIL", "hello@thenutbarn.com"),
            ("SMTP_HOST", "smtp.mailgun.org"),
            ("SMTP_PORT", "2525"),
            ("SMTP_USERNAME", "postmaster@thenutbarn.com"),
            ("SMTP_PASSWORD", STRONG_PASSWORD),
        ])
        .unwrap();

        let smtp = config.mail.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.mailgun.org");
        assert_eq!(smtp.port, 2525);
        assert_eq!(
            config.mail.contact_email.unwrap().as_str(),
            "hello@thenutbarn.com"
        );
    }

    #[test]
    fn test_smtp_host_requires_credentials() {
        let err = load(&[("SMTP_HOST", "smtp.mailgun.org")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "SMTP_USERNAME"));
    }

    #[test]
    fn test_smtp_password_placeholder_rejected() {
        let err = load(&[
            ("SMTP_HOST", "smtp.mailgun.org"),
            ("SMTP_USERNAME", "postmaster"),
            ("SMTP_PASSWORD", "changeme-now-please"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_invalid_contact_email() {
        let err = load(&[("CONTACT_EMAIL", "not-an-email")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "CONTACT_EMAIL"));
    }

    #[test]
    fn test_rate_limit_overrides() {
        let config = load(&[
            ("RATE_LIMIT_MAX_REQUESTS", "10"),
            ("RATE_LIMIT_WINDOW_SECS", "300"),
        ])
        .unwrap();
        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.rate_limit.window, Duration::from_secs(300));
    }

    #[test]
    fn test_rate_limit_zero_rejected() {
        assert!(load(&[("RATE_LIMIT_MAX_REQUESTS", "0")]).is_err());
        assert!(load(&[("RATE_LIMIT_WINDOW_SECS", "abc")]).is_err());
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = load(&[("WORDPRESS_API_URL", "  "), ("SMTP_HOST", "")]).unwrap();
        assert!(config.wordpress_api_url.is_none());
        assert!(config.mail.smtp.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let err = load(&[("STOREFRONT_PORT", "99999")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength(STRONG_PASSWORD, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig::default();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let config = SmtpConfig {
            host: "smtp.mailgun.org".to_string(),
            port: 587,
            username: "postmaster".to_string(),
            password: SecretString::from("super_secret_smtp_password"),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("smtp.mailgun.org"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }
}
