use bigdecimal::{BigDecimal, RoundingMode, Signed};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "ledgerbot.toml";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub interpreter: InterpreterConfig,
    pub llm: LlmConfig,
    pub collaborators: CollaboratorConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            url: None,
            max_connections: 10,
        }
    }
}

/// Settings injected into the command executor and reporter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Used when neither the command nor the workspace supplies a threshold.
    pub default_reorder_threshold: f64,
    /// ISO currency code used when rendering amounts in replies.
    pub currency: String,
    pub top_products_limit: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            default_reorder_threshold: 5.0,
            currency: "USD".to_string(),
            top_products_limit: 5,
        }
    }
}

impl InterpreterConfig {
    pub fn format_money(&self, amount: &BigDecimal) -> String {
        format_currency(amount, &self.currency)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    pub email_url: Option<String>,
    pub invoice_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            email_url: None,
            invoice_url: None,
            api_key: None,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Defaults, then the TOML file, then `LEDGERBOT_*` variables (`__` separates sections).
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("LEDGERBOT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(Self::figment(path))
    }

    pub fn figment(path: PathBuf) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("LEDGERBOT_").split("__"))
    }

    pub fn load_from(figment: Figment) -> Result<Self, ConfigError> {
        let mut config: AppConfig = figment.extract().map_err(Box::new)?;

        if config.database.url.is_none() {
            config.database.url = std::env::var("DATABASE_URL").ok();
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.interpreter.default_reorder_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "interpreter.default_reorder_threshold must be a non-negative number, got {threshold}"
            )));
        }
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Invalid(
                "database.url (or DATABASE_URL) is required for the postgres backend".to_string(),
            ));
        }
        Ok(())
    }
}

/// Two decimals, rounded half up, with the sign ahead of the symbol (`-$5.00`).
pub fn format_currency(amount: &BigDecimal, currency: &str) -> String {
    let rounded = amount.with_scale_round(2, RoundingMode::HalfUp);
    let sign = if rounded.is_negative() { "-" } else { "" };
    let digits = rounded.abs().to_plain_string();
    match currency.to_uppercase().as_str() {
        "USD" => format!("{sign}${digits}"),
        "EUR" => format!("{sign}€{digits}"),
        "GBP" => format!("{sign}£{digits}"),
        "BRL" => format!("{sign}R${digits}"),
        "NGN" => format!("{sign}₦{digits}"),
        _ => format!("{sign}{digits} {currency}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(&dec("4"), "USD"), "$4.00");
        assert_eq!(format_currency(&dec("12.5"), "eur"), "€12.50");
        assert_eq!(format_currency(&dec("3.333"), "XOF"), "3.33 XOF");
        assert_eq!(format_currency(&dec("2.675"), "USD"), "$2.68");
    }

    #[test]
    fn test_format_currency_puts_sign_before_symbol() {
        assert_eq!(format_currency(&dec("-5"), "USD"), "-$5.00");
        assert_eq!(format_currency(&dec("-1250.5"), "BRL"), "-R$1250.50");
        assert_eq!(format_currency(&dec("-0.3"), "XOF"), "-0.30 XOF");
        assert_eq!(format_currency(&dec("-0.001"), "USD"), "$0.00");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.interpreter.default_reorder_threshold, 5.0);
        assert_eq!(config.interpreter.currency, "USD");
        assert!(!config.llm.is_configured());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
backend = "memory"

[interpreter]
default_reorder_threshold = 12
currency = "GBP"
top_products_limit = 3

[llm]
url = "http://localhost:9999"
"#
        )
        .unwrap();

        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(file.path()));
        let config = AppConfig::load_from(figment).unwrap();

        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.interpreter.default_reorder_threshold, 12.0);
        assert_eq!(config.interpreter.format_money(&dec("2")), "£2.00");
        assert_eq!(config.interpreter.top_products_limit, 3);
        assert!(config.llm.is_configured());
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Serialized::default("database.backend", "memory"))
            .merge(Serialized::default("interpreter.default_reorder_threshold", -1.0));
        assert!(matches!(
            AppConfig::load_from(figment),
            Err(ConfigError::Invalid(_))
        ));
    }
}
