use serde::Deserialize;
use std::{error::Error, fs};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
    pub database_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackendConfig {
    pub server_address: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub webhook_secret: String,
    #[serde(default = "default_payment_methods")]
    pub payment_methods: Vec<String>,
    #[serde(default = "default_payment_method")]
    pub default_payment_method: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            payment_methods: default_payment_methods(),
            default_payment_method: default_payment_method(),
        }
    }
}

fn default_payment_methods() -> Vec<String> {
    vec![
        "PayPal".to_string(),
        "Stripe".to_string(),
        "CashOnDelivery".to_string(),
    ]
}

fn default_payment_method() -> String {
    "PayPal".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    pub backend: BackendConfig,
    pub payment: PaymentConfig,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let contents = fs::read_to_string(config_path)?;
        let config = serde_yml::from_str(&contents)?;

        Ok(config)
    }
}
