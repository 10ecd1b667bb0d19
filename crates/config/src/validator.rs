use crate::*;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Exchange name is required")]
    MissingExchangeName,

    #[error("Exchange description is required")]
    MissingExchangeDescription,

    #[error("Invalid version format: {0}. Must be in format X.Y.Z (e.g., 1.0.0)")]
    InvalidVersionFormat(String),

    #[error("book_asset and price_asset must be different addresses")]
    AssetsNotDistinct,

    #[error("unit_scale must be a positive power of ten, got: {0}")]
    InvalidUnitScale(u128),

    #[error("Unsupported store type '{0}'. Only 'memory' is supported")]
    UnsupportedStoreType(String),

    #[error("Unsupported log format '{0}'. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("bind_address '{0}' is not a valid host:port pair")]
    InvalidBindAddress(String),
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &EngineConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_exchange(&config.exchange, &mut report);
    validate_assets(&config.assets, &mut report);
    validate_store(&config.store, &mut report);
    validate_observability(&config.observability, &mut report);

    report
}

fn validate_exchange(exchange: &ExchangeConfig, report: &mut ValidationReport) {
    if exchange.name.is_empty() {
        report.add_error(ValidationError::MissingExchangeName);
    }

    if exchange.description.is_empty() {
        report.add_error(ValidationError::MissingExchangeDescription);
    }

    if !exchange
        .version
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        || exchange.version.split('.').count() != 3
    {
        report.add_error(ValidationError::InvalidVersionFormat(
            exchange.version.clone(),
        ));
    }
}

fn validate_assets(assets: &AssetsConfig, report: &mut ValidationReport) {
    if assets.book_asset == assets.price_asset {
        report.add_error(ValidationError::AssetsNotDistinct);
    }

    if assets.unit_scale == 0 || !is_power_of_ten(assets.unit_scale) {
        report.add_error(ValidationError::InvalidUnitScale(assets.unit_scale));
    }
}

fn is_power_of_ten(value: u128) -> bool {
    let mut remaining = value;
    if remaining == 0 {
        return false;
    }
    while remaining % 10 == 0 {
        remaining /= 10;
    }
    remaining == 1
}

fn validate_store(store: &StoreConfig, report: &mut ValidationReport) {
    if store.store_type != "memory" {
        report.add_error(ValidationError::UnsupportedStoreType(
            store.store_type.clone(),
        ));
    }
}

fn validate_observability(observability: &ObservabilityConfig, report: &mut ValidationReport) {
    let valid_formats = ["pretty", "json", "compact"];
    if !valid_formats.contains(&observability.log_format.as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(
            observability.log_format.clone(),
        ));
    }

    if observability.bind_address.rsplit_once(':').is_none() {
        report.add_error(ValidationError::InvalidBindAddress(
            observability.bind_address.clone(),
        ));
    }
}
