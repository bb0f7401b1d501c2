//! # Config Commands
//!
//! Read-only view of the loaded configuration.

use serde::Serialize;
use tracing::debug;

use crate::state::AppConfig;

/// What screens need from the configuration. Paths stay private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDto {
    pub clinic_name: String,
    pub clinic_address: Vec<String>,
    pub currency_symbol: String,
    pub low_stock_threshold: i64,
    pub report_days: i64,
    pub top_products: usize,
}

/// Gets the current application configuration.
///
/// ## When Used
/// - App startup (to configure screens)
/// - Receipt printing (clinic name, address)
/// - Currency formatting
pub fn get_config(config: &AppConfig) -> ConfigDto {
    debug!("get_config command");
    ConfigDto {
        clinic_name: config.clinic_name.clone(),
        clinic_address: config.clinic_address.clone(),
        currency_symbol: config.currency_symbol.clone(),
        low_stock_threshold: config.low_stock_threshold,
        report_days: config.report_days,
        top_products: config.top_products,
    }
}
