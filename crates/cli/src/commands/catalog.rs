use std::time::Duration;

use orderdesk_core::catalog::filter_snapshot;
use orderdesk_core::config::{AppConfig, LoadOptions};
use orderdesk_core::domain::category::Category;
use orderdesk_storefront::catalog_provider;

use crate::commands::{block_on, CommandResult};

/// Prints the filtered catalog for one category. Nothing is cached and no
/// session is created.
pub fn run(category: &str) -> CommandResult {
    let category = match category.parse::<Category>() {
        Ok(category) => category,
        Err(error) => {
            return CommandResult::failure("catalog", "unknown_category", error.to_string(), 2)
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "catalog",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let provider = match catalog_provider(&config.catalog) {
        Ok(provider) => provider,
        Err(error) => {
            return CommandResult::failure("catalog", "catalog_setup", error.to_string(), 3)
        }
    };

    let timeout = Duration::from_secs(config.catalog.timeout_secs);
    let fetched =
        block_on(async { tokio::time::timeout(timeout, provider.list_products()).await });
    let records = match fetched {
        Ok(Ok(Ok(records))) => records,
        Ok(Ok(Err(error))) => {
            return CommandResult::failure("catalog", "catalog_unavailable", error.to_string(), 4)
        }
        Ok(Err(_)) => {
            return CommandResult::failure(
                "catalog",
                "catalog_unavailable",
                format!("catalog fetch timed out after {}s", timeout.as_secs()),
                4,
            )
        }
        Err(message) => return CommandResult::failure("catalog", "runtime_init", message, 3),
    };

    let filtered = match filter_snapshot(category, &records) {
        Ok(filtered) => filtered,
        Err(error) => {
            return CommandResult::failure("catalog", "catalog_unavailable", error.to_string(), 4)
        }
    };

    match filtered.to_json_pretty() {
        Ok(json) => CommandResult { exit_code: 0, output: json },
        Err(error) => CommandResult::failure("catalog", "serialization", error.to_string(), 5),
    }
}
