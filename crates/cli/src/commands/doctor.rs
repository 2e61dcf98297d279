use std::time::Duration;

use orderdesk_core::config::{AppConfig, LoadOptions, SessionStoreKind};
use orderdesk_db::{connect_with_settings, migrations};
use orderdesk_storefront::catalog_provider;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::block_on;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            check_llm_credential(&config),
            check_catalog(&config),
            check_session_store(&config),
        ],
        Err(error) => vec![
            DoctorCheck::fail("config_validation", error.to_string()),
            DoctorCheck::skipped("llm_credential"),
            DoctorCheck::skipped("catalog_source"),
            DoctorCheck::skipped("session_store"),
        ],
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Presence only; the key is never sent anywhere from here.
fn check_llm_credential(config: &AppConfig) -> DoctorCheck {
    match &config.llm.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => DoctorCheck::pass(
            "llm_credential",
            format!("api key present for model `{}`", config.llm.model),
        ),
        _ => DoctorCheck::fail(
            "llm_credential",
            "llm.api_key is not set; every conversation turn will fail",
        ),
    }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    let provider = match catalog_provider(&config.catalog) {
        Ok(provider) => provider,
        Err(error) => return DoctorCheck::fail("catalog_source", error.to_string()),
    };

    let timeout = Duration::from_secs(config.catalog.timeout_secs);
    match block_on(async { tokio::time::timeout(timeout, provider.list_products()).await }) {
        Ok(Ok(Ok(records))) => {
            DoctorCheck::pass("catalog_source", format!("{} products listed", records.len()))
        }
        Ok(Ok(Err(error))) => DoctorCheck::fail("catalog_source", error.to_string()),
        Ok(Err(_)) => DoctorCheck::fail(
            "catalog_source",
            format!("catalog fetch timed out after {}s", timeout.as_secs()),
        ),
        Err(message) => DoctorCheck::fail("catalog_source", message),
    }
}

fn check_session_store(config: &AppConfig) -> DoctorCheck {
    if config.session.store == SessionStoreKind::Memory {
        return DoctorCheck::pass("session_store", "in-memory session store");
    }

    let result = block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))?;
        let applied = migrations::run_pending(&pool)
            .await
            .map_err(|error| format!("session schema is not current: {error}"));
        pool.close().await;
        applied
    });

    match result.and_then(|inner| inner) {
        Ok(()) => DoctorCheck::pass(
            "session_store",
            format!("connected using `{}`", config.database.url),
        ),
        Err(error) => DoctorCheck::fail("session_store", error),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
