use std::time::Duration;

use anyhow::{bail, Context};
use launchpad_agent::{DispatchTable, HttpProvisioningHandler};
use launchpad_core::config::{AppConfig, ConfigError, LoadOptions};
use launchpad_core::standard_catalog;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::CommandResult;

const PROBE_TIMEOUT_CAP_SECS: u64 = 10;

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
    fn from_probe(name: &'static str, probe: anyhow::Result<String>) -> Self {
        match probe {
            Ok(details) => Self { name, status: CheckStatus::Pass, details },
            Err(error) => Self { name, status: CheckStatus::Fail, details: format!("{error:#}") },
        }
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

pub fn run(json_output: bool) -> CommandResult {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "doctor",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };
    let report = runtime.block_on(build_report(AppConfig::load(LoadOptions::default())));
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::text(exit_code, output);
    }

    CommandResult::text(exit_code, render_human(&report))
}

async fn build_report(config: Result<AppConfig, ConfigError>) -> DoctorReport {
    let mut checks = Vec::new();

    match config {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(DoctorCheck::from_probe("dispatch_table", check_dispatch_table(&config)));

            let client = reqwest::Client::new();
            checks.push(DoctorCheck::from_probe(
                "completion_endpoint",
                check_completion_endpoint(&client, &config).await,
            ));
            checks.push(DoctorCheck::from_probe(
                "provisioning_endpoint",
                check_provisioning_endpoint(&client, &config).await,
            ));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck::skipped("dispatch_table"));
            checks.push(DoctorCheck::skipped("completion_endpoint"));
            checks.push(DoctorCheck::skipped("provisioning_endpoint"));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_dispatch_table(config: &AppConfig) -> anyhow::Result<String> {
    let handlers = HttpProvisioningHandler::standard_set(&config.provisioning)
        .context("failed to build provisioning handlers")?;
    let table = DispatchTable::complete(handlers).context("dispatch table rejected")?;
    Ok(format!(
        "{} handlers registered for {} catalog tools",
        table.len(),
        standard_catalog().len()
    ))
}

/// Lists models on the OpenAI-compatible endpoint; Ollama serves the same route.
async fn check_completion_endpoint(
    client: &reqwest::Client,
    config: &AppConfig,
) -> anyhow::Result<String> {
    let url = format!("{}/models", config.llm.effective_base_url());
    let mut request =
        client.get(&url).timeout(probe_timeout(config.llm.timeout_secs));
    if let Some(key) = &config.llm.api_key {
        request = request.bearer_auth(key.expose_secret());
    }

    let response = request.send().await.with_context(|| format!("`{url}` is unreachable"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("`{url}` answered {status}");
    }
    Ok(format!("`{url}` answered {status} (model `{}`)", config.llm.model))
}

/// Any HTTP answer counts; the panel API has no dedicated health route.
async fn check_provisioning_endpoint(
    client: &reqwest::Client,
    config: &AppConfig,
) -> anyhow::Result<String> {
    let url = config.provisioning.base_url.trim_end_matches('/').to_string();
    let response = client
        .get(&url)
        .timeout(probe_timeout(config.provisioning.timeout_secs))
        .send()
        .await
        .with_context(|| format!("`{url}` is unreachable"))?;
    Ok(format!("`{url}` reachable (status {})", response.status()))
}

fn probe_timeout(configured_secs: u64) -> Duration {
    Duration::from_secs(configured_secs.clamp(1, PROBE_TIMEOUT_CAP_SECS))
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

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

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
