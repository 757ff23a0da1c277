//! Plain-text rendering of configs and reports.

use std::fmt::Write as _;

use wif_core::WifConfig;
use wif_provisioner::{ActionType, Detection, ExecutionReport, ReconcileReport, UnsupportedRole};

pub fn config_json(config: &WifConfig, single: bool) -> serde_json::Result<String> {
    if single {
        serde_json::to_string(config)
    } else {
        serde_json::to_string_pretty(config)
    }
}

/// `id  display-name  project` with the first two columns padded.
pub fn config_line(config: &WifConfig) -> String {
    format!(
        "{:<32}  {:<24}  {}",
        config.id, config.display_name, config.gcp.project_id
    )
}

pub fn describe(config: &WifConfig) -> String {
    let pool = &config.gcp.workload_identity_pool;
    let provider = &pool.identity_provider;
    let mut out = String::new();
    let _ = writeln!(out, "ID:                 {}", config.id);
    let _ = writeln!(out, "Display name:       {}", config.display_name);
    let _ = writeln!(out, "Project:            {}", config.gcp.project_id);
    if !config.gcp.project_number.is_empty() {
        let _ = writeln!(out, "Project number:     {}", config.gcp.project_number);
    }
    let _ = writeln!(out, "Impersonator:       {}", config.gcp.impersonator_email);
    let _ = writeln!(out, "Pool:               {}", pool.pool_id);
    let _ = writeln!(out, "Identity provider:  {}", provider.identity_provider_id);
    let _ = writeln!(out, "Issuer URL:         {}", provider.issuer_url);
    let _ = writeln!(out, "Audiences:          {}", provider.allowed_audiences.join(", "));
    let _ = writeln!(out, "Service accounts:");
    for sa in &config.gcp.service_accounts {
        let _ = writeln!(
            out,
            "  {:<36}  {:<11}  {} role(s)",
            sa.service_account_id,
            sa.access_method,
            sa.roles.len()
        );
    }
    out
}

pub fn unsupported_lines(unsupported: &[UnsupportedRole]) -> Vec<String> {
    unsupported.iter().map(|u| format!("warning: {u}")).collect()
}

/// One line per discrepancy, then one per account that could not be checked.
pub fn detection_lines(detection: &Detection) -> Vec<String> {
    detection
        .discrepancies
        .iter()
        .map(ToString::to_string)
        .chain(detection.failures.iter().map(|f| {
            format!(
                "service account '{}' could not be checked: {}",
                f.service_account_id, f.error
            )
        }))
        .collect()
}

pub fn reconcile_lines(report: &ReconcileReport) -> Vec<String> {
    let mut lines = Vec::new();
    lines.extend(report.applied.iter().map(|d| format!("applied: {d}")));
    lines.extend(
        report
            .already_satisfied
            .iter()
            .map(|d| format!("already satisfied: {d}")),
    );
    lines.extend(
        report
            .failed
            .iter()
            .map(|f| format!("failed: {}: {}", f.discrepancy, f.error)),
    );
    lines.extend(
        report
            .unapplied_roles
            .iter()
            .map(|u| format!("unapplied: {u}")),
    );
    lines
}

/// Actions that change something; no-ops are left out.
pub fn report_lines(report: &ExecutionReport) -> Vec<String> {
    let prefix = if report.dry_run { "would " } else { "" };
    let mut lines: Vec<String> = report
        .actions
        .iter()
        .filter(|a| a.action != ActionType::NoOp)
        .map(|a| format!("{prefix}{} {} {}", a.action, a.resource_type, a.resource_id))
        .collect();
    lines.extend(
        report
            .unapplied_roles
            .iter()
            .map(|u| format!("unapplied: {u}")),
    );
    lines
}
