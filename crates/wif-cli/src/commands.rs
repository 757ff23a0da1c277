//! Command handlers.
//!
//! Each handler takes its clients as trait objects and its output streams
//! as writers, and returns whether the command succeeded. Hard errors
//! (unreachable API, unknown config) propagate as `Err`.

use std::io::Write;

use eyre::{Result, WrapErr};
use wif_core::WifConfigInput;
use wif_gcp::GcpClient;
use wif_ocm::WifConfigStore;
use wif_provisioner::ProvisionOptions;

use crate::cli::Command;
use crate::render;
use crate::settings::Settings;

/// Build the REST clients the command needs and run it against stdout and
/// stderr.
pub async fn run(command: &Command, settings: &Settings) -> Result<bool> {
    let mut out = std::io::stdout();
    let mut err = std::io::stderr();
    let store = settings.ocm_client()?;

    match command {
        Command::Create {
            name,
            project,
            dry_run,
        } => {
            let gcp = settings.gcp_client()?;
            let input = WifConfigInput::new(name, project);
            create(
                &store,
                &gcp,
                &input,
                &settings.provision_options(*dry_run),
                &mut out,
                &mut err,
            )
            .await
        }
        Command::Verify { id } => verify(&store, &settings.gcp_client()?, id, &mut err).await,
        Command::Update { id } => update(&store, &settings.gcp_client()?, id, &mut err).await,
        Command::Delete { id, dry_run } => {
            let gcp = settings.gcp_client()?;
            delete(&store, &gcp, id, &settings.provision_options(*dry_run), &mut err).await
        }
        Command::Get { id, single } => get(&store, id, *single, &mut out).await,
        Command::List => list(&store, &mut out).await,
        Command::Describe { id } => describe(&store, id, &mut out).await,
    }
}

pub async fn create(
    store: &dyn WifConfigStore,
    client: &dyn GcpClient,
    input: &WifConfigInput,
    options: &ProvisionOptions,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<bool> {
    let outcome = wif_provisioner::create(store, client, input, options)
        .await
        .wrap_err_with(|| format!("failed to create wif-config '{}'", input.display_name))?;

    for line in render::report_lines(&outcome.report) {
        writeln!(err, "{line}")?;
    }
    if options.dry_run {
        writeln!(
            err,
            "dry run: wif-config '{}' registered, GCP resources left unchanged",
            outcome.config.id
        )?;
    } else {
        writeln!(err, "wif-config '{}' created", outcome.config.id)?;
    }
    writeln!(out, "{}", outcome.config.id)?;
    Ok(true)
}

/// Exit status is success iff nothing drifted and every account was checked.
pub async fn verify(
    store: &dyn WifConfigStore,
    client: &dyn GcpClient,
    id: &str,
    err: &mut dyn Write,
) -> Result<bool> {
    let detection = wif_provisioner::verify(store, client, id)
        .await
        .wrap_err_with(|| format!("failed to verify wif-config '{id}'"))?;

    for line in render::unsupported_lines(&detection.unsupported) {
        writeln!(err, "{line}")?;
    }
    if detection.is_converged() {
        writeln!(err, "wif-config '{id}' is valid")?;
        return Ok(true);
    }
    writeln!(err, "wif-config '{id}' verification failed:")?;
    for line in render::detection_lines(&detection) {
        writeln!(err, "  {line}")?;
    }
    Ok(false)
}

pub async fn update(
    store: &dyn WifConfigStore,
    client: &dyn GcpClient,
    id: &str,
    err: &mut dyn Write,
) -> Result<bool> {
    let outcome = wif_provisioner::update(store, client, id)
        .await
        .wrap_err_with(|| format!("failed to update wif-config '{id}'"))?;

    for line in render::reconcile_lines(&outcome.reconcile) {
        writeln!(err, "{line}")?;
    }
    if outcome.is_converged() {
        writeln!(err, "wif-config '{id}' is up to date")?;
        return Ok(true);
    }
    writeln!(err, "wif-config '{id}' still has drift after update:")?;
    for line in render::detection_lines(&outcome.after) {
        writeln!(err, "  {line}")?;
    }
    Ok(false)
}

pub async fn delete(
    store: &dyn WifConfigStore,
    client: &dyn GcpClient,
    id: &str,
    options: &ProvisionOptions,
    err: &mut dyn Write,
) -> Result<bool> {
    let report = wif_provisioner::delete(store, client, id, options)
        .await
        .wrap_err_with(|| format!("failed to delete wif-config '{id}'"))?;

    for line in render::report_lines(&report) {
        writeln!(err, "{line}")?;
    }
    if !options.dry_run {
        writeln!(err, "wif-config '{id}' deleted")?;
    }
    Ok(true)
}

pub async fn get(
    store: &dyn WifConfigStore,
    id: &str,
    single: bool,
    out: &mut dyn Write,
) -> Result<bool> {
    let config = store
        .get_wif_config(id)
        .await
        .wrap_err_with(|| format!("failed to get wif-config '{id}'"))?;
    writeln!(out, "{}", render::config_json(&config, single)?)?;
    Ok(true)
}

pub async fn list(store: &dyn WifConfigStore, out: &mut dyn Write) -> Result<bool> {
    let configs = store
        .list_wif_configs()
        .await
        .wrap_err("failed to list wif-configs")?;
    for config in &configs {
        writeln!(out, "{}", render::config_line(config))?;
    }
    Ok(true)
}

pub async fn describe(store: &dyn WifConfigStore, id: &str, out: &mut dyn Write) -> Result<bool> {
    let config = store
        .get_wif_config(id)
        .await
        .wrap_err_with(|| format!("failed to describe wif-config '{id}'"))?;
    write!(out, "{}", render::describe(&config))?;
    Ok(true)
}
