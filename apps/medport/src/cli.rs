//! # CLI Commands
//!
//! One `cmd_*` function per subcommand. Each returns its result instead of
//! exiting, so the integration tests can call them directly; `main.rs` turns
//! an `Err` into a non-zero exit code.

use crate::api::{self, AppState};
use crate::config::{ClientConfig, ServerConfig};
use medport_client::{MedportClient, Notification};
use medport_core::{
    MedicationForm, MedicationInput, MedportError, Rgb, ValidationErrors, parse_hex, rgb_to_hex,
};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Error)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid submission file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] MedportError),

    #[error(transparent)]
    Client(#[from] medport_client::Error),

    #[error("the form has errors:\n{}", format_errors(.0))]
    Invalid(ValidationErrors),

    #[error("{0}")]
    NotAccepted(String),

    #[error("cannot read color {0:?}; expected #rrggbb or r,g,b")]
    Color(String),
}

fn format_errors(errors: &ValidationErrors) -> String {
    errors
        .iter()
        .map(|error| format!("  {}: {}", error.path, error.message))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// FILE HELPERS
// =============================================================================

/// Read a submission JSON file into a form.
pub fn load_form(path: &Path) -> Result<MedicationForm, CliError> {
    let content = std::fs::read_to_string(path)?;
    let input: MedicationInput = serde_json::from_str(&content)?;
    Ok(MedicationForm::from_input(input))
}

// =============================================================================
// SERVER
// =============================================================================

/// Run the HTTP server until Ctrl-C.
pub async fn cmd_serve(config: &ServerConfig) -> Result<(), CliError> {
    let store = config.open_store()?;
    tracing::info!(
        backend = ?config.backend,
        rate_limit = config.rate_limit,
        api_key = config.api_key().is_some(),
        "starting MedPort server"
    );

    let router = api::create_router(AppState::new(store, config));
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    api::serve(listener, router, api::shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}

// =============================================================================
// CLIENT
// =============================================================================

/// Validate the file, POST it, and report what the user would be told.
pub async fn cmd_submit(file: &Path, client: &ClientConfig) -> Result<(), CliError> {
    let mut form = load_form(file)?;
    let medport = MedportClient::with_options(&client.url, &client.options())?;

    match medport.submit_form(&mut form).await {
        Notification::Success => {
            println!("{}", Notification::Success.message());
            Ok(())
        }
        Notification::Invalid(errors) => Err(CliError::Invalid(errors)),
        failure @ Notification::Failure => Err(CliError::NotAccepted(failure.message())),
    }
}

/// The connectivity demo: fetch the API root and the medication collection.
pub async fn cmd_connect(client: &ClientConfig) -> Result<(Value, Value), CliError> {
    let medport = MedportClient::with_options(&client.url, &client.options())?;

    let root = medport.root().await?;
    println!("API root: {}", serde_json::to_string_pretty(&root)?);

    let medications = medport.medications_raw().await?;
    println!("Medications: {}", serde_json::to_string_pretty(&medications)?);

    Ok((root, medications))
}

// =============================================================================
// OFFLINE
// =============================================================================

/// Check a submission file without sending it.
pub fn cmd_validate(file: &Path) -> Result<(), CliError> {
    let form = load_form(file)?;
    form.validate().map_err(CliError::Invalid)?;
    println!("{} is valid ({})", file.display(), form.frequency_summary());
    Ok(())
}

/// A blank form, pretty-printed.
pub fn cmd_template() -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(MedicationForm::new().values())?)
}

/// Convert between `#rrggbb` and `r,g,b`.
pub fn cmd_color(value: &str) -> Result<String, CliError> {
    let value = value.trim();

    if value.contains(',') {
        let channels = value
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| CliError::Color(value.to_string()))?;
        let [red, green, blue] = channels[..] else {
            return Err(CliError::Color(value.to_string()));
        };
        return Ok(rgb_to_hex(Rgb::new(red, green, blue)));
    }

    let rgb = parse_hex(value).ok_or_else(|| CliError::Color(value.to_string()))?;
    Ok(format!("{},{},{}", rgb.red, rgb.green, rgb.blue))
}
