//! Pre-flight checks before expensive operations.
//!
//! Validates that configuration is usable before starting a run that would
//! otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, TourError};
use std::path::Path;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Text only: API key.
    Narrate,
    /// Text and audio: API key and a writable output directory.
    NarrateWithAudio,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings, output_dir: &Path) -> Result<()> {
    check_api_key(settings)?;
    check_base_url(settings)?;
    if let Operation::NarrateWithAudio = operation {
        check_output_dir(output_dir)?;
    }
    Ok(())
}

fn check_api_key(settings: &Settings) -> Result<()> {
    settings.require_api_key().map(|_| ())
}

fn check_base_url(settings: &Settings) -> Result<()> {
    url::Url::parse(&settings.api.base_url).map(|_| ()).map_err(|e| {
        TourError::Config(format!(
            "api.base_url '{}' is not a valid URL: {}",
            settings.api.base_url, e
        ))
    })
}

fn check_output_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let metadata = std::fs::metadata(dir)?;
    if metadata.permissions().readonly() {
        return Err(TourError::Config(format!(
            "Output directory {} is not writable",
            dir.display()
        )));
    }
    Ok(())
}
