//! Pipeline stage configuration.
//!
//! A stage is one named output map produced from the same input image
//! (e.g. `"Normal"` or `"Roughness"`). The stage list is fixed at process
//! start; its order is the order the worker runs the models in, and stage
//! names key the per-job result map.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The standard PBR map set; one pix2pix checkpoint serves each stage.
pub const DEFAULT_STAGES: &[&str] = &["Albedo", "Normal", "Height", "Roughness", "Metallic"];

/// Maximum number of stages in a pipeline.
const MAX_STAGES: usize = 16;

/// Maximum length of a single stage name.
const MAX_STAGE_NAME_LEN: usize = 64;

/// The default stage list as owned strings.
pub fn default_stages() -> Vec<String> {
    DEFAULT_STAGES.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Parsing / validation
// ---------------------------------------------------------------------------

/// Parse a comma-separated stage list (e.g. `"Albedo,Normal,Height"`).
///
/// Whitespace around names is trimmed; empty segments are ignored.
/// The parsed list is validated via [`validate_stages`].
pub fn parse_stage_list(raw: &str) -> Result<Vec<String>, CoreError> {
    let stages: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    validate_stages(&stages)?;
    Ok(stages)
}

/// Validate a stage list.
///
/// Rules:
/// - At least one stage, at most `MAX_STAGES`.
/// - Each name must not exceed `MAX_STAGE_NAME_LEN` characters and may
///   only contain alphanumeric, hyphen, or underscore characters.
/// - No duplicates (stage names key the result map).
pub fn validate_stages(stages: &[String]) -> Result<(), CoreError> {
    if stages.is_empty() {
        return Err(CoreError::Validation(
            "Stage list must not be empty".to_string(),
        ));
    }
    if stages.len() > MAX_STAGES {
        return Err(CoreError::Validation(format!(
            "A pipeline may have at most {MAX_STAGES} stages"
        )));
    }
    for stage in stages {
        if stage.len() > MAX_STAGE_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "Stage name \"{stage}\" exceeds {MAX_STAGE_NAME_LEN} characters"
            )));
        }
        if !stage
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::Validation(format!(
                "Stage name \"{stage}\" may only contain alphanumeric, hyphen, or underscore characters"
            )));
        }
    }

    let mut seen = std::collections::HashSet::with_capacity(stages.len());
    for stage in stages {
        if !seen.insert(stage.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate stage: \"{stage}\""
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
