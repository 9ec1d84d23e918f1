use std::fs;

use camino::Utf8Path;

use crate::error::DataError;

/// Site-wide template context, an arbitrary JSON document. Parsed exactly
/// once per process, before any task runs, and never mutated afterwards.
pub type SiteData = serde_json::Value;

/// Load the site data document. A missing or malformed file is a startup
/// failure, not an empty context.
pub fn load(path: &Utf8Path) -> Result<SiteData, DataError> {
    let text = fs::read_to_string(path) //
        .map_err(|e| DataError::Read(path.to_owned(), e))?;

    let data = serde_json::from_str(&text) //
        .map_err(|e| DataError::Parse(path.to_owned(), e))?;

    Ok(data)
}
