use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Reads a JSON file, reporting the path of the offending field on error.
pub fn load_json_from_file<T, P>(path: P) -> Result<T>
where
    for<'de> T: Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&data);
    serde_path_to_error::deserialize(de)
        .with_context(|| format!("failed to parse {}", path.display()))
}
