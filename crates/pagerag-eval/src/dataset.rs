use std::fs;
use std::path::Path;

use pagerag_core::{Error, EvalItem, Result};

/// Load a JSON array of `{"question": .., "expected": ..}` objects.
pub fn load_eval_set(path: &Path) -> Result<Vec<EvalItem>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::EvalInput(format!("cannot read evaluation set {}: {}", path.display(), e)))?;
    let items: Vec<EvalItem> = serde_json::from_str(&raw)
        .map_err(|e| Error::EvalInput(format!("malformed evaluation set {}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), items = items.len(), "loaded evaluation set");
    Ok(items)
}
