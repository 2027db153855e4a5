use std::path::PathBuf;

use serde::Deserialize;

/// JSON-lines destination config.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding one `.jsonl` file per stream. Created if missing.
    pub destination_path: PathBuf,
}
