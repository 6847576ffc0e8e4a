//! Document storage configuration

use serde::{Deserialize, Serialize};

/// Document storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Directory for parsed documents as `{name}.md`; in-memory when unset
    pub storage_dir: Option<String>,
}
