use serde::{Deserialize, Serialize};

use super::{ConfigError, Validate};

/// Note service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotesConfig {
    /// Number of notes grouped into one transaction during bulk creation
    #[serde(default = "default_create_notes_batch_size")]
    pub create_notes_batch_size: usize,
}

fn default_create_notes_batch_size() -> usize {
    100
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            create_notes_batch_size: default_create_notes_batch_size(),
        }
    }
}

impl Validate for NotesConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.create_notes_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "notes.create_notes_batch_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
