pub mod api;
pub mod prompt;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};

pub use prompt::{build_prompt, SYSTEM_INSTRUCTION};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

// --- Types ---

/// Which transformation template is applied to the user's input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Improve,
    Idea,
    Expert,
}

impl Mode {
    /// All modes in picker order.
    pub const ALL: [Mode; 3] = [Mode::Improve, Mode::Idea, Mode::Expert];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Improve => "improve",
            Mode::Idea => "idea",
            Mode::Expert => "expert",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Improve => "Improve Prompt",
            Mode::Idea => "Generate from Idea",
            Mode::Expert => "Expert-Level",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Mode::Improve => "Refine existing prompts for clarity and specificity.",
            Mode::Idea => "Expand vague ideas into full, detailed prompts.",
            Mode::Expert => "Create highly advanced, structured prompts with reasoning.",
        }
    }

    /// Hint text shown in an empty input box.
    pub fn placeholder(self) -> &'static str {
        match self {
            Mode::Improve => "Paste your existing prompt here...",
            Mode::Idea => "e.g., Build a finance app for tracking expenses...",
            Mode::Expert => "Describe the complex task you need an expert prompt for...",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode: {0:?} (expected improve, idea or expert)")]
pub struct ModeParseError(pub String);

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "improve" => Ok(Mode::Improve),
            "idea" => Ok(Mode::Idea),
            "expert" => Ok(Mode::Expert),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

/// Everything a host needs to render the prompt page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub input_text: String,
    pub mode: Mode,
    pub output_text: String,
    pub is_loading: bool,
    /// Empty when there is nothing to show.
    pub error_message: String,
    pub is_saving: bool,
    pub last_saved: Option<DateTime<Utc>>,
    /// Set for a short while after the output was copied.
    pub copied: bool,
}

impl Session {
    /// Overlay whatever was found in storage onto this session.
    pub fn restore(&mut self, record: PersistedRecord) {
        if let Some(input) = record.input_text {
            self.input_text = input;
        }
        if let Some(output) = record.output_text {
            self.output_text = output;
        }
        if let Some(mode) = record.mode {
            self.mode = mode;
        }
    }

    pub fn to_record(&self) -> PersistedRecord {
        PersistedRecord {
            input_text: Some(self.input_text.clone()),
            output_text: Some(self.output_text.clone()),
            mode: Some(self.mode),
        }
    }
}

// --- Persisted state ---

pub const INPUT_KEY: &str = "pa_input";
pub const OUTPUT_KEY: &str = "pa_output";
pub const MODE_KEY: &str = "pa_mode";

/// The three fields that survive a restart. `None` means the key was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedRecord {
    pub input_text: Option<String>,
    pub output_text: Option<String>,
    pub mode: Option<Mode>,
}

impl PersistedRecord {
    /// Read the three keys. A key that is missing, empty or unreadable is
    /// treated as absent so a half-written record still loads.
    pub fn load(store: &dyn KeyValueStore) -> PersistedRecord {
        let read = |key: &str| match store.get(key) {
            Ok(Some(value)) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(e) => {
                log::warn!("failed to read {key}: {e}");
                None
            }
        };

        let mode = read(MODE_KEY).and_then(|raw| match raw.parse::<Mode>() {
            Ok(mode) => Some(mode),
            Err(e) => {
                log::warn!("ignoring persisted mode: {e}");
                None
            }
        });

        PersistedRecord {
            input_text: read(INPUT_KEY),
            output_text: read(OUTPUT_KEY),
            mode,
        }
    }

    /// Write every present field. Each key is its own write.
    pub fn store(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        if let Some(input) = &self.input_text {
            store.set(INPUT_KEY, input)?;
        }
        if let Some(output) = &self.output_text {
            store.set(OUTPUT_KEY, output)?;
        }
        if let Some(mode) = self.mode {
            store.set(MODE_KEY, mode.as_str())?;
        }
        Ok(())
    }
}

// --- Storage location ---

pub const DATA_DIR_VAR: &str = "ARCHITECT_DATA_DIR";

/// Resolve the data directory (`$ARCHITECT_DATA_DIR`, else ~/.prompt-architect/).
pub fn data_dir() -> PathBuf {
    data_dir_from(|var| std::env::var(var).ok())
}

/// [`data_dir`] against any variable lookup.
pub fn data_dir_from(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = lookup(DATA_DIR_VAR).filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prompt-architect")
}
