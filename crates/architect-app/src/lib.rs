pub mod client;
pub mod clipboard;
pub mod config;
pub mod session;
pub mod timer;

pub use client::{GenerationError, Generator, HttpGenerationClient};
pub use clipboard::{ClipboardError, ClipboardWriter, SystemClipboard};
pub use config::AppConfig;
pub use session::{GenerateOutcome, SessionController, Timings, EMPTY_INPUT_MESSAGE};
