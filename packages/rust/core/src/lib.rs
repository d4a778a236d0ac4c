//! DeepCut core: the staged research pipeline.
//!
//! - [`stages`]: the fixed stage table (prompt, temperature, label per section)
//! - [`parser`]: lenient decoding of model output
//! - [`progress`]: progress events and emitters
//! - [`assembler`]: package assembly and persistence
//! - [`pipeline`]: the orchestrator tying them together

pub mod assembler;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stages;

pub use parser::parse_section;
pub use pipeline::{Pipeline, RunOutcome, user_context};
pub use progress::{ChannelEmitter, ProgressEmitter, ProgressEvent, SilentEmitter};
pub use stages::{STAGES, Stage};
