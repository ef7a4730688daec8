//! The turn engine of supportdesk.
//!
//! A turn runs in a fixed order:
//!
//! 1. **Begin** — take the session and read its latest turn index
//! 2. **Remember** — load the last K committed exchanges
//! 3. **Classify** — extract at most one intent from the message
//! 4. **Look up** — run the one tool the intent implies
//! 5. **Ask** — call the model under a deadline
//! 6. **Compose** — merge draft and lookup, add the summary, cap the length
//! 7. **Commit** — write both sides under the next index, or abort

pub mod composer;
pub mod intent;
pub mod memory_window;
pub mod orchestrator;
pub mod prompt;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use composer::ResponseComposer;
pub use intent::IntentExtractor;
pub use memory_window::{MemoryWindow, load_window};
pub use orchestrator::{TurnOrchestrator, TurnReply, TurnSettings};
pub use sequencer::{CommittedTurn, TurnHandle, TurnSequencer};
