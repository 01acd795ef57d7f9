//! Email threading module
//!
//! Messages are grouped into threads by normalized subject at ingestion time and
//! arranged into a reply forest at read time.
//!
//! ## Threading Strategy
//!
//! 1. **Subject key**: `subject` strips reply/forward markers and allow-listed list
//!    tags. Every message whose subject normalizes to the same key joins one thread.
//! 2. **Reply chain**: inside a thread, `tree` links each message under the message
//!    its In-Reply-To header names. Messages whose parent is absent from the thread
//!    start a new branch.
//!
//! ## Module Structure
//!
//! - `subject`: Subject normalization
//! - `tree`: Index-based reply forest
//! - `cycle_detection`: Ancestry check guarding every link

pub mod cycle_detection;
pub mod subject;
pub mod tree;

// Re-export main types and functions
pub use subject::SubjectNormalizer;
pub use tree::{ThreadForest, build_forest};
