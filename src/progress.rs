//! Defines structures and types for progress reporting during imports.

/// Stage names reported by `Lmf::import_with_progress`.
pub const STAGE_READING: &str = "Reading XML";
pub const STAGE_PARSING: &str = "Parsing XML";
pub const STAGE_WRITING: &str = "Writing database";

/// Number of parsed elements between two "Parsing XML" updates.
pub const PARSE_REPORT_INTERVAL: u64 = 10_000;

/// Represents a snapshot of the progress during a long-running operation.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// A description of the current stage (e.g., "Parsing XML").
    pub stage_description: String,
    /// Number of items processed in the current stage.
    pub current_item: u64,
    /// Total number of items expected in the current stage (if calculable).
    pub total_items: Option<u64>,
    /// An optional message providing more context (e.g., the input file name).
    pub message: Option<String>,
}

/// Type alias for the progress callback function.
///
/// The callback receives a `ProgressUpdate` and returns `true` to continue. Imports
/// cannot be interrupted mid-stream, so the return value is currently ignored.
///
/// The callback must be `Send` and `Sync` because the parse stage runs on a blocking
/// worker thread, and `FnMut` allows it to modify its captured state (e.g. a spinner).
pub type ProgressCallback = Box<dyn FnMut(ProgressUpdate) -> bool + Send + Sync>;

impl ProgressUpdate {
    /// Creates a new progress update for the start of a stage.
    pub fn new_stage(description: &str, total_items: Option<u64>) -> Self {
        ProgressUpdate {
            stage_description: description.to_string(),
            current_item: 0,
            total_items,
            message: None,
        }
    }

    /// Creates an update for an item count inside an already started stage.
    pub fn at(description: &str, current_item: u64, total_items: Option<u64>) -> Self {
        ProgressUpdate {
            stage_description: description.to_string(),
            current_item,
            total_items,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Invokes the callback, if any.
pub(crate) fn report(callback: &mut Option<ProgressCallback>, update: ProgressUpdate) {
    if let Some(cb) = callback.as_mut() {
        let _ = cb(update); // Cancellation is not supported
    }
}
