use std::path::PathBuf;

use crate::history::EntryId;

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// Whether there is anything on the canvas worth saving
    ContentChanged { has_content: bool },
    /// The canvas or the live stroke changed and needs repainting
    CanvasInvalidated,
    UndoAvailability { can_undo: bool, can_redo: bool },
    SaveCompleted { id: EntryId },
    SaveFailed { reason: String },
    ExportCompleted { path: PathBuf },
    ExportFailed { reason: String },
}
