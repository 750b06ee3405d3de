use thiserror::Error;

/// Everything that can end a user action or a completed request.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please enter a manga title to search.")]
    EmptyQuery,
    #[error("Error: {0}")]
    Network(String),
    #[error("Parse error at {offset}: {message}")]
    MalformedResponse { offset: usize, message: String },
    #[error("Failed to open database: {0}")]
    StorageUnavailable(String),
    #[error("Failed to load bookmarks: {0}")]
    ReadFailed(String),
    #[error("Failed to save bookmark: {0}")]
    WriteFailed(String),
    #[error("Pick a chapter first.")]
    NoChapterSelected,
    #[error("Please select a bookmark to delete.")]
    NoBookmarkSelected,
}

impl AppError {
    /// Heading of the modal notice this error is shown in.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::EmptyQuery => "Search Error",
            AppError::Network(_) => "Network Error",
            AppError::MalformedResponse { .. } => "JSON Parse Error",
            AppError::StorageUnavailable(_)
            | AppError::ReadFailed(_)
            | AppError::WriteFailed(_) => "Database Error",
            AppError::NoChapterSelected => "Warning",
            AppError::NoBookmarkSelected => "No Selection",
        }
    }

    /// Builds a `MalformedResponse` from a serde_json error, converting its
    /// line/column position into a byte offset within `body`. Truncated
    /// input reports the end of the body.
    pub fn malformed(body: &[u8], err: &serde_json::Error) -> Self {
        let offset = if err.is_eof() {
            body.len()
        } else {
            byte_offset(body, err.line(), err.column())
        };
        AppError::MalformedResponse {
            offset,
            message: err.to_string(),
        }
    }
}

// serde_json reports 1-based lines and 1-based byte columns.
fn byte_offset(body: &[u8], line: usize, column: usize) -> usize {
    let mut start_of_line = 0;
    if line > 1 {
        let mut newlines = body
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .map(|(i, _)| i + 1);
        start_of_line = newlines.nth(line - 2).unwrap_or(body.len());
    }
    (start_of_line + column.saturating_sub(1)).min(body.len())
}
