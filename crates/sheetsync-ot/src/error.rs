//! Error types for collaborative commands

/// Command errors
#[derive(Debug, thiserror::Error)]
pub enum OtError {
    /// Payload is not a known command
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Edited filter does not carry the id it is addressed by
    #[error("filter edit addressed to '{id}' carries filter '{filter_id}'")]
    FilterIdMismatch {
        /// Id the command targets
        id: String,
        /// Id carried by the filter
        filter_id: String,
    },

    /// Inserted cell references another data source than its command
    #[error("cell of insert {id} references data source {referenced}")]
    ForeignFormula {
        /// Id of the inserted data source
        id: u32,
        /// Id the formula references
        referenced: u32,
    },
}
