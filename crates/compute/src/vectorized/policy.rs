use serde::{Deserialize, Serialize};

/// How one pipeline input is partitioned across batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorSplit {
    /// Sliced to the batch's row range. A single-row input is still broadcast.
    Rows,
    /// Passed whole to every batch.
    None,
}

/// How one batch output is merged into the shared result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorCombine {
    /// Elementwise sum into the full result.
    Add,
    /// Placed at the batch's row offset.
    Rows,
    /// Placed at the batch's column offset.
    Cols,
}

impl VectorCombine {
    /// Whether batches write disjoint regions instead of accumulating.
    pub fn is_placement(&self) -> bool {
        matches!(self, VectorCombine::Rows | VectorCombine::Cols)
    }
}
