//! Error types for sparsemerge

use thiserror::Error;

/// Result type alias using sparsemerge's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or merging sparse matrices
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An allocation for output storage failed
    #[error("Out of memory: failed to allocate {bytes} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        bytes: usize,
    },

    /// Operand, operator or output types cannot be combined
    #[error("Type mismatch in {context}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Where the mismatch was detected
        context: &'static str,
        /// Type name required at that position
        expected: String,
        /// Type name actually supplied
        got: String,
    },

    /// Operand dimensions differ
    #[error("Dimension mismatch in {context}: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        /// Where the mismatch was detected
        context: &'static str,
        /// Expected (vlen, vdim)
        expected: (usize, usize),
        /// Actual (vlen, vdim)
        got: (usize, usize),
    },

    /// Matrix parts violate a structural invariant
    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    /// An upstream stage broke the contract of this phase
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Value storage could not be viewed as the requested element type
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// The worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl Error {
    /// Create a type mismatch error from two type names
    pub fn type_mismatch(
        context: &'static str,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            context,
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a contract violation error
    pub fn contract(reason: impl Into<String>) -> Self {
        Self::ContractViolation(reason.into())
    }

    /// Returns true for the fatal, non-recoverable class of errors
    #[inline]
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ContractViolation(_))
    }
}

impl From<bytemuck::PodCastError> for Error {
    fn from(e: bytemuck::PodCastError) -> Self {
        Self::Alignment(format!("{e:?}"))
    }
}
