use std::io;

use thiserror::Error;

/// Coarse classification of a [`KernelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Descriptor shapes, types or counts cannot be accepted.
    InvalidArgument,
    /// The descriptors are compatible but the planned tiling is infeasible.
    Runtime,
    /// The caller broke a usage contract (e.g. ran an unconfigured kernel).
    PreconditionViolation,
    /// The external device or compiler reported a failure.
    Device,
    /// Persistence of auxiliary state (tuning store) failed.
    Io,
}

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("runtime error: {message}")]
    Runtime { message: String },
    #[error("precondition violated: {message}")]
    PreconditionViolation { message: String },
    #[error("device failure: {message}")]
    Device { message: String },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl KernelError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        KernelError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        KernelError::Runtime {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        KernelError::PreconditionViolation {
            message: message.into(),
        }
    }

    pub fn device(message: impl Into<String>) -> Self {
        KernelError::Device {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            KernelError::Runtime { .. } => ErrorKind::Runtime,
            KernelError::PreconditionViolation { .. } => ErrorKind::PreconditionViolation,
            KernelError::Device { .. } => ErrorKind::Device,
            KernelError::Io(_) => ErrorKind::Io,
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Returns `InvalidArgument` with `message` when `condition` holds.
pub(crate) fn invalid_if(condition: bool, message: impl Into<String>) -> KernelResult<()> {
    if condition {
        return Err(KernelError::invalid_argument(message));
    }
    Ok(())
}
