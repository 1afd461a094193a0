//! RHI error types.
//!
//! Contract violations (invalid create infos, out-of-order frame calls,
//! recording into a compiled pass) panic at the call site. Everything that
//! can legitimately fail at runtime is reported through [`RhiError`].

use thiserror::Error;

use crate::backend::BackendError;

/// Errors returned by the frame scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RhiError {
    /// The backend ran out of memory while allocating a transient attachment.
    #[error("out of GPU memory while allocating transient attachment '{attachment}'")]
    OutOfMemory {
        /// Name of the attachment whose allocation failed.
        attachment: String,
    },
    /// The attachment has no physical resource at this point of the frame.
    #[error("attachment '{name}' has no physical resource in the current frame")]
    AttachmentNotResolved {
        /// Name of the attachment.
        name: String,
    },
    /// The attachment handle refers to an attachment that no longer exists.
    #[error("stale attachment handle")]
    StaleHandle,
    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result alias for scheduler operations.
pub type RhiResult<T> = Result<T, RhiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RhiError::OutOfMemory {
            attachment: "GBuffer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "out of GPU memory while allocating transient attachment 'GBuffer'"
        );

        let err = RhiError::AttachmentNotResolved {
            name: "X".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "attachment 'X' has no physical resource in the current frame"
        );
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: RhiError = BackendError::DeviceLost.into();
        assert_eq!(err, RhiError::Backend(BackendError::DeviceLost));
        assert_eq!(err.to_string(), "GPU device lost");
    }
}
