//! Generational handles for frame graph objects.
//!
//! Handles are slot map keys: they stay valid while the object they refer to
//! is alive regardless of container growth, and become stale (rather than
//! dangling) once it is removed.

use slotmap::new_key_type;

new_key_type! {
    /// Handle to an attachment in the registry.
    pub struct AttachmentHandle;

    /// Handle to a pass recorded in the current frame.
    pub struct PassHandle;

    /// Handle to one use of an attachment by a pass.
    pub struct PassAttachmentHandle;
}

static_assertions::assert_eq_size!(AttachmentHandle, u64);
static_assertions::assert_eq_size!(PassAttachmentHandle, u64);
