//! Attachments and the attachment registry.
//!
//! An [`Attachment`] is one logical resource tracked by the frame scheduler.
//! It is either persistent (an imported image, buffer or swapchain owned by
//! the caller) or transient (created by the graph, allocated at compile time
//! and released at the end of the frame).

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::backend::{BufferHandle, ImageHandle};
use crate::swapchain::Swapchain;
use crate::types::{BufferDescriptor, Extent3d, ImageCreateInfo, ImageDescriptor};

use super::barrier::ResourceState;
use super::handle::{AttachmentHandle, PassAttachmentHandle, PassHandle};

/// Resource kind of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Image,
    Buffer,
}

/// Who owns the physical resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentLifetime {
    /// Caller-owned; outlives the frame.
    Persistent,
    /// Graph-owned; only valid for the duration of the current frame.
    Transient,
}

/// Where the physical resource of an attachment comes from.
#[derive(Clone)]
pub enum AttachmentSource {
    /// Graph-owned image, sized at compile time.
    TransientImage(ImageCreateInfo),
    /// Graph-owned buffer.
    TransientBuffer(BufferDescriptor),
    /// Caller-owned image.
    ImportedImage {
        image: ImageHandle,
        descriptor: ImageDescriptor,
    },
    /// Caller-owned buffer.
    ImportedBuffer {
        buffer: BufferHandle,
        descriptor: BufferDescriptor,
    },
    /// Swapchain whose current image is re-resolved on every access.
    Swapchain(Arc<dyn Swapchain>),
}

impl fmt::Debug for AttachmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransientImage(info) => f.debug_tuple("TransientImage").field(info).finish(),
            Self::TransientBuffer(desc) => f.debug_tuple("TransientBuffer").field(desc).finish(),
            Self::ImportedImage { image, .. } => {
                f.debug_struct("ImportedImage").field("image", image).finish()
            }
            Self::ImportedBuffer { buffer, .. } => {
                f.debug_struct("ImportedBuffer").field("buffer", buffer).finish()
            }
            Self::Swapchain(swapchain) => f
                .debug_struct("Swapchain")
                .field("image_count", &swapchain.image_count())
                .finish(),
        }
    }
}

/// Physical resource bound to an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalResource {
    Image(ImageHandle),
    Buffer(BufferHandle),
}

/// One logical resource participating in a frame.
#[derive(Debug)]
pub struct Attachment {
    name: String,
    source: AttachmentSource,
    /// Physical resource of a transient, bound between compile and release.
    pub(crate) transient: Option<PhysicalResource>,
    /// Descriptor a transient image was allocated with.
    pub(crate) resolved_image: Option<ImageDescriptor>,
    pub(crate) first_use: Option<PassAttachmentHandle>,
    pub(crate) last_use: Option<PassAttachmentHandle>,
    pub(crate) allocated_at: Option<PassHandle>,
    pub(crate) released_at: Option<PassHandle>,
    pub(crate) released: bool,
    /// State an imported resource was left in by the previous frame.
    pub(crate) state: ResourceState,
}

impl Attachment {
    fn new(name: String, source: AttachmentSource) -> Self {
        Self {
            name,
            source,
            transient: None,
            resolved_image: None,
            first_use: None,
            last_use: None,
            allocated_at: None,
            released_at: None,
            released: false,
            state: ResourceState::UNDEFINED,
        }
    }

    /// Debug name, unique among live attachments.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &AttachmentSource {
        &self.source
    }

    pub fn kind(&self) -> AttachmentKind {
        match self.source {
            AttachmentSource::TransientBuffer(_) | AttachmentSource::ImportedBuffer { .. } => {
                AttachmentKind::Buffer
            }
            _ => AttachmentKind::Image,
        }
    }

    pub fn lifetime(&self) -> AttachmentLifetime {
        match self.source {
            AttachmentSource::TransientImage(_) | AttachmentSource::TransientBuffer(_) => {
                AttachmentLifetime::Transient
            }
            _ => AttachmentLifetime::Persistent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.lifetime() == AttachmentLifetime::Transient
    }

    /// The bound swapchain, if this attachment wraps one.
    pub fn swapchain(&self) -> Option<&Arc<dyn Swapchain>> {
        match &self.source {
            AttachmentSource::Swapchain(swapchain) => Some(swapchain),
            _ => None,
        }
    }

    /// First use this frame.
    pub fn first_use(&self) -> Option<PassAttachmentHandle> {
        self.first_use
    }

    /// Last use this frame.
    pub fn last_use(&self) -> Option<PassAttachmentHandle> {
        self.last_use
    }

    /// Returns true if any pass uses the attachment this frame.
    pub fn is_used(&self) -> bool {
        self.first_use.is_some()
    }

    /// Pass at whose use the transient was allocated this frame.
    pub fn allocated_at(&self) -> Option<PassHandle> {
        self.allocated_at
    }

    /// Pass after whose use the transient was released this frame.
    pub fn released_at(&self) -> Option<PassHandle> {
        self.released_at
    }

    /// Returns true once a transient has been released this frame.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Physical resource at this moment.
    ///
    /// Swapchains resolve to their current image on every call. Transients
    /// resolve only between allocation and release.
    pub fn resource(&self) -> Option<PhysicalResource> {
        match &self.source {
            AttachmentSource::ImportedImage { image, .. } => Some(PhysicalResource::Image(*image)),
            AttachmentSource::ImportedBuffer { buffer, .. } => {
                Some(PhysicalResource::Buffer(*buffer))
            }
            AttachmentSource::Swapchain(swapchain) => {
                Some(PhysicalResource::Image(swapchain.current_image()))
            }
            AttachmentSource::TransientImage(_) | AttachmentSource::TransientBuffer(_) => {
                self.transient
            }
        }
    }

    /// Size of the image, once known.
    pub fn image_extent(&self) -> Option<Extent3d> {
        match &self.source {
            AttachmentSource::TransientImage(_) => self.resolved_image.map(|d| d.extent),
            AttachmentSource::ImportedImage { descriptor, .. } => Some(descriptor.extent),
            AttachmentSource::Swapchain(swapchain) => Some(swapchain.extent().into()),
            _ => None,
        }
    }

    pub(crate) fn reset_chain(&mut self) {
        self.first_use = None;
        self.last_use = None;
        self.allocated_at = None;
        self.released_at = None;
    }
}

/// Owns every attachment known to the scheduler.
#[derive(Debug, Default)]
pub struct AttachmentRegistry {
    attachments: SlotMap<AttachmentHandle, Attachment>,
    by_name: FxHashMap<String, AttachmentHandle>,
}

impl AttachmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, name: &str, source: AttachmentSource) -> AttachmentHandle {
        assert!(!name.is_empty(), "attachment name must not be empty");
        assert!(
            !self.by_name.contains_key(name),
            "attachment '{name}' is already registered"
        );
        let handle = self
            .attachments
            .insert(Attachment::new(name.to_string(), source));
        self.by_name.insert(name.to_string(), handle);
        handle
    }

    /// Register a caller-owned image.
    pub fn import_image(
        &mut self,
        name: &str,
        image: ImageHandle,
        descriptor: ImageDescriptor,
    ) -> AttachmentHandle {
        descriptor.validate();
        self.insert(name, AttachmentSource::ImportedImage { image, descriptor })
    }

    /// Register a caller-owned buffer.
    pub fn import_buffer(
        &mut self,
        name: &str,
        buffer: BufferHandle,
        descriptor: BufferDescriptor,
    ) -> AttachmentHandle {
        descriptor.validate();
        self.insert(name, AttachmentSource::ImportedBuffer { buffer, descriptor })
    }

    /// Register a swapchain.
    pub fn import_swapchain(
        &mut self,
        name: &str,
        swapchain: Arc<dyn Swapchain>,
    ) -> AttachmentHandle {
        assert!(
            swapchain.image_count() > 0,
            "swapchain '{name}' has no images"
        );
        self.insert(name, AttachmentSource::Swapchain(swapchain))
    }

    /// Register a graph-owned image.
    pub fn create_image(&mut self, name: &str, info: ImageCreateInfo) -> AttachmentHandle {
        info.validate();
        self.insert(name, AttachmentSource::TransientImage(info))
    }

    /// Register a graph-owned buffer.
    pub fn create_buffer(&mut self, name: &str, descriptor: BufferDescriptor) -> AttachmentHandle {
        descriptor.validate();
        self.insert(name, AttachmentSource::TransientBuffer(descriptor))
    }

    /// Remove an attachment.
    pub fn remove(&mut self, handle: AttachmentHandle) -> Option<Attachment> {
        let attachment = self.attachments.remove(handle)?;
        self.by_name.remove(&attachment.name);
        Some(attachment)
    }

    /// Look up an attachment by name.
    pub fn find(&self, name: &str) -> Option<AttachmentHandle> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, handle: AttachmentHandle) -> Option<&Attachment> {
        self.attachments.get(handle)
    }

    pub(crate) fn get_mut(&mut self, handle: AttachmentHandle) -> Option<&mut Attachment> {
        self.attachments.get_mut(handle)
    }

    pub fn contains(&self, handle: AttachmentHandle) -> bool {
        self.attachments.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    /// Iterate over all attachments.
    pub fn iter(&self) -> impl Iterator<Item = (AttachmentHandle, &Attachment)> {
        self.attachments.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (AttachmentHandle, &mut Attachment)> {
        self.attachments.iter_mut()
    }

    /// Handles of all transient attachments.
    pub fn transients(&self) -> Vec<AttachmentHandle> {
        self.attachments
            .iter()
            .filter(|(_, a)| a.is_transient())
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Drop every transient attachment. Returns how many were removed.
    pub(crate) fn remove_transients(&mut self) -> usize {
        let transients = self.transients();
        for handle in &transients {
            self.remove(*handle);
        }
        transients.len()
    }

    /// Forget last frame's use-chains of the remaining attachments.
    pub(crate) fn reset_chains(&mut self) {
        for (_, attachment) in self.attachments.iter_mut() {
            attachment.reset_chain();
        }
    }
}
