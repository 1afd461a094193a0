//! Common utilities for frame scheduler integration tests.
//!
//! Every test runs against the dummy backend, which records submissions and
//! tracks object lifetimes so tests can inspect what the scheduler did.

use std::sync::Arc;

use redlilium_rhi::backend::dummy::{RecordedCommand, SubmitRecord};
use redlilium_rhi::{
    AttachmentHandle, ClearValue, DummyBackend, DummySwapchain, Extent2d, Format, FrameScheduler,
    ImageCreateInfo, ImageUsage, ImageUseInfo, PassHandle, QueueType, SchedulerConfig,
    SwapchainCreateInfo,
};

/// Frame extent used by default in tests.
pub const FRAME_EXTENT: Extent2d = Extent2d::new(1600, 1200);

/// Opaque black.
pub const BLACK: ClearValue = ClearValue::color(0.0, 0.0, 0.0, 1.0);

/// Route `log` output to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scheduler, backend and a swapchain imported as "Output".
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub swapchain: Arc<DummySwapchain>,
    pub output: AttachmentHandle,
    pub scheduler: FrameScheduler,
}

impl TestContext {
    /// Create a context with the default configuration and a 1600x1200 frame.
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default().with_frame_extent(FRAME_EXTENT))
    }

    /// Create a context with a custom configuration.
    pub fn with_config(config: SchedulerConfig) -> Self {
        init_logging();
        Self::with_backend(Arc::new(DummyBackend::new()), config)
    }

    /// Create a context on top of an existing backend.
    pub fn with_backend(backend: Arc<DummyBackend>, config: SchedulerConfig) -> Self {
        let swapchain = Arc::new(
            DummySwapchain::new(
                backend.clone(),
                SwapchainCreateInfo::new(3, Format::Bgra8Unorm, config.frame_extent),
            )
            .expect("swapchain creation"),
        );
        let mut scheduler =
            FrameScheduler::new(backend.clone(), config).expect("scheduler creation");
        let output = scheduler.import_swapchain("Output", swapchain.clone());
        Self {
            backend,
            swapchain,
            output,
            scheduler,
        }
    }

    /// Submissions recorded by the backend since the last clear.
    #[allow(dead_code)]
    pub fn submissions(&self) -> Vec<SubmitRecord> {
        self.backend.submissions()
    }

    /// Run a whole frame, recording passes through `record`.
    #[allow(dead_code)]
    pub fn frame<R>(&mut self, record: impl FnOnce(&mut FrameScheduler, AttachmentHandle) -> R) -> R {
        self.scheduler.begin().expect("begin");
        let result = record(&mut self.scheduler, self.output);
        self.scheduler.compile().expect("compile");
        self.scheduler.end().expect("end");
        result
    }
}

/// Record a graphics pass writing `output` and submit it.
#[allow(dead_code)]
pub fn present_pass(scheduler: &mut FrameScheduler, output: AttachmentHandle) -> PassHandle {
    let pass = scheduler.create_pass("present", QueueType::Graphics);
    scheduler.use_image(pass, output, ImageUseInfo::color_output(BLACK));
    scheduler.submit(pass);
    pass
}

/// Color target sized to the render target, sampleable.
pub fn color_target() -> ImageCreateInfo {
    ImageCreateInfo::render_target(
        Format::Rgba8Unorm,
        ImageUsage::COLOR_ATTACHMENT | ImageUsage::SAMPLED,
    )
}

/// Depth target sized to the render target.
#[allow(dead_code)]
pub fn depth_target() -> ImageCreateInfo {
    ImageCreateInfo::render_target(
        Format::Depth32Float,
        ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::SAMPLED,
    )
}

/// Storage image usable from compute passes.
#[allow(dead_code)]
pub fn storage_target() -> ImageCreateInfo {
    ImageCreateInfo::render_target(
        Format::Rgba16Float,
        ImageUsage::STORAGE | ImageUsage::SAMPLED | ImageUsage::COLOR_ATTACHMENT,
    )
}

/// Every command of a submission that is a pipeline barrier.
#[allow(dead_code)]
pub fn barrier_commands(record: &SubmitRecord) -> usize {
    record
        .commands
        .iter()
        .filter(|command| matches!(command, RecordedCommand::PipelineBarrier(_)))
        .count()
}
