use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use vitrine_engine::paint::Color;
use vitrine_engine::texture::normalize_path;
use vitrine_engine::time::FrameStats;
use vitrine_engine::{FrameStatus, LoadOutcome, RendererConfig, WgpuRenderer};

/// Idle interval while nothing is visible.
const HIDDEN_POLL: Duration = Duration::from_millis(10);

/// Studio window and renderer configuration.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub clear: Color,
    pub renderer: RendererConfig,
    /// Images loaded once the window exists.
    pub images: Vec<PathBuf>,
    pub fps_log_interval: Duration,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            title: "vitrine studio".to_string(),
            initial_size: LogicalSize::new(1280.0, 800.0),
            clear: Color::DEFAULT_CLEAR,
            renderer: RendererConfig::default(),
            images: Vec::new(),
            fps_log_interval: Duration::from_secs(2),
        }
    }
}

/// Runs the event loop until the window closes.
pub fn run(config: StudioConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    let mut state = StudioState::new(config);

    event_loop
        .run_app(&mut state)
        .context("winit event loop terminated with error")?;

    state.error.map_or(Ok(()), Err)
}

#[self_referencing]
struct WindowEntry {
    stats: FrameStats,
    last_fps_log: Instant,
    minimized: bool,

    window: Window,

    #[borrows(window)]
    #[covariant]
    renderer: WgpuRenderer<'this>,
}

struct StudioState {
    config: StudioConfig,
    entry: Option<WindowEntry>,
    error: Option<anyhow::Error>,
}

impl StudioState {
    fn new(config: StudioConfig) -> Self {
        Self {
            config,
            entry: None,
            error: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let renderer_config = self.config.renderer.clone();

        let mut entry = WindowEntryTryBuilder {
            stats: FrameStats::default(),
            last_fps_log: Instant::now(),
            minimized: false,
            window,
            renderer_builder: |w| WgpuRenderer::for_window(w, &renderer_config),
        }
        .try_build()?;

        for path in &self.config.images {
            entry.with_renderer_mut(|r| load_image(r, path));
        }

        entry.with_window(|w| w.request_redraw());
        self.entry = Some(entry);
        Ok(())
    }

    /// Drains the GPU, releases every resource, then drops the window.
    fn close(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut entry) = self.entry.take() {
            entry.with_renderer_mut(|r| {
                r.wait_for_last_submitted_frame();
                r.shutdown();
            });
        }
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        self.close(event_loop);
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        entry.with_mut(|fields| {
            // Minimized windows report a zero size; the swap chain is left alone.
            if size.width == 0 || size.height == 0 {
                *fields.minimized = true;
                fields.stats.reset();
                return;
            }
            *fields.minimized = false;

            if let Err(err) = fields.renderer.resize_buffers(size.width, size.height) {
                log::error!("resize to {}x{} failed: {err}", size.width, size.height);
            }
            fields.window.request_redraw();
        });
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(entry) = self.entry.as_mut() else {
            return Ok(());
        };
        let clear = self.config.clear;
        let interval = self.config.fps_log_interval;

        entry.with_mut(|fields| {
            if *fields.minimized {
                return Ok(());
            }

            let status = fields
                .renderer
                .render(clear, |_, _, _| {})
                .context("frame rendering failed")?;

            match status {
                FrameStatus::Presented => fields.stats.tick(),
                FrameStatus::Occluded | FrameStatus::Skipped => {}
            }

            if fields.last_fps_log.elapsed() >= interval {
                *fields.last_fps_log = Instant::now();
                if let (Some(fps), Some(avg)) = (fields.stats.fps(), fields.stats.average_frame_time()) {
                    log::info!(
                        "{fps:.1} fps ({:.2} ms/frame), {} images loaded",
                        avg.as_secs_f64() * 1000.0,
                        fields.renderer.textures().len()
                    );
                }
            }
            Ok(())
        })
    }

    fn is_hidden(&self) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|e| e.with_minimized(|m| *m) || e.with_renderer(|r| r.is_occluded()))
    }
}

impl ApplicationHandler for StudioState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(err) = self.create_window_entry(event_loop) {
            self.fail(event_loop, err.context("failed to create studio window"));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(entry) = self.entry.as_ref() else {
            return;
        };

        if self.is_hidden() {
            // Retry after a short sleep instead of spinning on a hidden surface.
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + HIDDEN_POLL));
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn new_events(&mut self, _event_loop: &ActiveEventLoop, cause: StartCause) {
        if let (StartCause::ResumeTimeReached { .. }, Some(entry)) = (cause, self.entry.as_ref()) {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.close(event_loop),

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                self.close(event_loop);
            }

            WindowEvent::Resized(size) => self.resize(size),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.entry.as_ref().map(|e| e.with_window(|w| w.inner_size())) {
                    self.resize(size);
                }
            }

            WindowEvent::DroppedFile(path) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_renderer_mut(|r| load_image(r, &path));
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.redraw() {
                    self.fail(event_loop, err);
                }
            }

            _ => {}
        }
    }
}

fn load_image(renderer: &mut WgpuRenderer<'_>, path: &Path) {
    match renderer.request_load(path) {
        Ok(LoadOutcome::Loaded) => {
            let key = normalize_path(path);
            if let Some(info) = renderer.textures().iter().find(|i| Some(i.path) == key.as_deref()) {
                log::info!(
                    "{}: {}x{}, shown at {:.0}x{:.0}, handle {:#x}",
                    info.path.display(),
                    info.width,
                    info.height,
                    info.display_size.0,
                    info.display_size.1,
                    info.display_handle.0
                );
            }
        }
        Ok(LoadOutcome::AlreadyLoaded) => log::debug!("{} already loaded", path.display()),
        Ok(LoadOutcome::Ignored) => {}
        Err(err) => log::error!("could not load {}: {:#}", path.display(), anyhow::Error::new(err)),
    }
}
