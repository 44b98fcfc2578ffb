use std::{path::PathBuf, sync::Arc};

use log::{error, info, trace};
use radiant_core::RendererConfig;
use radiant_renderer::{FrameOutcome, FrameRenderer, GpuContext, RenderError};
use radiant_scene::{GltfScene, SceneError};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError, unbounded_channel};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to start the IO runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("scene loader stopped without delivering a scene")]
    LoaderGone,
}

type SceneResult = Result<GltfScene, SceneError>;

// The state machine that holds the renderer while waiting for the OS
struct RadiantRunner {
    scene_path: PathBuf,
    config: RendererConfig,
    io_runtime: tokio::runtime::Runtime,
    window: Option<Arc<Window>>,
    renderer: Option<FrameRenderer>,
    /// Pending scene import; `None` once the scene is bound.
    loader: Option<UnboundedReceiver<SceneResult>>,
    error: Option<RunError>,
}

impl RadiantRunner {
    fn new(scene_path: PathBuf, config: RendererConfig, io_runtime: tokio::runtime::Runtime) -> Self {
        Self {
            scene_path,
            config,
            io_runtime,
            window: None,
            renderer: None,
            loader: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RunError> {
        let title = match self.scene_path.file_name() {
            Some(name) => format!("Radiant: {}", name.to_string_lossy()),
            None => "Radiant".to_string(),
        };
        let window = Arc::new(event_loop.create_window(Window::default_attributes().with_title(title))?);
        let size = window.inner_size();

        let gpu = pollster::block_on(GpuContext::new(Arc::clone(&window), size.width, size.height))?;
        self.renderer = Some(FrameRenderer::new(gpu, self.config.clone()));
        self.window = Some(window);

        self.start_loading();
        Ok(())
    }

    /// Imports the scene on the IO runtime; the result is picked up in
    /// `about_to_wait`.
    fn start_loading(&mut self) {
        let (tx, rx) = unbounded_channel::<SceneResult>();
        let path = self.scene_path.clone();
        info!("Loading scene {:?}", path);

        self.io_runtime.spawn(async move {
            match tokio::task::spawn_blocking(move || GltfScene::load(&path)).await {
                Ok(result) => {
                    let _ = tx.send(result);
                }
                Err(e) => error!("Scene loader task failed: {e}"),
            }
        });
        self.loader = Some(rx);
    }

    fn bind_scene(&mut self, scene: GltfScene) -> Result<(), RunError> {
        if let Some(renderer) = &mut self.renderer {
            renderer.setup_scene(Box::new(scene))?;
        }
        // Redraws only start once the scene is bound.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: RunError) {
        error!("{e}");
        self.error = Some(e);
        event_loop.exit();
    }
}

impl ApplicationHandler for RadiantRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(loader) = &mut self.loader else {
            return;
        };
        let received = match loader.try_recv() {
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err(RunError::LoaderGone),
            Ok(result) => result.map_err(RunError::from),
        };
        self.loader = None;

        if let Err(e) = received.and_then(|scene| self.bind_scene(scene)) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: winit::window::WindowId, event: WindowEvent) {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            }
            | WindowEvent::CloseRequested => {
                info!("Close requested; stopping");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(renderer) = &mut self.renderer else {
                    return;
                };
                match renderer.draw() {
                    FrameOutcome::Rendered(stats) => trace!("{stats:?}"),
                    FrameOutcome::Skipped(reason) => trace!("Frame skipped: {reason:?}"),
                }

                // Request next frame
                if self.loader.is_none() {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
            }
            _ => (),
        }
    }
}

/// Opens a window, loads `scene_path` off the render thread and renders it
/// until the window closes.
pub fn run(scene_path: PathBuf, config: RendererConfig) -> Result<(), RunError> {
    // Dedicated IO pool for scene import
    let io_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("radiant-io")
        .build()
        .map_err(RunError::Runtime)?;

    let event_loop = EventLoop::new()?;

    // ControlFlow::Poll keeps checking the loader between redraws.
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = RadiantRunner::new(scene_path, config, io_runtime);
    event_loop.run_app(&mut runner)?;

    match runner.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
