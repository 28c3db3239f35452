//! Frame glasses emulator binary.
//!
//! Runs a Lua script with a winit window and pixels surface, or headless
//! for a fixed time followed by a PNG screenshot.

use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use frame_emu::{EmuError, Emulator, Presenter, RenderConfig, ScriptState, capture, keymap};
use log::{debug, error, info, warn};
use pixels::{Pixels, SurfaceTexture};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

/// Frames between window title FPS refreshes.
const FPS_SAMPLE_FRAMES: u32 = 30;

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a Frame glasses Lua script")]
struct Cli {
    /// Lua script to run.
    script: PathBuf,

    /// JSON render settings. Flags below override individual fields.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Initial window size as a multiple of the display size.
    #[arg(long)]
    scale: Option<u32>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    fps: Option<u32>,

    /// Run without a window.
    #[arg(long)]
    headless: bool,

    /// Headless run time in milliseconds.
    #[arg(long, default_value_t = 1000)]
    run_ms: u64,

    /// Save the last presented frame as PNG when the run ends.
    #[arg(long)]
    screenshot: Option<PathBuf>,
}

impl Cli {
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)?,
            None => RenderConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(title) = &self.title {
            config.title.clone_from(title);
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Stand in for the transport: log and discard what the script sent.
fn echo_outbound(emulator: &Emulator) {
    for packet in emulator.take_outbound() {
        debug!("sent {} bytes: {}", packet.len(), String::from_utf8_lossy(&packet));
    }
}

// ---------------------------------------------------------------------------
// Headless mode
// ---------------------------------------------------------------------------

fn run_headless(cli: &Cli, mut emulator: Emulator) -> Result<()> {
    let mut presenter = emulator.presenter();
    let tick = emulator.config().frame_duration();
    let deadline = Instant::now() + Duration::from_millis(cli.run_ms);

    while Instant::now() < deadline {
        presenter.tick(emulator.host());
        echo_outbound(&emulator);
        if emulator.state() != ScriptState::Executing {
            break;
        }
        std::thread::sleep(tick);
    }
    emulator.stop();
    presenter.tick(emulator.host());
    echo_outbound(&emulator);

    let state = emulator.state();
    info!("headless run finished: {state:?}, {} commits", presenter.commits());

    if let Some(path) = &cli.screenshot {
        capture::save_screenshot(&presenter, path)
            .with_context(|| format!("saving screenshot to {}", path.display()))?;
    }
    if state == ScriptState::Errored {
        bail!(
            "script error: {}",
            emulator.last_error().unwrap_or("unknown error")
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Windowed mode
// ---------------------------------------------------------------------------

struct App {
    emulator: Emulator,
    presenter: Presenter,
    keys: keymap::KeyTracker,
    screenshot: Option<PathBuf>,
    window: Option<&'static Window>,
    pixels: Option<Pixels<'static>>,
    surface_size: (u32, u32),
    frame_duration: Duration,
    last_tick: Instant,
    fps_frames: u32,
    fps_since: Instant,
    fatal: Option<EmuError>,
}

impl App {
    fn new(emulator: Emulator, screenshot: Option<PathBuf>) -> Self {
        let presenter = emulator.presenter();
        let frame_duration = emulator.config().frame_duration();
        let now = Instant::now();
        Self {
            emulator,
            presenter,
            keys: keymap::KeyTracker::new(),
            screenshot,
            window: None,
            pixels: None,
            surface_size: (0, 0),
            frame_duration,
            last_tick: now,
            fps_frames: 0,
            fps_since: now,
            fatal: None,
        }
    }

    /// Record a fatal graphics error and leave the event loop.
    fn fail(&mut self, event_loop: &ActiveEventLoop, message: String) {
        self.fatal = Some(EmuError::GraphicsContext(message));
        event_loop.exit();
    }

    fn handle_key(&mut self, keycode: KeyCode, pressed: bool) {
        if let Some((name, down)) = self.keys.update(keycode, pressed) {
            self.emulator.set_key(name, down);
        }
    }

    fn resize(&mut self, event_loop: &ActiveEventLoop, width: u32, height: u32) {
        // Minimised windows report zero; keep the last surface.
        if width == 0 || height == 0 {
            return;
        }
        let Some(pixels) = self.pixels.as_mut() else {
            return;
        };
        if let Err(e) = pixels.resize_surface(width, height) {
            self.fail(event_loop, format!("failed to resize surface: {e}"));
            return;
        }
        if let Err(e) = pixels.resize_buffer(width, height) {
            self.fail(event_loop, format!("failed to resize buffer: {e}"));
            return;
        }
        self.surface_size = (width, height);
    }

    fn update_title(&mut self) {
        self.fps_frames += 1;
        if self.fps_frames < FPS_SAMPLE_FRAMES {
            return;
        }
        let elapsed = self.fps_since.elapsed().as_secs_f64();
        if let Some(window) = self.window {
            let fps = f64::from(self.fps_frames) / elapsed.max(f64::EPSILON);
            window.set_title(&format!("{} - {fps:.0} fps", self.emulator.config().title));
        }
        self.fps_frames = 0;
        self.fps_since = Instant::now();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= self.frame_duration {
            self.presenter.tick(self.emulator.host());
            echo_outbound(&self.emulator);
            self.last_tick = now;
            self.update_title();
        }

        let (width, height) = self.surface_size;
        let Some(pixels) = self.pixels.as_mut() else {
            return;
        };
        self.presenter.render(pixels.frame_mut(), width, height);
        if let Err(e) = pixels.render() {
            self.fail(event_loop, format!("render error: {e}"));
        }
    }

    fn shut_down(&mut self) {
        self.emulator.stop();
        self.presenter.tick(self.emulator.host());
        if let Some(path) = self.screenshot.take() {
            if let Err(e) = capture::save_screenshot(&self.presenter, &path) {
                warn!("failed to save screenshot to {}: {e}", path.display());
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let config = self.emulator.config();
        let (width, height) = config.window_size();
        let attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height))
            .with_min_inner_size(winit::dpi::PhysicalSize::new(1, 1));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => window,
            Err(e) => {
                self.fail(event_loop, format!("failed to create window: {e}"));
                return;
            }
        };
        // The window lives until process exit.
        let window: &'static Window = Box::leak(Box::new(window));
        let inner = window.inner_size();
        let surface = SurfaceTexture::new(inner.width, inner.height, window);
        match Pixels::new(inner.width.max(1), inner.height.max(1), surface) {
            Ok(pixels) => {
                self.pixels = Some(pixels);
                self.surface_size = (inner.width.max(1), inner.height.max(1));
            }
            Err(e) => {
                self.fail(event_loop, format!("failed to create graphics context: {e}"));
                return;
            }
        }
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.resize(event_loop, size.width, size.height);
            }
            WindowEvent::Focused(false) => {
                self.keys.clear();
                self.emulator.host().release_all_keys();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    if keycode == KeyCode::Escape && event.state == ElementState::Pressed {
                        event_loop.exit();
                        return;
                    }
                    self.handle_key(keycode, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shut_down();
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn run(cli: &Cli) -> Result<()> {
    let config = cli.render_config()?;
    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("reading {}", cli.script.display()))?;
    let name = cli
        .script
        .file_name()
        .map_or_else(|| "main.lua".to_string(), |n| n.to_string_lossy().into_owned());

    let mut emulator = Emulator::new(config)?;
    emulator.load_named(&name, &source)?;
    emulator.start()?;
    info!("running {}", cli.script.display());

    if cli.headless {
        return run_headless(cli, emulator);
    }

    let event_loop = EventLoop::new().context("creating event loop")?;
    let mut app = App::new(emulator, cli.screenshot.clone());
    event_loop.run_app(&mut app).context("event loop")?;
    match app.fatal.take() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        error!("{e:#}");
        process::exit(1);
    }
}
