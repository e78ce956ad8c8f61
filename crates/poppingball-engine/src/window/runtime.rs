use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::coords::SurfaceSize;
use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::DeviceInit;
use crate::event::platform::winit::translate_window_event;
use crate::event::{EventQueue, HostEvent, Modifiers};
use crate::render::WgpuRenderer;
use crate::time::{FpsCounter, FrameClock, FrameTime};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub resizable: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "PoppingBall".to_string(),
            initial_size: LogicalSize::new(1024.0, 1024.0),
            resizable: true,
        }
    }
}

/// Runtime context passed to the application.
///
/// Requests are applied after the current callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    exit: bool,
}

impl RuntimeCtx {
    pub fn exit(&mut self) {
        self.exit = true;
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window, creates its renderer and drives `app` until exit.
    pub fn run<A>(config: RuntimeConfig, init: DeviceInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    events: EventQueue,
    modifiers: Modifiers,
    clock: FrameClock,
    fps: FpsCounter,

    window: Window,

    #[borrows(window)]
    #[not_covariant]
    renderer: WgpuRenderer<'this>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    init: DeviceInit,
    app: A,

    entry: Option<WindowEntry>,
    exit_requested: bool,

    /// Startup error reported from `Runtime::run` once the loop returns.
    failure: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, init: DeviceInit, app: A) -> Self {
        Self {
            config,
            init,
            app,
            entry: None,
            exit_requested: false,
            failure: None,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        self.close_window();
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size)
            .with_resizable(self.config.resizable);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let size = SurfaceSize::from(window.inner_size());
        let init = self.init.clone();

        let mut entry = WindowEntryTryBuilder {
            events: EventQueue::new(),
            modifiers: Modifiers::default(),
            clock: FrameClock::default(),
            fps: FpsCounter::default(),
            window,
            renderer_builder: |w| WgpuRenderer::create(w, size, init),
        }
        .try_build()
        .context("failed to create renderer")?;

        let app = &mut self.app;
        entry
            .with_mut(|fields| app.on_start(fields.renderer))
            .context("application startup failed")?;

        entry.with_window(|w| w.request_redraw());
        self.entry = Some(entry);
        Ok(())
    }

    /// Lets the app drop its geometry, then releases the renderer and window.
    fn close_window(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            self.app.on_exit();
            entry.with_mut(|fields| fields.renderer.release());
        }
    }

    fn redraw(&mut self, window_id: WindowId) -> AppControl {
        let (app, entry) = (&mut self.app, &mut self.entry);
        let Some(entry) = entry.as_mut() else {
            return AppControl::Continue;
        };

        let mut runtime_ctx = RuntimeCtx::default();
        let mut control = AppControl::Continue;

        entry.with_mut(|fields| {
            for event in fields.events.drain() {
                if let HostEvent::ScaleFactorChanged(_) = event {
                    let size = SurfaceSize::from(fields.window.inner_size());
                    fields.renderer.resize(size);
                    continue;
                }
                if fields.renderer.handle_event(&event) {
                    continue;
                }
                if app.on_event(&event) == AppControl::Exit {
                    control = AppControl::Exit;
                }
            }
            if control == AppControl::Exit {
                return;
            }

            let ft: FrameTime = fields.clock.tick();
            let fps = fields.fps.record(ft.dt);

            let mut ctx = FrameCtx {
                window: WindowCtx {
                    id: window_id,
                    window: fields.window,
                },
                renderer: fields.renderer,
                time: ft,
                fps,
                runtime: &mut runtime_ctx,
            };
            control = app.on_frame(&mut ctx);
        });

        if runtime_ctx.exit {
            control = AppControl::Exit;
        }
        control
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.exit_requested {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("{e:#}");
            self.failure = Some(e);
            self.request_exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Continuous redraw: the scene animates every frame.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(entry) = &self.entry {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.request_exit(event_loop);
                return;
            }

            WindowEvent::RedrawRequested => {
                if self.redraw(window_id) == AppControl::Exit {
                    self.request_exit(event_loop);
                }
                return;
            }

            _ => {}
        }

        let Some(entry) = self.entry.as_mut() else {
            return;
        };

        entry.with_mut(|fields| {
            let scale = fields.window.scale_factor();
            let Some(ev) = translate_window_event(scale, *fields.modifiers, &event) else {
                return;
            };

            if let HostEvent::ModifiersChanged(m) = &ev {
                *fields.modifiers = *m;
            }
            if matches!(ev, HostEvent::Resized(_)) {
                fields.window.request_redraw();
            }
            fields.events.push(ev);
        });
    }
}
