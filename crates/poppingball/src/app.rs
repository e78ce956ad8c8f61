use poppingball_engine::core::{App, AppControl, FrameCtx};
use poppingball_engine::device::wgpu_backend::WgpuGeometry;
use poppingball_engine::event::{HostEvent, Key};
use poppingball_engine::render::{mesh, GeometryBuffer, ShaderDesc, WgpuRenderer};

use crate::ball::BallManager;

const CIRCLE_SEGMENTS: u32 = 48;
const INITIAL_BALLS: usize = 8;

/// Frames between window title refreshes.
const TITLE_INTERVAL: u64 = 30;

pub struct PoppingBall {
    balls: BallManager,
    circle: Option<GeometryBuffer<WgpuGeometry>>,
}

impl PoppingBall {
    pub fn new(balls: BallManager) -> Self {
        Self {
            balls,
            circle: None,
        }
    }
}

impl App for PoppingBall {
    fn on_start(&mut self, renderer: &mut WgpuRenderer<'_>) -> anyhow::Result<()> {
        renderer.create_shader(&ShaderDesc::builtin())?;
        renderer.create_constant_buffer()?;
        self.circle = Some(renderer.create_geometry(&mesh::circle(CIRCLE_SEGMENTS))?);

        for _ in 0..INITIAL_BALLS {
            self.balls.add_ball();
        }
        log::info!(
            "ready: {} balls (up/+ adds, down/- removes, esc quits)",
            self.balls.len()
        );
        Ok(())
    }

    fn on_event(&mut self, event: &HostEvent) -> AppControl {
        if event.is_key_press(Key::Escape) {
            return AppControl::Exit;
        }
        if event.is_key_press(Key::ArrowUp) || event.is_key_press(Key::Plus) {
            self.balls.add_ball();
        } else if event.is_key_press(Key::ArrowDown) || event.is_key_press(Key::Minus) {
            self.balls.remove_ball();
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.balls.step(ctx.time.dt);

        if ctx.time.frame_index % TITLE_INTERVAL == 0 {
            ctx.window.set_title(&format!(
                "PoppingBall - {} balls - {:.0} fps",
                self.balls.len(),
                ctx.fps
            ));
        }

        let Some(circle) = &self.circle else {
            return AppControl::Continue;
        };
        let balls = &self.balls;

        ctx.render(|frame| {
            frame.prepare_shader()?;
            for ball in balls.iter() {
                frame.draw_object(ball, circle)?;
            }
            Ok(())
        })
    }

    fn on_exit(&mut self) {
        self.circle = None;
    }
}
