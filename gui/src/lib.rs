//! Window that watches two agents play: the board on the left, moves and
//! commentary on the right. The match runs on a worker thread and reaches the
//! event loop only as snapshots.

mod board;
mod panel;
mod renderer;
mod text_renderer;

use board::{BoardRenderer, Layout};
use chess_agents::{MatchResult, Presenter, TurnOrchestrator};
use chess_core::Color;
use panel::{GuiEvent, GuiPresenter, PanelState};
use renderer::Renderer;
use std::error::Error as StdError;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use text_renderer::TextRenderer;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

#[derive(Debug, Error)]
pub enum GuiError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("could not open window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("could not create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter")]
    NoAdapter,
    #[error("surface supports no texture format")]
    NoSurfaceFormat,
    #[error("could not open graphics device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Supplies matches to the window and receives them back when they end.
pub trait MatchHost: Send + Sync + 'static {
    fn new_match(&self) -> Result<TurnOrchestrator, Box<dyn StdError + Send + Sync>>;

    /// Called on the match thread once the result is known.
    fn match_finished(&self, orchestrator: &TurnOrchestrator, result: &MatchResult);
}

struct RunningMatch {
    stop: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl RunningMatch {
    /// Plays the match on its own thread. The host sees the result before
    /// `ready` runs, so outputs are saved before a new match can start.
    fn spawn<H, P, F>(
        mut orchestrator: TurnOrchestrator,
        host: Arc<H>,
        mut presenter: P,
        ready: F,
    ) -> io::Result<Self>
    where
        H: MatchHost,
        P: Presenter + Send + 'static,
        F: FnOnce(P) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name("match".to_string())
            .spawn(move || {
                let result = orchestrator.run(&mut presenter, &flag);
                host.match_finished(&orchestrator, &result);
                ready(presenter);
            })?;
        Ok(Self { stop, worker })
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Blocks until the match thread has saved its outputs and exited.
    fn join(self) {
        if !self.worker.is_finished() {
            info!("waiting for the current turn to finish");
        }
        if self.worker.join().is_err() {
            error!("match thread panicked");
        }
    }
}

struct ChessGui<H: MatchHost> {
    window: Arc<Window>,
    renderer: Renderer,
    board: BoardRenderer,
    text: TextRenderer,
    panel: PanelState,
    host: Arc<H>,
    proxy: EventLoopProxy<GuiEvent>,
    current: Option<RunningMatch>,
}

impl<H: MatchHost> ChessGui<H> {
    async fn new(
        window: Arc<Window>,
        host: H,
        proxy: EventLoopProxy<GuiEvent>,
    ) -> Result<Self, GuiError> {
        let renderer = Renderer::new(Arc::clone(&window)).await?;
        let text = TextRenderer::new(&renderer.device, &renderer.queue, renderer.config.format);

        Ok(Self {
            window,
            renderer,
            board: BoardRenderer::new(),
            text,
            panel: PanelState::new(),
            host: Arc::new(host),
            proxy,
            current: None,
        })
    }

    fn start_match(&mut self) {
        if self.panel.is_running() {
            self.panel
                .notice("A match is still running. Press Escape to stop it.".to_string());
            self.window.request_redraw();
            return;
        }
        // The previous worker has already reported back; reap it.
        self.join_match();

        let orchestrator = match self.host.new_match() {
            Ok(orchestrator) => orchestrator,
            Err(err) => {
                error!("could not set up match: {err}");
                self.panel.notice(format!("could not set up match: {err}"));
                return;
            }
        };

        self.panel.start(
            orchestrator.agent_name(Color::White),
            orchestrator.agent_name(Color::Black),
            orchestrator.game().current_position(),
        );

        let spawned = RunningMatch::spawn(
            orchestrator,
            Arc::clone(&self.host),
            GuiPresenter::new(self.proxy.clone()),
            |presenter| presenter.ready(),
        );

        match spawned {
            Ok(running) => {
                info!("match started");
                self.current = Some(running);
            }
            Err(err) => {
                error!("could not start match thread: {err}");
                self.panel.apply(GuiEvent::Finished(format!("could not start match: {err}")));
                self.panel.apply(GuiEvent::Ready);
            }
        }
        self.window.request_redraw();
    }

    fn stop_match(&mut self) {
        if let Some(running) = &self.current {
            running.stop();
            self.panel.stopping();
            self.window.request_redraw();
        }
    }

    fn join_match(&mut self) {
        if let Some(running) = self.current.take() {
            running.join();
        }
    }

    fn render_frame(&mut self) {
        let size = self.window.inner_size();
        let layout = Layout::new(size.width as f32, size.height as f32);

        let vertices = self.board.generate_vertices(&layout, self.panel.highlights());
        self.renderer.update_vertices(vertices);
        self.text
            .prepare(&self.renderer.device, &self.renderer.queue, &layout, &self.panel);

        let (output, view, mut encoder) = match self.renderer.begin_frame() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.renderer.resize(size);
                return;
            }
            Err(err) => {
                warn!("skipping frame: {err}");
                return;
            }
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Board Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.08,
                            g: 0.08,
                            b: 0.09,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.renderer.render_pipeline);
            pass.set_vertex_buffer(0, self.renderer.vertex_buffer.slice(..));
            pass.draw(0..self.renderer.num_vertices, 0..1);
            self.text.render(&mut pass);
        }

        self.renderer.submit_frame(encoder, output);
        self.text.trim();
    }
}

/// Opens the window, starts the first match and blocks until it is closed.
/// Enter starts a new match once the current one is over; Escape stops it
/// after the turn in progress.
pub fn run<H: MatchHost>(host: H) -> Result<(), GuiError> {
    let event_loop = EventLoopBuilder::<GuiEvent>::with_user_event().build()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("LLM Chess")
            .with_inner_size(LogicalSize::new(1280.0, 800.0))
            .build(&event_loop)?,
    );

    let mut gui = pollster::block_on(ChessGui::new(
        Arc::clone(&window),
        host,
        event_loop.create_proxy(),
    ))?;
    gui.start_match();

    event_loop.run(|event, target| {
        target.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(update) => {
                gui.panel.apply(update);
                gui.window.request_redraw();
            }
            Event::WindowEvent { event, window_id } if window_id == gui.window.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        gui.stop_match();
                        gui.window.set_visible(false);
                        target.exit();
                    }
                    WindowEvent::Resized(size) => {
                        gui.renderer.resize(size);
                        gui.window.request_redraw();
                    }
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                logical_key,
                                state: ElementState::Pressed,
                                repeat: false,
                                ..
                            },
                        ..
                    } => match logical_key {
                        Key::Named(NamedKey::Enter) => gui.start_match(),
                        Key::Named(NamedKey::Escape) => gui.stop_match(),
                        _ => {}
                    },
                    WindowEvent::RedrawRequested => gui.render_frame(),
                    _ => {}
                }
            }
            _ => {}
        }
    })?;

    gui.join_match();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_agents::{HistoryEntry, OrchestratorConfig, RandomAgent, TurnError};
    use chess_core::{GameOutcome, Position};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingHost {
        finished: Mutex<Vec<String>>,
    }

    impl MatchHost for RecordingHost {
        fn new_match(&self) -> Result<TurnOrchestrator, Box<dyn StdError + Send + Sync>> {
            let config = OrchestratorConfig {
                move_delay: Duration::from_millis(20),
                max_moves: None,
                ..OrchestratorConfig::default()
            };
            Ok(TurnOrchestrator::new(
                Box::new(RandomAgent::seeded(1)),
                Box::new(RandomAgent::seeded(2)),
                config,
            ))
        }

        fn match_finished(&self, _orchestrator: &TurnOrchestrator, result: &MatchResult) {
            self.finished.lock().unwrap().push(result.result_string());
        }
    }

    struct Silent;

    impl Presenter for Silent {
        fn render(&mut self, _: &Position, _: &[HistoryEntry], _: GameOutcome) {}
        fn report(&mut self, _: &TurnError) {}
        fn finish(&mut self, _: &MatchResult) {}
    }

    #[test]
    fn test_stopped_match_is_saved_before_join_returns() {
        let host = Arc::new(RecordingHost::default());
        let orchestrator = host.new_match().unwrap();

        let ready_host = Arc::clone(&host);
        let saved_before_ready = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&saved_before_ready);
        let running = RunningMatch::spawn(orchestrator, Arc::clone(&host), Silent, move |_| {
            let saved = ready_host.finished.lock().unwrap().len() == 1;
            flag.store(saved, Ordering::SeqCst);
        })
        .unwrap();

        running.stop();
        running.join();

        assert_eq!(host.finished.lock().unwrap().as_slice(), ["*"]);
        assert!(saved_before_ready.load(Ordering::SeqCst));
    }
}
