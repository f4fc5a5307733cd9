//! Background HUD rasterization.
//!
//! The render thread publishes the latest [`HudState`] and picks up the latest
//! finished bitmap; neither side ever blocks on the other. Both directions use
//! capacity-1 channels with overwrite-latest semantics: a sender drops the stale
//! value before publishing, so a slot only ever holds the most recent value and
//! a receiver never sees a half-drawn frame.
//!
//! Pointer button changes travel separately on an unbounded queue, so a press
//! and release that land between two HUD frames still reach the pause menu as
//! a click.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use image::RgbaImage;

use crate::controls::Pointer;
use crate::error::HudError;
use crate::overlay::{HudState, draw_hud};
use crate::pause::{PauseAction, PauseScreen};

/// Sleep while there is nothing to draw.
pub const DEFAULT_IDLE_SLEEP: Duration = Duration::from_millis(100);
/// Minimum time between two drawn frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Replace whatever `rx` still holds with `value`.
fn publish_latest<T>(tx: &Sender<T>, rx: &Receiver<T>, value: T) {
    while rx.try_recv().is_ok() {}
    // The slot was just drained; a failure means the receiving side is gone.
    let _ = tx.try_send(value);
}

/// Owns the HUD thread and both handoff slots.
pub struct HudWorker {
    state_tx: Sender<HudState>,
    state_drain: Receiver<HudState>,
    frame_rx: Receiver<RgbaImage>,
    action_rx: Receiver<PauseAction>,
    edge_tx: Sender<Pointer>,
    last_pressed: bool,
    disposed: Arc<AtomicBool>,
    frames_drawn: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
    latest: Option<RgbaImage>,
}

impl HudWorker {
    /// Start the HUD thread.
    pub fn spawn(idle_sleep: Duration) -> Result<Self, HudError> {
        let (state_tx, state_rx) = bounded::<HudState>(1);
        let (frame_tx, frame_rx) = bounded::<RgbaImage>(1);
        let (action_tx, action_rx) = unbounded::<PauseAction>();
        let (edge_tx, edge_rx) = unbounded::<Pointer>();
        let disposed = Arc::new(AtomicBool::new(false));
        let frames_drawn = Arc::new(AtomicU64::new(0));

        let thread_disposed = Arc::clone(&disposed);
        let thread_frames = Arc::clone(&frames_drawn);
        let thread_state_rx = state_rx.clone();
        let frame_drain = frame_rx.clone();

        let handle = std::thread::Builder::new()
            .name("hud-raster".into())
            .spawn(move || {
                tracing::info!("HUD worker started");
                let mut state = HudState::default();
                let mut pause: Option<PauseScreen> = None;

                while !thread_disposed.load(Ordering::Acquire) {
                    let wait = if state.wants_frame() {
                        FRAME_INTERVAL
                    } else {
                        idle_sleep
                    };
                    match thread_state_rx.recv_timeout(wait) {
                        Ok(next) => state = next,
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                    let edges: Vec<Pointer> = edge_rx.try_iter().collect();
                    if thread_disposed.load(Ordering::Acquire) || !state.wants_frame() {
                        continue;
                    }

                    if state.paused && pause.is_none() {
                        match PauseScreen::new(state.width, state.height) {
                            Ok(screen) => pause = Some(screen),
                            Err(e) => tracing::warn!("pause menu: {e}"),
                        }
                    }
                    let mut actions = match pause.as_mut() {
                        Some(screen) if state.paused => replay_edges(screen, &state, &edges),
                        _ => Vec::new(),
                    };
                    let (image, clicked) = draw_hud(&state, pause.as_mut());
                    actions.extend(clicked);
                    for action in actions {
                        let _ = action_tx.send(action);
                    }
                    publish_latest(&frame_tx, &frame_drain, image);
                    thread_frames.fetch_add(1, Ordering::Relaxed);
                }

                // Release the last unclaimed bitmap.
                while frame_drain.try_recv().is_ok() {}
                tracing::info!(
                    frames = thread_frames.load(Ordering::Relaxed),
                    "HUD worker stopped"
                );
            })?;

        Ok(Self {
            state_tx,
            state_drain: state_rx,
            frame_rx,
            action_rx,
            edge_tx,
            last_pressed: false,
            disposed,
            frames_drawn,
            handle: Some(handle),
            latest: None,
        })
    }

    /// Hand the worker the newest viewer state. Never blocks.
    ///
    /// A change of the pointer button is also queued as an edge, ahead of the
    /// state it belongs to.
    pub fn update(&mut self, state: HudState) {
        if state.pointer.pressed != self.last_pressed {
            self.last_pressed = state.pointer.pressed;
            // A send error means the worker has stopped.
            let _ = self.edge_tx.send(state.pointer);
        }
        publish_latest(&self.state_tx, &self.state_drain, state);
    }

    /// Most recent finished bitmap, or the previous one if nothing new arrived.
    pub fn latest(&mut self) -> Option<&RgbaImage> {
        if let Ok(image) = self.frame_rx.try_recv() {
            self.latest = Some(image);
        }
        self.latest.as_ref()
    }

    /// Pause menu actions clicked since the last call.
    pub fn drain_actions(&self) -> Vec<PauseAction> {
        self.action_rx.try_iter().collect()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Set the disposed flag and join the thread.
    pub fn shutdown(&mut self) {
        self.disposed.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("HUD worker panicked");
        }
        self.latest = None;
    }
}

/// Feed queued button edges to the pause menu in order, collecting clicks.
fn replay_edges(screen: &mut PauseScreen, state: &HudState, edges: &[Pointer]) -> Vec<PauseAction> {
    if edges.is_empty() {
        return Vec::new();
    }
    screen.set_stereo(state.stereo);
    if let Err(e) = screen.layout(state.width, state.height) {
        tracing::warn!("pause menu layout: {e}");
    }
    edges
        .iter()
        .flat_map(|&edge| screen.handle_pointer(edge).1)
        .collect()
}

impl Drop for HudWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
