//! Spectrum visualizer.
//!
//! Taps the active audio element's output, runs a small FFT over the most
//! recent samples once per display refresh, and turns the resulting
//! frequency bytes into a row of colored bars.
//!
//! The pieces, from the audio thread outwards:
//! - `SampleTap` copies mono samples out of the playback stream
//! - `Analyser` converts a window of samples into byte magnitudes
//! - `AnalysisGraph` ties one tap to one analyser for an element's lifetime
//! - `FrameScheduler` is the per-refresh callback queue
//! - `Visualizer` owns the current session and its repeating frame request

use super::element::ElementId;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::VecDeque;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Transform size of the analyser.
pub const FFT_SIZE: usize = 256;

/// Number of frequency buckets produced per frame.
pub const FREQUENCY_BIN_COUNT: usize = FFT_SIZE / 2;

/// Weight of the previous frame when smoothing magnitudes.
const SMOOTHING_TIME_CONSTANT: f32 = 0.8;

/// Magnitude mapped to byte 0.
const MIN_DECIBELS: f32 = -100.0;

/// Magnitude mapped to byte 255.
const MAX_DECIBELS: f32 = -30.0;

/// Samples retained by a tap.
const TAP_CAPACITY: usize = 2048;

/// Canvas background color.
pub const BACKGROUND: (u8, u8, u8) = (20, 20, 20);

/// Errors from the analysis graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VisualizerError {
    /// The graph was already closed.
    #[error("analysis graph is already closed")]
    AlreadyClosed,
}

#[derive(Debug)]
struct TapShared {
    samples: Mutex<VecDeque<f32>>,
    attached: AtomicBool,
    written: AtomicU64,
}

/// Shared ring of recent mono samples from a playing element.
///
/// The audio thread pushes while the tap is attached to an analysis graph;
/// the UI thread reads the newest window each frame.
#[derive(Debug, Clone)]
pub struct SampleTap {
    shared: Arc<TapShared>,
}

impl SampleTap {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(TapShared {
                samples: Mutex::new(VecDeque::with_capacity(TAP_CAPACITY)),
                attached: AtomicBool::new(false),
                written: AtomicU64::new(0),
            }),
        }
    }

    /// Pushes one interleaved frame, down-mixed to mono.
    ///
    /// Never blocks: if the reader holds the lock the frame is skipped.
    pub fn push_frame(&self, frame: &[f32]) {
        if frame.is_empty() || !self.is_attached() {
            return;
        }
        let mono = frame.iter().sum::<f32>() / frame.len() as f32;
        if let Ok(mut samples) = self.shared.samples.try_lock() {
            if samples.len() >= TAP_CAPACITY {
                samples.pop_front();
            }
            samples.push_back(mono);
            self.shared.written.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Total samples recorded since the tap was created.
    ///
    /// Stops advancing while the stream is paused, since a paused sink no
    /// longer pulls from its source.
    pub fn written(&self) -> u64 {
        self.shared.written.load(Ordering::Relaxed)
    }

    /// Copies the newest `out.len()` samples into `out`, oldest first.
    ///
    /// Missing history is filled with silence at the front.
    pub fn latest(&self, out: &mut [f32]) {
        out.fill(0.0);
        if let Ok(samples) = self.shared.samples.lock() {
            let take = samples.len().min(out.len());
            let start = out.len() - take;
            for (dst, src) in out[start..]
                .iter_mut()
                .zip(samples.iter().skip(samples.len() - take))
            {
                *dst = *src;
            }
        }
    }

    /// Returns true while an analysis graph is reading this tap.
    pub fn is_attached(&self) -> bool {
        self.shared.attached.load(Ordering::Relaxed)
    }

    fn set_attached(&self, attached: bool) {
        self.shared.attached.store(attached, Ordering::Relaxed);
    }

    /// Discards buffered samples (after a seek, for example).
    pub fn clear(&self) {
        if let Ok(mut samples) = self.shared.samples.lock() {
            samples.clear();
        }
    }
}

impl Default for SampleTap {
    fn default() -> Self {
        Self::new()
    }
}

/// Frequency analyser producing byte magnitudes.
///
/// Applies a Blackman window, takes the magnitude spectrum normalized by the
/// transform size, smooths it over time, and maps the decibel range
/// [-100, -30] onto 0..=255.
pub struct Analyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl Analyser {
    pub fn new() -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);

        let n = FFT_SIZE as f32;
        let window = (0..FFT_SIZE)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
            })
            .collect();

        Self {
            fft,
            window,
            buffer: vec![Complex { re: 0.0, im: 0.0 }; FFT_SIZE],
            smoothed: vec![0.0; FREQUENCY_BIN_COUNT],
        }
    }

    /// Computes byte magnitudes for one window of `FFT_SIZE` samples.
    ///
    /// Writes up to `FREQUENCY_BIN_COUNT` values into `out`.
    pub fn byte_frequency_data(&mut self, samples: &[f32], out: &mut [u8]) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex {
                re: s * self.window[i],
                im: 0.0,
            };
        }
        self.fft.process(&mut self.buffer);

        let scale = 1.0 / FFT_SIZE as f32;
        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (k, value) in out.iter_mut().take(FREQUENCY_BIN_COUNT).enumerate() {
            let magnitude = self.buffer[k].norm() * scale;
            let smoothed = SMOOTHING_TIME_CONSTANT * self.smoothed[k]
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
            self.smoothed[k] = if smoothed.is_finite() { smoothed } else { 0.0 };

            let db = 20.0 * self.smoothed[k].log10();
            let scaled = 255.0 * (db - MIN_DECIBELS) / range;
            *value = if scaled.is_finite() {
                scaled.clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
    }
}

impl Default for Analyser {
    fn default() -> Self {
        Self::new()
    }
}

/// One tap feeding one analyser, for the lifetime of one element.
pub struct AnalysisGraph {
    tap: SampleTap,
    analyser: Analyser,
    window: Vec<f32>,
    last_written: u64,
    closed: bool,
}

impl AnalysisGraph {
    /// Builds a graph reading from `tap` and starts the tap recording.
    pub fn new(tap: SampleTap) -> Self {
        tap.clear();
        tap.set_attached(true);
        let last_written = tap.written();
        Self {
            tap,
            analyser: Analyser::new(),
            window: vec![0.0; FFT_SIZE],
            last_written,
            closed: false,
        }
    }

    /// Writes the current byte magnitudes into `out`.
    ///
    /// A closed graph reports silence. When no samples arrived since the
    /// previous call (the element is paused or has ended) the analyser sees
    /// a silent window, so the smoothed bars decay to flat.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        if self.closed {
            out.fill(0);
            return;
        }
        let written = self.tap.written();
        if written == self.last_written {
            self.window.fill(0.0);
        } else {
            self.last_written = written;
            self.tap.latest(&mut self.window);
        }
        self.analyser.byte_frequency_data(&self.window, out);
    }

    /// Stops the tap and releases the graph.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyClosed` if the graph was closed before.
    pub fn close(&mut self) -> Result<(), VisualizerError> {
        if self.closed {
            return Err(VisualizerError::AlreadyClosed);
        }
        self.closed = true;
        self.tap.set_attached(false);
        self.tap.clear();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for AnalysisGraph {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

/// Identity of one visualizer session (one attach).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

/// Handle for a pending frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

/// Per-display-refresh callback queue.
///
/// Sessions request the next frame; the UI loop drains the queue once per
/// refresh and hands the due sessions back to the visualizer.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_handle: u64,
    pending: Vec<(FrameHandle, SessionId)>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a callback on the next refresh.
    pub fn request_frame(&mut self, session: SessionId) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending.push((handle, session));
        handle
    }

    /// Cancels a pending request.
    ///
    /// Cancelling a request that already fired or was already cancelled is
    /// a no-op.
    ///
    /// # Returns
    ///
    /// true if a pending request was removed
    pub fn cancel_frame(&mut self, handle: FrameHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(h, _)| *h != handle);
        self.pending.len() != before
    }

    /// Removes and returns every session due on this refresh.
    pub fn take_due(&mut self) -> Vec<SessionId> {
        self.pending.drain(..).map(|(_, session)| session).collect()
    }

    /// Number of outstanding requests.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// The live attachment between the visualizer and one audio element.
struct Session {
    id: SessionId,
    element: ElementId,
    graph: AnalysisGraph,
    pending: Option<FrameHandle>,
}

/// Repeating spectrum loop bound to the active audio element.
pub struct Visualizer {
    session: Option<Session>,
    next_session: u64,
    magnitudes: [u8; FREQUENCY_BIN_COUNT],
    graphs_closed: usize,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            session: None,
            next_session: 0,
            magnitudes: [0; FREQUENCY_BIN_COUNT],
            graphs_closed: 0,
        }
    }

    /// Attaches to an audio element's tap and starts the frame loop.
    ///
    /// Attaching to the element that is already attached does nothing. Any
    /// other session is torn down first.
    pub fn attach(&mut self, element: ElementId, tap: SampleTap, frames: &mut FrameScheduler) {
        if self.attached_element() == Some(element) {
            return;
        }
        self.detach(frames);

        self.next_session += 1;
        let id = SessionId(self.next_session);
        tracing::debug!("Visualizer session {:?} attached to {:?}", id, element);
        self.session = Some(Session {
            id,
            element,
            graph: AnalysisGraph::new(tap),
            pending: None,
        });
        self.run_frame(id, frames);
    }

    /// Stops the frame loop and closes the analysis graph.
    ///
    /// Safe to call when nothing is attached.
    pub fn detach(&mut self, frames: &mut FrameScheduler) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Some(handle) = session.pending.take() {
            frames.cancel_frame(handle);
        }
        match session.graph.close() {
            Ok(()) => self.graphs_closed += 1,
            Err(e) => tracing::debug!("Ignoring visualizer teardown error: {}", e),
        }
        tracing::debug!("Visualizer session {:?} detached", session.id);
        self.magnitudes = [0; FREQUENCY_BIN_COUNT];
    }

    /// Runs one frame for each due session that is still current.
    pub fn on_refresh(&mut self, due: &[SessionId], frames: &mut FrameScheduler) {
        for id in due {
            self.run_frame(*id, frames);
        }
    }

    /// Pulls fresh magnitudes and schedules the next frame.
    fn run_frame(&mut self, id: SessionId, frames: &mut FrameScheduler) {
        let Some(session) = self.session.as_mut().filter(|s| s.id == id) else {
            return;
        };
        session.graph.byte_frequency_data(&mut self.magnitudes);
        session.pending = Some(frames.request_frame(id));
    }

    /// Current frame's byte magnitudes.
    pub fn magnitudes(&self) -> &[u8] {
        &self.magnitudes
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    /// Element the current session reads from.
    pub fn attached_element(&self) -> Option<ElementId> {
        self.session.as_ref().map(|s| s.element)
    }

    /// Current session ID.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Number of graphs closed by teardown so far.
    pub fn graphs_closed(&self) -> usize {
        self.graphs_closed
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Geometry and color of one spectrum bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bar {
    /// Left edge, in columns.
    pub x: u16,
    /// Width, in columns.
    pub width: u16,
    /// Height in the caller's vertical units.
    pub height: u32,
    /// RGB fill color.
    pub color: (u8, u8, u8),
}

/// Lays out one bar per bucket across a canvas.
///
/// Bars are `floor(width / n * 2.5)` columns wide (at least one) with a
/// one-column gap, left to right; bars that start past the right edge are
/// dropped and the last visible one is clipped. Heights scale
/// `magnitude / 255` onto `height`, and hues sweep 0..360 degrees across
/// the buckets at full saturation and half lightness.
pub fn bar_layout(magnitudes: &[u8], width: u16, height: u32) -> Vec<Bar> {
    let n = magnitudes.len();
    if n == 0 || width == 0 {
        return Vec::new();
    }

    let bar_width = ((width as f32 / n as f32) * 2.5).floor().max(1.0) as u16;
    let mut bars = Vec::new();
    let mut x: u16 = 0;

    for (i, &magnitude) in magnitudes.iter().enumerate() {
        if x >= width {
            break;
        }
        let hue = i as f32 / n as f32 * 360.0;
        bars.push(Bar {
            x,
            width: bar_width.min(width - x),
            height: magnitude as u32 * height / 255,
            color: hsl_to_rgb(hue, 1.0, 0.5),
        });
        x = x.saturating_add(bar_width + 1);
    }

    bars
}

/// Converts HSL (hue in degrees, saturation and lightness in 0..=1) to RGB.
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}
