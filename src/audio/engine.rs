//! Audio engine for file playback.
//!
//! Provides the rodio-backed media element: a `Sink` per opened item fed by
//! a decoder, wrapped in a pass-through source that feeds the visualizer tap.

use super::element::{
    ElementError, ElementFactory, ElementId, ListenerId, Listeners, MediaElement, MediaEvent,
};
use super::visualizer::SampleTap;
use crate::media::{MediaItem, MediaKind};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Minimum position change (seconds) reported as a time update.
const TIME_UPDATE_EPSILON: f64 = 0.05;

/// Audio source wrapper that copies frames into a `SampleTap`.
/// Samples pass through unchanged, so tapping never silences output.
struct TapSource<S> {
    inner: S,
    tap: SampleTap,
    frame: Vec<f32>,
    channels: usize,
}

impl<S> TapSource<S>
where
    S: Source<Item = f32>,
{
    fn new(inner: S, tap: SampleTap) -> Self {
        let channels = inner.channels().max(1) as usize;
        Self {
            inner,
            tap,
            frame: Vec::with_capacity(channels),
            channels,
        }
    }
}

impl<S> Iterator for TapSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.inner.next()?;
        self.frame.push(sample);
        if self.frame.len() >= self.channels {
            self.tap.push_frame(&self.frame);
            self.frame.clear();
        }
        Some(sample)
    }
}

impl<S> Source for TapSource<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), rodio::source::SeekError> {
        self.frame.clear();
        self.inner.try_seek(pos)
    }
}

/// Reads the container's declared duration without decoding.
fn probe_duration(path: &Path) -> Option<f64> {
    let file = File::open(path).ok()?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    let track = probed.format.default_track()?;
    let time_base = track.codec_params.time_base?;
    let n_frames = track.codec_params.n_frames?;
    let time = time_base.calc_time(n_frames);
    Some(time.seconds as f64 + time.frac)
}

/// A media element playing one file through a rodio `Sink`.
pub struct RodioElement {
    id: ElementId,
    kind: MediaKind,
    path: PathBuf,
    sink: Sink,
    tap: SampleTap,
    listeners: Listeners,
    volume: f32,
    muted: bool,
    /// Total duration in seconds, if the container declares one.
    duration: Option<f64>,
    duration_announced: bool,
    last_position: f64,
    /// Whether the source ran out; the next play restarts it.
    ended: bool,
}

impl RodioElement {
    /// Opens `item` on the given output. The element starts paused.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file cannot be opened
    /// - No decoder supports the file
    /// - A sink cannot be created on the output
    pub fn open(handle: &OutputStreamHandle, item: &MediaItem) -> Result<Self, ElementError> {
        let sink = Sink::try_new(handle).map_err(|e| ElementError::Output(e.to_string()))?;
        sink.pause();

        let mut element = Self {
            id: ElementId::new(),
            kind: item.kind,
            path: item.source.clone(),
            sink,
            tap: SampleTap::new(),
            listeners: Listeners::new(),
            volume: 1.0,
            muted: false,
            duration: probe_duration(&item.source),
            duration_announced: false,
            last_position: 0.0,
            ended: false,
        };
        element.load()?;
        Ok(element)
    }

    /// Decodes the file from the start and queues it on the sink.
    fn load(&mut self) -> Result<(), ElementError> {
        let file = File::open(&self.path).map_err(|source| ElementError::Open {
            path: self.path.clone(),
            source,
        })?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| ElementError::Decode {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        if self.duration.is_none() {
            self.duration = decoder.total_duration().map(|d| d.as_secs_f64());
        }

        let source = TapSource::new(decoder.convert_samples::<f32>(), self.tap.clone());
        self.sink.append(source);
        self.last_position = 0.0;
        Ok(())
    }

    /// Reloads the source after it ran out, leaving the sink paused.
    fn rewind_if_ended(&mut self) -> Result<(), ElementError> {
        if self.ended {
            self.sink.clear();
            self.load()?;
            self.ended = false;
        }
        Ok(())
    }

    fn apply_volume(&self) {
        self.sink
            .set_volume(if self.muted { 0.0 } else { self.volume });
    }
}

impl MediaElement for RodioElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn play(&mut self) -> Result<(), ElementError> {
        // A finished source restarts from a fresh decode; if the file has
        // gone away since, the start is refused and the element stays paused
        self.rewind_if_ended()
            .map_err(|e| ElementError::PlaybackRejected(e.to_string()))?;
        self.sink.play();
        self.listeners.emit(MediaEvent::Playing);
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
        self.listeners.emit(MediaEvent::Paused);
    }

    fn set_position(&mut self, seconds: f64) {
        if let Err(e) = self.rewind_if_ended() {
            tracing::warn!("Cannot rewind {:?} for seek: {}", self.path, e);
            return;
        }
        let target = Duration::from_secs_f64(seconds.max(0.0));
        match self.sink.try_seek(target) {
            Ok(()) => {
                self.tap.clear();
                self.last_position = seconds;
            }
            Err(e) => tracing::warn!("Seek failed in {:?}: {}", self.path, e),
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.apply_volume();
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_volume();
    }

    fn subscribe(&mut self, listener: Sender<MediaEvent>) -> ListenerId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn poll(&mut self) {
        if self.listeners.is_empty() {
            return;
        }

        if !self.duration_announced {
            if let Some(duration) = self.duration {
                self.listeners.emit(MediaEvent::DurationChanged(duration));
                self.duration_announced = true;
            }
        }

        if self.ended {
            return;
        }

        let position = self.sink.get_pos().as_secs_f64();
        if (position - self.last_position).abs() >= TIME_UPDATE_EPSILON {
            self.last_position = position;
            self.listeners.emit(MediaEvent::TimeUpdate(position));
        }

        if self.sink.empty() {
            self.ended = true;
            self.sink.pause();
            if let Some(duration) = self.duration {
                self.listeners.emit(MediaEvent::TimeUpdate(duration));
            }
            self.listeners.emit(MediaEvent::Paused);
            self.listeners.emit(MediaEvent::Ended);
        }
    }

    fn analysis_tap(&self) -> Option<SampleTap> {
        (self.kind == MediaKind::Audio).then(|| self.tap.clone())
    }
}

/// Opens rodio elements on the default audio output.
pub struct RodioBackend {
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    /// Audio output handle shared by every element.
    handle: OutputStreamHandle,
}

impl RodioBackend {
    /// Opens the default audio output device.
    ///
    /// # Errors
    ///
    /// Returns error if no output device is available.
    pub fn new() -> Result<Self, ElementError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| ElementError::Output(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }
}

impl ElementFactory for RodioBackend {
    fn open(&mut self, item: &MediaItem) -> Result<Box<dyn MediaElement>, ElementError> {
        Ok(Box::new(RodioElement::open(&self.handle, item)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-length stereo source for exercising the tap wrapper.
    struct Ramp {
        remaining: usize,
        value: f32,
    }

    impl Iterator for Ramp {
        type Item = f32;

        fn next(&mut self) -> Option<f32> {
            if self.remaining == 0 {
                return None;
            }
            self.remaining -= 1;
            self.value += 1.0;
            Some(self.value)
        }
    }

    impl Source for Ramp {
        fn current_frame_len(&self) -> Option<usize> {
            None
        }

        fn channels(&self) -> u16 {
            2
        }

        fn sample_rate(&self) -> u32 {
            44100
        }

        fn total_duration(&self) -> Option<Duration> {
            None
        }
    }

    #[test]
    fn test_tap_source_passes_samples_through() {
        let tap = SampleTap::new();
        let source = TapSource::new(
            Ramp {
                remaining: 6,
                value: 0.0,
            },
            tap.clone(),
        );
        let out: Vec<f32> = source.collect();
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_tap_source_feeds_attached_tap() {
        let tap = SampleTap::new();
        let _graph = crate::audio::visualizer::AnalysisGraph::new(tap.clone());
        let source = TapSource::new(
            Ramp {
                remaining: 4,
                value: 0.0,
            },
            tap.clone(),
        );
        let _: Vec<f32> = source.collect();

        let mut mono = [0.0f32; 2];
        tap.latest(&mut mono);
        assert_eq!(mono, [1.5, 3.5]);
    }

    #[test]
    fn test_play_refused_when_ended_file_is_gone() {
        let (sink, _queue) = Sink::new_idle();
        let mut element = RodioElement {
            id: ElementId::new(),
            kind: MediaKind::Audio,
            path: PathBuf::from("/no/such/file.mp3"),
            sink,
            tap: SampleTap::new(),
            listeners: Listeners::new(),
            volume: 1.0,
            muted: false,
            duration: None,
            duration_announced: false,
            last_position: 0.0,
            ended: true,
        };
        let (tx, rx) = std::sync::mpsc::channel();
        element.subscribe(tx);

        let result = element.play();
        assert!(matches!(result, Err(ElementError::PlaybackRejected(_))));
        assert!(rx.try_recv().is_err(), "no Playing event after a refused start");
        assert!(element.ended);
    }

    #[test]
    fn test_probe_duration_missing_file() {
        assert_eq!(probe_duration(Path::new("/no/such/file.mp3")), None);
    }
}
