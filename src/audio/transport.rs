//! Transport controller.
//!
//! Owns the play/pause/seek/volume/mute state shown in the transport bar and
//! mirrors user actions onto the single active media element. Playing state
//! is never asserted optimistically: it follows the element's own `Playing`
//! and `Paused` events, so a refused start leaves the display paused.

use super::element::{ListenerId, MediaElement, MediaEvent};
use std::sync::mpsc::{self, Receiver};

/// Snapshot of the transport as displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    /// Whether the element reports that it is playing.
    pub playing: bool,
    /// Mute flag. Also set by a zero volume.
    pub muted: bool,
    /// Output volume, 0.0 to 1.0.
    pub volume: f32,
    /// Playback position in seconds.
    pub current_time: f64,
    /// Total duration in seconds, 0 until known.
    pub duration: f64,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            playing: false,
            muted: false,
            volume: 1.0,
            current_time: 0.0,
            duration: 0.0,
        }
    }
}

impl TransportState {
    /// Playback progress in 0..=1, or 0 while the duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Mute as shown to the user: the flag, or a volume of zero.
    pub fn muted_for_display(&self) -> bool {
        self.muted || self.volume == 0.0
    }

    /// Volume as shown on the slider, 0 while muted.
    pub fn displayed_volume(&self) -> f32 {
        if self.muted_for_display() {
            0.0
        } else {
            self.volume
        }
    }
}

/// Signals the transport raises for its owner to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
    /// The active element finished playing.
    Ended,
}

/// The active element plus its event subscription.
struct Binding {
    element: Box<dyn MediaElement>,
    listener: ListenerId,
    events: Receiver<MediaEvent>,
}

/// Transport controller for the active media element.
pub struct Transport {
    state: TransportState,
    binding: Option<Binding>,
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: TransportState::default(),
            binding: None,
        }
    }

    /// Returns the displayed state.
    pub fn state(&self) -> &TransportState {
        &self.state
    }

    /// Returns the bound element, if any.
    pub fn element(&self) -> Option<&dyn MediaElement> {
        self.binding.as_ref().map(|b| b.element.as_ref())
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// Binds a new active element.
    ///
    /// Any previous element is unbound first. The new element receives the
    /// current volume and mute settings, and position, duration, and playing
    /// state start over.
    pub fn bind(&mut self, mut element: Box<dyn MediaElement>) {
        self.unbind();

        let (tx, rx) = mpsc::channel();
        let listener = element.subscribe(tx);
        element.set_volume(self.state.volume);
        element.set_muted(self.state.muted && self.state.volume > 0.0);

        self.state.playing = false;
        self.state.current_time = 0.0;
        self.state.duration = 0.0;
        self.binding = Some(Binding {
            element,
            listener,
            events: rx,
        });
    }

    /// Releases the active element.
    ///
    /// Unsubscribes the listener and pauses the element before dropping it.
    /// Events still queued from it are discarded.
    pub fn unbind(&mut self) {
        let Some(mut binding) = self.binding.take() else {
            return;
        };
        if !binding.element.unsubscribe(binding.listener) {
            tracing::debug!("Listener was already gone from {:?}", binding.element.id());
        }
        binding.element.pause();
        self.state.playing = false;
    }

    /// Starts playback of the bound element.
    ///
    /// A refused start is logged; the state stays as the element reports it.
    pub fn play(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            if let Err(e) = binding.element.play() {
                tracing::warn!("Playback start refused: {}", e);
            }
        }
    }

    /// Pauses when playing, plays otherwise.
    pub fn toggle_play_pause(&mut self) {
        if self.state.playing {
            if let Some(binding) = self.binding.as_mut() {
                binding.element.pause();
            }
        } else {
            self.play();
        }
    }

    /// Seeks to `seconds`, clamped to the known duration.
    ///
    /// The new position is shown immediately without waiting for the
    /// element to confirm it.
    pub fn seek(&mut self, seconds: f64) {
        let Some(binding) = self.binding.as_mut() else {
            return;
        };
        let upper = if self.state.duration > 0.0 {
            self.state.duration
        } else {
            f64::INFINITY
        };
        let target = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, upper)
        };
        binding.element.set_position(target);
        self.state.current_time = target;
    }

    /// Sets the output volume.
    ///
    /// A volume of zero shows as muted. Any positive volume shows as unmuted
    /// and unmutes the element. No pre-mute volume is remembered.
    pub fn set_volume(&mut self, volume: f32) {
        let Some(binding) = self.binding.as_mut() else {
            return;
        };
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        binding.element.set_volume(volume);
        if volume > 0.0 {
            binding.element.set_muted(false);
        }
        self.state.volume = volume;
        self.state.muted = volume == 0.0;
    }

    /// Flips the mute flag on the state and the element. Volume is unchanged.
    pub fn toggle_mute(&mut self) {
        let Some(binding) = self.binding.as_mut() else {
            return;
        };
        let muted = !self.state.muted;
        binding.element.set_muted(muted);
        self.state.muted = muted;
    }

    /// Asks the element to report its time and end-of-media events.
    pub fn poll(&mut self) {
        if let Some(binding) = self.binding.as_mut() {
            binding.element.poll();
        }
    }

    /// Applies queued element events to the state.
    ///
    /// # Returns
    ///
    /// The signals the owner must handle, in arrival order
    pub fn drain_events(&mut self) -> Vec<TransportSignal> {
        let Some(binding) = self.binding.as_ref() else {
            return Vec::new();
        };
        let events: Vec<MediaEvent> = binding.events.try_iter().collect();

        let mut signals = Vec::new();
        for event in events {
            match event {
                MediaEvent::Playing => self.state.playing = true,
                MediaEvent::Paused => self.state.playing = false,
                MediaEvent::DurationChanged(duration) => {
                    if duration.is_finite() && duration >= 0.0 {
                        self.state.duration = duration;
                    }
                }
                MediaEvent::TimeUpdate(time) => self.state.current_time = time,
                MediaEvent::Ended => {
                    self.state.playing = false;
                    signals.push(TransportSignal::Ended);
                }
            }
        }
        signals
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::element::testing::{MockElement, MockLog, SharedLog};
    use crate::media::MediaKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn mock() -> (Box<MockElement>, SharedLog) {
        let log = Rc::new(RefCell::new(MockLog::default()));
        (
            Box::new(MockElement::new(MediaKind::Audio, Rc::clone(&log))),
            log,
        )
    }

    fn bound() -> (Transport, SharedLog) {
        let (element, log) = mock();
        let mut transport = Transport::new();
        transport.bind(element);
        (transport, log)
    }

    #[test]
    fn test_unbound_operations_are_noops() {
        let mut transport = Transport::new();
        transport.toggle_play_pause();
        transport.seek(10.0);
        transport.set_volume(0.3);
        transport.toggle_mute();
        transport.poll();
        assert!(transport.drain_events().is_empty());
        assert_eq!(*transport.state(), TransportState::default());
    }

    #[test]
    fn test_play_state_follows_events() {
        let (mut transport, log) = bound();
        transport.toggle_play_pause();
        assert_eq!(log.borrow().plays, 1);
        // Not asserted until the element's event is mirrored
        assert!(!transport.state().playing);
        transport.drain_events();
        assert!(transport.state().playing);

        transport.toggle_play_pause();
        transport.drain_events();
        assert_eq!(log.borrow().pauses, 1);
        assert!(!transport.state().playing);
    }

    #[test]
    fn test_rejected_play_keeps_paused() {
        let log = Rc::new(RefCell::new(MockLog::default()));
        let element = MockElement::new(MediaKind::Audio, Rc::clone(&log)).rejecting();
        let mut transport = Transport::new();
        transport.bind(Box::new(element));

        transport.toggle_play_pause();
        transport.drain_events();
        assert!(!transport.state().playing);
        assert_eq!(log.borrow().plays, 0);
    }

    #[test]
    fn test_seek_echoes_immediately() {
        let (mut transport, log) = bound();
        transport.seek(12.5);
        assert_eq!(transport.state().current_time, 12.5);
        assert_eq!(log.borrow().position, 12.5);
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let (element, log) = mock();
        let mut element = element;
        element.queue(MediaEvent::DurationChanged(30.0));
        let mut transport = Transport::new();
        transport.bind(element);
        transport.poll();
        transport.drain_events();
        assert_eq!(transport.state().duration, 30.0);

        transport.seek(45.0);
        assert_eq!(transport.state().current_time, 30.0);
        transport.seek(-2.0);
        assert_eq!(transport.state().current_time, 0.0);
        assert_eq!(log.borrow().position, 0.0);
    }

    #[test]
    fn test_toggle_mute_twice_is_identity() {
        let (mut transport, log) = bound();
        transport.set_volume(0.6);
        let before = *transport.state();

        transport.toggle_mute();
        assert!(transport.state().muted);
        assert!(log.borrow().muted);
        transport.toggle_mute();

        assert_eq!(transport.state().muted, before.muted);
        assert_eq!(transport.state().volume, 0.6);
        assert!(!log.borrow().muted);
    }

    #[test]
    fn test_zero_volume_shows_muted() {
        let (mut transport, log) = bound();
        transport.set_volume(0.0);
        assert!(transport.state().muted);
        assert_eq!(log.borrow().volume, 0.0);

        transport.set_volume(0.4);
        assert!(!transport.state().muted);
        assert_eq!(log.borrow().volume, 0.4);
    }

    #[test]
    fn test_positive_volume_unmutes_element() {
        let (mut transport, log) = bound();
        transport.toggle_mute();
        assert!(log.borrow().muted);
        transport.set_volume(0.5);
        assert!(!transport.state().muted);
        assert!(!log.borrow().muted);
    }

    #[test]
    fn test_unmute_after_zero_volume_stays_silent() {
        let (mut transport, _log) = bound();
        transport.set_volume(0.0);
        transport.toggle_mute();
        assert!(!transport.state().muted);
        assert_eq!(transport.state().volume, 0.0);
        assert!(transport.state().muted_for_display());

        transport.set_volume(0.3);
        assert!(!transport.state().muted_for_display());
    }

    #[test]
    fn test_displayed_volume_is_zero_while_muted() {
        let (mut transport, _log) = bound();
        transport.set_volume(0.7);
        assert_eq!(transport.state().displayed_volume(), 0.7);

        transport.toggle_mute();
        assert!(transport.state().muted_for_display());
        assert_eq!(transport.state().displayed_volume(), 0.0);
        assert_eq!(transport.state().volume, 0.7);

        transport.toggle_mute();
        assert_eq!(transport.state().displayed_volume(), 0.7);
    }

    #[test]
    fn test_volume_is_clamped() {
        let (mut transport, _log) = bound();
        transport.set_volume(1.7);
        assert_eq!(transport.state().volume, 1.0);
        transport.set_volume(-0.2);
        assert_eq!(transport.state().volume, 0.0);
    }

    #[test]
    fn test_time_and_end_events() {
        let (element, _log) = mock();
        let mut element = element;
        element.queue(MediaEvent::TimeUpdate(3.0));
        element.queue(MediaEvent::Ended);
        let mut transport = Transport::new();
        transport.bind(element);
        transport.poll();

        let signals = transport.drain_events();
        assert_eq!(signals, vec![TransportSignal::Ended]);
        assert_eq!(transport.state().current_time, 3.0);
        assert!(!transport.state().playing);
    }

    #[test]
    fn test_rebind_releases_previous_listener() {
        let (first, first_log) = mock();
        let (second, second_log) = mock();
        let mut transport = Transport::new();

        transport.bind(first);
        assert_eq!(first_log.borrow().listeners, 1);
        transport.seek(5.0);

        transport.bind(second);
        assert_eq!(first_log.borrow().listeners, 0);
        assert!(first_log.borrow().dropped);
        assert_eq!(second_log.borrow().listeners, 1);
        assert_eq!(transport.state().current_time, 0.0);
    }

    #[test]
    fn test_bind_applies_volume_and_mute() {
        let (mut transport, _) = bound();
        transport.set_volume(0.3);
        transport.toggle_mute();

        let (next, next_log) = mock();
        transport.bind(next);
        assert_eq!(next_log.borrow().volume, 0.3);
        assert!(next_log.borrow().muted);
    }

    #[test]
    fn test_stale_events_are_discarded_on_unbind() {
        let (mut transport, _log) = bound();
        transport.toggle_play_pause();
        // Playing event is queued but never drained before the switch
        let (next, _next_log) = mock();
        transport.bind(next);
        transport.drain_events();
        assert!(!transport.state().playing);
    }

    #[test]
    fn test_progress() {
        let mut state = TransportState::default();
        assert_eq!(state.progress(), 0.0);
        state.duration = 200.0;
        state.current_time = 50.0;
        assert_eq!(state.progress(), 0.25);
    }
}
