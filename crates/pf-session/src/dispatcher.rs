//! Event Dispatcher — game events to pattern triggers
//!
//! One dispatcher sits between the session event stream and the scheduler.
//! Item grants preempt whatever is playing; location checks feed the
//! intensity policy and, in OnItem mode, fire a short acknowledgement buzz.
//! Link signals are deduplicated by timestamp since every connected client
//! rebroadcasts them.

use std::sync::Arc;

use parking_lot::Mutex;

use pf_engine::{
    IntensityMode, IntensityPolicy, PatternScheduler, PlayOptions, PlaybackControl,
};
use pf_pattern::{PatternLibrary, PatternSlot};

use crate::event::GameEvent;

/// Maps each session event to playback, intensity and enable-state actions
pub struct EventDispatcher {
    scheduler: Arc<PatternScheduler>,
    library: Arc<PatternLibrary>,
    /// Timestamp of the last link signal acted on
    last_link: Mutex<Option<f64>>,
}

impl EventDispatcher {
    pub fn new(scheduler: Arc<PatternScheduler>, library: Arc<PatternLibrary>) -> Self {
        Self {
            scheduler,
            library,
            last_link: Mutex::new(None),
        }
    }

    #[inline]
    fn control(&self) -> &Arc<PlaybackControl> {
        self.scheduler.control()
    }

    #[inline]
    fn intensity(&self) -> &Arc<IntensityPolicy> {
        self.scheduler.intensity()
    }

    /// React to one session event
    pub fn handle_event(&self, event: GameEvent) {
        match event {
            GameEvent::ConnectionEstablished { checked, missing } => {
                self.intensity().on_connect(checked, missing);
                self.control().set_enabled(true);
            }

            GameEvent::ItemReceived { category } => {
                log::info!("[Dispatcher] Item received: {category:?}");
                let options = match self.intensity().mode() {
                    // OnItem: each item is a discrete one-shot
                    IntensityMode::OnItem => PlayOptions::exclusive_once(),
                    // Percent/Time: the item's motif loops until the next trigger
                    _ => PlayOptions::exclusive_looping(),
                };
                self.trigger(category.slot(), options);
            }

            GameEvent::LocationChecked { count } => {
                self.intensity().on_location_checked(count);
                if self.intensity().mode() == IntensityMode::OnItem && self.control().is_enabled()
                {
                    self.trigger(PatternSlot::Location, PlayOptions::exclusive_once());
                }
            }

            GameEvent::LinkSignal { timestamp, source } => {
                if self.link_is_duplicate(timestamp) {
                    log::debug!("[Dispatcher] Duplicate link signal ignored");
                    return;
                }
                log::info!(
                    "[Dispatcher] Link signal from {}",
                    source.as_deref().unwrap_or("unknown")
                );
                self.trigger(PatternSlot::Link, PlayOptions::exclusive_once());
            }
        }
    }

    /// Switch intensity mode; an actual change preempts the active pattern
    /// so a stale strength never keeps playing.
    pub fn set_mode(&self, mode: IntensityMode) {
        if self.intensity().set_mode(mode) {
            log::info!("[Dispatcher] Intensity mode -> {mode:?}");
            self.control().request_cancel();
        }
    }

    /// Operator strength for OnItem mode
    pub fn set_manual_strength(&self, strength: f32) {
        self.intensity().set_manual_strength(strength);
    }

    /// Enable or disable actuator output. Disabling preempts the active
    /// pattern and zeroes every device.
    pub async fn set_enabled(&self, enabled: bool) {
        self.control().set_enabled(enabled);
        self.intensity().reset_ramp();
        if !enabled {
            self.control().request_cancel();
            self.scheduler.halt_all().await;
        }
    }

    /// Play the self-test motif to completion, preempting any active pattern
    pub async fn run_self_test(&self) {
        let sequence = self.library.get(PatternSlot::SelfTest).clone();
        self.scheduler.play(&sequence, PlayOptions::exclusive_once()).await;
    }

    /// Whether playback is globally enabled
    pub fn is_enabled(&self) -> bool {
        self.control().is_enabled()
    }

    /// Current intensity mode and base strength, for status output
    pub fn status(&self) -> (IntensityMode, f32, bool) {
        (
            self.intensity().mode(),
            self.intensity().base_strength(),
            self.control().is_enabled(),
        )
    }

    /// Record the signal timestamp; equal timestamps are rebroadcasts
    fn link_is_duplicate(&self, timestamp: Option<f64>) -> bool {
        let Some(timestamp) = timestamp else {
            // Untimestamped signals cannot be deduplicated; play them
            return false;
        };
        let mut last = self.last_link.lock();
        if *last == Some(timestamp) {
            return true;
        }
        *last = Some(timestamp);
        false
    }

    /// Fire-and-forget playback of one library slot
    fn trigger(&self, slot: PatternSlot, options: PlayOptions) {
        let sequence = self.library.get(slot).clone();
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move {
            scheduler.play(&sequence, options).await;
        });
    }
}
