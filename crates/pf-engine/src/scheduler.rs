//! Pattern Scheduler — the step loop
//!
//! Plays one `PatternSequence` at a time under the playback slot. Each step
//! drives every known device, then waits out the step duration while racing
//! the cancellation signal. Exit paths all converge on `halt_all`, so
//! actuators are at zero whenever the scheduler is not mid-step.
//!
//! Preemption protocol: an exclusive `play` raises the cancel signal and
//! queues for the slot; the signal stays raised while later preemptors are
//! queued, so intermediate holders yield immediately and the last trigger
//! wins. Non-exclusive playback skips the slot entirely and is only correct
//! for sub-steps of a sequence that already holds it.

use std::sync::Arc;
use std::time::Duration;

use pf_pattern::{PatternSequence, PatternStep};

use crate::intensity::IntensityPolicy;
use crate::playback::PlaybackControl;
use crate::sink::ActuatorSink;

/// How a sequence is scheduled against the playback slot
#[derive(Debug, Clone, Copy)]
pub struct PlayOptions {
    /// Preempt the current holder and take the playback slot
    pub exclusive: bool,
    /// Play the sequence once instead of looping until cancelled
    pub loop_once: bool,
}

impl PlayOptions {
    /// Take the slot and loop until preempted
    pub const fn exclusive_looping() -> Self {
        Self {
            exclusive: true,
            loop_once: false,
        }
    }

    /// Take the slot and play a single pass
    pub const fn exclusive_once() -> Self {
        Self {
            exclusive: true,
            loop_once: true,
        }
    }

}

/// Drives pattern sequences against the actuator sink
pub struct PatternScheduler {
    sink: Arc<dyn ActuatorSink>,
    control: Arc<PlaybackControl>,
    intensity: Arc<IntensityPolicy>,
}

impl PatternScheduler {
    pub fn new(
        sink: Arc<dyn ActuatorSink>,
        control: Arc<PlaybackControl>,
        intensity: Arc<IntensityPolicy>,
    ) -> Self {
        Self {
            sink,
            control,
            intensity,
        }
    }

    #[inline]
    pub fn control(&self) -> &Arc<PlaybackControl> {
        &self.control
    }

    #[inline]
    pub fn intensity(&self) -> &Arc<IntensityPolicy> {
        &self.intensity
    }

    /// Play `sequence` to completion, cancellation or preemption. Actuators
    /// are zeroed before this returns, on every path.
    pub async fn play(&self, sequence: &PatternSequence, options: PlayOptions) {
        if options.exclusive {
            let _guard = self.control.preempt_and_acquire().await;
            log::debug!("[Scheduler] Playing '{}' (slot acquired)", sequence.name());
            self.run_sequence(sequence, options).await;
            self.halt_all().await;
        } else {
            if self.control.slot_held() {
                log::error!(
                    "[Scheduler] Non-exclusive playback of '{}' while the slot is held; \
                     output will interleave",
                    sequence.name()
                );
            }
            self.run_sequence(sequence, options).await;
            self.halt_all().await;
        }
    }

    /// Zero every actuator on every known device. Failures are logged and
    /// the remaining devices still get their stop commands.
    pub async fn halt_all(&self) {
        for device in self.sink.devices().await {
            if let Err(err) = self.sink.vibrate(device, 0.0).await {
                log::warn!("[Scheduler] Halt vibrate failed on device {device}: {err}");
            }
            if let Err(err) = self.sink.oscillate(device, 0.0, true).await {
                log::warn!("[Scheduler] Halt oscillate failed on device {device}: {err}");
            }
        }
    }

    async fn run_sequence(&self, sequence: &PatternSequence, options: PlayOptions) {
        loop {
            for step in sequence.steps() {
                if self.control.cancel_requested() {
                    log::debug!("[Scheduler] '{}' cancelled at step boundary", sequence.name());
                    return;
                }
                if !self.run_step(step).await {
                    log::debug!("[Scheduler] '{}' cancelled mid-step", sequence.name());
                    return;
                }
            }
            if self.control.cancel_requested() {
                return;
            }
            if options.loop_once {
                return;
            }
            // Only the repeating path ticks the Time-mode ramp; a one-shot
            // pass is not an uninterrupted loop.
            self.intensity.on_loop_completed();
        }
    }

    /// Returns false when cancellation interrupted the step wait
    async fn run_step(&self, step: &PatternStep) -> bool {
        let Some(duration_secs) = step.checked_duration() else {
            log::error!(
                "[Scheduler] Skipping step with invalid duration {}",
                step.duration_secs
            );
            return true;
        };

        // Pauses and disabled playback keep the timeline, not the I/O.
        if !step.is_pause() && self.control.is_enabled() {
            self.drive_step(step, duration_secs).await;
        }
        self.wait(duration_secs).await
    }

    async fn drive_step(&self, step: &PatternStep, duration_secs: f32) {
        let strength =
            f64::from((self.intensity.base_strength() * step.strength).clamp(0.0, 1.0));
        // Faster steps get proportionally faster strokes.
        let linear_ms = (3000.0 / duration_secs) as u64;
        let position = self.control.toggle_linear();
        let clockwise = position == crate::sink::LinearPosition::Top;

        for device in self.sink.devices().await {
            if let Err(err) = self.sink.linear_move(device, linear_ms, position).await {
                log::warn!("[Scheduler] Linear move failed on device {device}: {err}");
            }
            if let Err(err) = self.sink.vibrate(device, strength).await {
                log::warn!("[Scheduler] Vibrate failed on device {device}: {err}");
            }
            if let Err(err) = self.sink.oscillate(device, strength, clockwise).await {
                log::warn!("[Scheduler] Oscillate failed on device {device}: {err}");
            }
        }
    }

    async fn wait(&self, duration_secs: f32) -> bool {
        tokio::select! {
            _ = self.control.cancelled() => false,
            _ = tokio::time::sleep(Duration::from_secs_f32(duration_secs)) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intensity::{IntensityMode, TIME_FLOOR};
    use crate::sink::{DeviceId, LinearPosition, SinkError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum SinkCall {
        Vibrate(DeviceId, f64),
        Oscillate(DeviceId, f64, bool),
        Linear(DeviceId, u64, LinearPosition),
    }

    #[derive(Default)]
    struct MockSink {
        calls: Mutex<Vec<SinkCall>>,
    }

    impl MockSink {
        fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().clone()
        }

        fn vibrate_strengths(&self) -> Vec<f64> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    SinkCall::Vibrate(_, strength) => Some(strength),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl ActuatorSink for MockSink {
        async fn devices(&self) -> Vec<DeviceId> {
            vec![0]
        }

        async fn vibrate(&self, device: DeviceId, strength: f64) -> Result<(), SinkError> {
            self.calls.lock().push(SinkCall::Vibrate(device, strength));
            Ok(())
        }

        async fn oscillate(
            &self,
            device: DeviceId,
            strength: f64,
            clockwise: bool,
        ) -> Result<(), SinkError> {
            self.calls
                .lock()
                .push(SinkCall::Oscillate(device, strength, clockwise));
            Ok(())
        }

        async fn linear_move(
            &self,
            device: DeviceId,
            duration_ms: u64,
            position: LinearPosition,
        ) -> Result<(), SinkError> {
            self.calls
                .lock()
                .push(SinkCall::Linear(device, duration_ms, position));
            Ok(())
        }
    }

    fn rig(mode: IntensityMode) -> (Arc<MockSink>, Arc<PlaybackControl>, PatternScheduler) {
        let sink = Arc::new(MockSink::default());
        let control = Arc::new(PlaybackControl::new());
        let intensity = Arc::new(IntensityPolicy::new(mode));
        let scheduler = PatternScheduler::new(
            Arc::clone(&sink) as Arc<dyn ActuatorSink>,
            Arc::clone(&control),
            intensity,
        );
        (sink, control, scheduler)
    }

    fn buzz(strength: f32, duration: f32) -> PatternSequence {
        PatternSequence::new("buzz", vec![PatternStep::new(strength, duration)]).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_actuators_zeroed_after_completion() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(true);
        scheduler.intensity().set_manual_strength(1.0);

        scheduler.play(&buzz(0.7, 1.0), PlayOptions::exclusive_once()).await;

        let calls = sink.calls();
        assert!(
            sink.vibrate_strengths()
                .iter()
                .any(|s| (*s - 0.7).abs() < 1e-6)
        );
        let last_two = &calls[calls.len() - 2..];
        assert_eq!(last_two[0], SinkCall::Vibrate(0, 0.0));
        assert_eq!(last_two[1], SinkCall::Oscillate(0, 0.0, true));
        assert!(!control.slot_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_wait_halts_and_releases_slot() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(true);
        let scheduler = Arc::new(scheduler);

        let player = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move {
            // 60s step, looping forever: only cancellation ends this
            player.play(&buzz(0.5, 60.0), PlayOptions::exclusive_looping()).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        control.request_cancel();
        handle.await.unwrap();

        assert!(!control.slot_held());
        let strengths = sink.vibrate_strengths();
        assert_eq!(*strengths.last().unwrap(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exclusive_play_preempts_current_holder() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(true);
        scheduler.intensity().set_manual_strength(1.0);
        let scheduler = Arc::new(scheduler);

        let player = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move {
            player.play(&buzz(0.3, 60.0), PlayOptions::exclusive_looping()).await;
        });
        // Let the first playback acquire the slot and issue its step
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(control.slot_held());

        scheduler.play(&buzz(0.9, 1.0), PlayOptions::exclusive_once()).await;
        handle.await.unwrap();

        let strengths = sink.vibrate_strengths();
        let takeover = strengths.iter().position(|s| (*s - 0.9).abs() < 1e-6).unwrap();
        // Once the new holder has the slot, the old pattern never fires again
        assert!(strengths[takeover..].iter().all(|s| *s == 0.0 || (*s - 0.9).abs() < 1e-6));
        assert!(!control.slot_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_playback_keeps_timing_skips_io() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(false);

        let sequence = PatternSequence::new(
            "two-step",
            vec![PatternStep::new(0.8, 1.0), PatternStep::pause(0.5)],
        )
        .unwrap();

        let start = Instant::now();
        scheduler.play(&sequence, PlayOptions::exclusive_once()).await;
        assert!(start.elapsed() >= Duration::from_millis(1500));

        // Only the exit halt touched the devices
        assert!(sink.vibrate_strengths().iter().all(|s| *s == 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_mode_ramps_only_while_looping() {
        let (_sink, control, scheduler) = rig(IntensityMode::Time);
        control.set_enabled(true);
        let scheduler = Arc::new(scheduler);

        // A one-shot pass is not an uninterrupted loop
        scheduler.play(&buzz(1.0, 0.1), PlayOptions::exclusive_once()).await;
        let base = scheduler.intensity().base_strength();
        assert!((base - TIME_FLOOR).abs() < 1e-6, "base was {base}");

        // Two full 0.1s passes complete before the cancel at 0.25s
        let player = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move {
            player.play(&buzz(1.0, 0.1), PlayOptions::exclusive_looping()).await;
        });
        tokio::time::sleep(Duration::from_millis(250)).await;
        control.request_cancel();
        handle.await.unwrap();

        let base = scheduler.intensity().base_strength();
        assert!((base - (TIME_FLOOR + 0.1)).abs() < 1e-6, "base was {base}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_once_plays_single_pass() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(true);
        scheduler.intensity().set_manual_strength(1.0);

        let sequence = PatternSequence::new(
            "pair",
            vec![PatternStep::new(0.4, 0.1), PatternStep::new(0.6, 0.1)],
        )
        .unwrap();
        scheduler.play(&sequence, PlayOptions::exclusive_once()).await;

        let nonzero: Vec<f64> = sink
            .vibrate_strengths()
            .into_iter()
            .filter(|s| *s > 0.0)
            .collect();
        assert_eq!(nonzero.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_duration_step_skipped_without_wait() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(true);

        let start = Instant::now();
        let resumed = scheduler.run_step(&PatternStep::new(0.5, -2.0)).await;

        // Logged input error: no wait, no device I/O, playback continues
        assert!(resumed);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(sink.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_exclusive_play_proceeds_without_slot() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(true);

        let _guard = control.acquire_slot().await;
        // Logged as a contract violation but still runs to completion
        let options = PlayOptions {
            exclusive: false,
            loop_once: true,
        };
        scheduler.play(&buzz(0.2, 0.1), options).await;
        assert!(!sink.calls().is_empty());
        assert!(control.slot_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_preemptions_resolve_to_last_trigger() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(true);
        scheduler.intensity().set_manual_strength(1.0);
        let scheduler = Arc::new(scheduler);

        // Stand-in for an in-flight playback holding the slot
        let holder = control.acquire_slot().await;

        let first = {
            let player = Arc::clone(&scheduler);
            tokio::spawn(async move {
                player.play(&buzz(0.5, 60.0), PlayOptions::exclusive_looping()).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = {
            let player = Arc::clone(&scheduler);
            tokio::spawn(async move {
                player.play(&buzz(0.9, 1.0), PlayOptions::exclusive_once()).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(holder);
        first.await.unwrap();
        second.await.unwrap();

        // The earlier preemptor yields to the later one without ever
        // driving a step; only the last trigger's strength reaches devices
        let strengths = sink.vibrate_strengths();
        assert!(strengths.iter().any(|s| (*s - 0.9).abs() < 1e-6));
        assert!(strengths.iter().all(|s| *s == 0.0 || (*s - 0.9).abs() < 1e-6));
        assert!(!control.slot_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_stroke_speed_scales_with_duration() {
        let (sink, control, scheduler) = rig(IntensityMode::OnItem);
        control.set_enabled(true);

        scheduler.play(&buzz(0.5, 2.0), PlayOptions::exclusive_once()).await;
        scheduler.play(&buzz(0.5, 0.5), PlayOptions::exclusive_once()).await;

        let linears: Vec<u64> = sink
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Linear(_, ms, _) => Some(ms),
                _ => None,
            })
            .collect();
        assert_eq!(linears, vec![1500, 6000]);
    }
}
