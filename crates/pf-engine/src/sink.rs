//! Actuator Sink — boundary to the device-control transport
//!
//! The scheduler only ever speaks this normalized command set. Device
//! discovery, pairing and reconnection live behind the trait; the engine
//! tolerates an empty device set and devices vanishing between calls.

use async_trait::async_trait;
use thiserror::Error;

/// Identifier assigned by the device transport
pub type DeviceId = u32;

/// Target end of a linear actuator's travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearPosition {
    #[default]
    Bottom,
    Top,
}

impl LinearPosition {
    /// The opposite end
    pub fn flipped(self) -> Self {
        match self {
            LinearPosition::Bottom => LinearPosition::Top,
            LinearPosition::Top => LinearPosition::Bottom,
        }
    }

    /// Normalized target position (0.0 or 1.0) for transports that take a scalar
    pub fn as_target(self) -> f64 {
        match self {
            LinearPosition::Bottom => 0.0,
            LinearPosition::Top => 1.0,
        }
    }
}

/// Transport-level failures; logged by the scheduler, never fatal
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Device {0} is not available")]
    DeviceGone(DeviceId),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Normalized per-device command surface of the device transport
#[async_trait]
pub trait ActuatorSink: Send + Sync {
    /// Enumerate currently known devices; the set may change between calls
    async fn devices(&self) -> Vec<DeviceId>;

    /// Drive vibration at `strength` in [0, 1]
    async fn vibrate(&self, device: DeviceId, strength: f64) -> Result<(), SinkError>;

    /// Drive rotary oscillation at `strength` in [0, 1]
    async fn oscillate(&self, device: DeviceId, strength: f64, clockwise: bool)
    -> Result<(), SinkError>;

    /// Move a linear actuator to `position` over `duration_ms`
    async fn linear_move(
        &self,
        device: DeviceId,
        duration_ms: u64,
        position: LinearPosition,
    ) -> Result<(), SinkError>;
}

/// Sink with no devices; every command is a no-op
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NullSink {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActuatorSink for NullSink {
    async fn devices(&self) -> Vec<DeviceId> {
        Vec::new()
    }

    async fn vibrate(&self, _: DeviceId, _: f64) -> Result<(), SinkError> {
        Ok(())
    }

    async fn oscillate(&self, _: DeviceId, _: f64, _: bool) -> Result<(), SinkError> {
        Ok(())
    }

    async fn linear_move(&self, _: DeviceId, _: u64, _: LinearPosition) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sink that logs every command at debug level; stands in for a real
/// transport so operators can verify patterns with `test` before pairing
/// hardware.
#[derive(Debug, Clone)]
pub struct LogSink {
    device_count: u32,
}

impl LogSink {
    pub fn new(device_count: u32) -> Self {
        Self { device_count }
    }
}

#[async_trait]
impl ActuatorSink for LogSink {
    async fn devices(&self) -> Vec<DeviceId> {
        (0..self.device_count).collect()
    }

    async fn vibrate(&self, device: DeviceId, strength: f64) -> Result<(), SinkError> {
        log::debug!("[Sink] device {device} vibrate {strength:.3}");
        Ok(())
    }

    async fn oscillate(
        &self,
        device: DeviceId,
        strength: f64,
        clockwise: bool,
    ) -> Result<(), SinkError> {
        log::debug!("[Sink] device {device} oscillate {strength:.3} clockwise={clockwise}");
        Ok(())
    }

    async fn linear_move(
        &self,
        device: DeviceId,
        duration_ms: u64,
        position: LinearPosition,
    ) -> Result<(), SinkError> {
        log::debug!("[Sink] device {device} linear {duration_ms}ms -> {position:?}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_position_flip() {
        assert_eq!(LinearPosition::Bottom.flipped(), LinearPosition::Top);
        assert_eq!(LinearPosition::Top.flipped(), LinearPosition::Bottom);
        assert_eq!(LinearPosition::Bottom.as_target(), 0.0);
        assert_eq!(LinearPosition::Top.as_target(), 1.0);
    }

    #[tokio::test]
    async fn test_null_sink_has_no_devices() {
        let sink = NullSink::new();
        assert!(sink.devices().await.is_empty());
        assert!(sink.vibrate(0, 0.5).await.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_enumerates_devices() {
        let sink = LogSink::new(3);
        assert_eq!(sink.devices().await, vec![0, 1, 2]);
    }
}
