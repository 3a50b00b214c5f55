use std::time::Duration;

use ndcam_core::models::device::{Device, DeviceId, Facing, PixelFormat, StreamConfiguration};

/// Configuration for the virtual camera stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualCameraConfig {
    /// Cameras reported by enumeration.
    pub devices: Vec<Device>,

    /// Time between frames of a repeating sequence (default: 33 ms).
    pub frame_interval: Duration,

    /// Delay between submit and the start acknowledgment (default: 5 ms).
    pub start_latency: Duration,

    /// Buffer slots per open device (default: 8). Frames held by the
    /// consumer pin a slot; when none is free the frame is reported lost.
    pub buffer_slots: usize,
}

impl VirtualCameraConfig {
    pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(1);

    /// Back and front camera.
    pub fn phone() -> Self {
        Self {
            devices: vec![
                Device::new(DeviceId(0), Facing::Back).with_stream_configurations(default_stream_configurations()),
                Device::new(DeviceId(1), Facing::Front).with_stream_configurations(default_stream_configurations()),
            ],
            ..Self::empty()
        }
    }

    /// One camera with id 0.
    pub fn single(facing: Facing) -> Self {
        Self {
            devices: vec![Device::new(DeviceId(0), facing).with_stream_configurations(default_stream_configurations())],
            ..Self::empty()
        }
    }

    /// No cameras attached.
    pub fn empty() -> Self {
        Self {
            devices: Vec::new(),
            frame_interval: Duration::from_millis(33),
            start_latency: Duration::from_millis(5),
            buffer_slots: 8,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_buffer_slots(mut self, slots: usize) -> Self {
        self.buffer_slots = slots;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.frame_interval.is_zero() {
            return Err("frame interval must be positive".into());
        }
        if self.frame_interval > Self::MAX_FRAME_INTERVAL {
            return Err(format!(
                "frame interval {:?} exceeds maximum of {:?}",
                self.frame_interval,
                Self::MAX_FRAME_INTERVAL
            ));
        }
        if self.start_latency > Self::MAX_FRAME_INTERVAL {
            return Err(format!("start latency too long: {:?}", self.start_latency));
        }
        if self.buffer_slots == 0 {
            return Err("at least one buffer slot is required".into());
        }
        Ok(())
    }
}

impl Default for VirtualCameraConfig {
    fn default() -> Self {
        Self::phone()
    }
}

/// Stream table advertised by the preset cameras.
pub fn default_stream_configurations() -> Vec<StreamConfiguration> {
    vec![
        StreamConfiguration::output(PixelFormat::Yuv420_888, 1920, 1080),
        StreamConfiguration::output(PixelFormat::Yuv420_888, 1280, 720),
        StreamConfiguration::output(PixelFormat::Yuv420_888, 640, 480),
        StreamConfiguration::output(PixelFormat::Jpeg, 4032, 3024),
        StreamConfiguration::output(PixelFormat::Jpeg, 1920, 1080),
        StreamConfiguration::output(PixelFormat::Private, 1920, 1080),
        StreamConfiguration::output(PixelFormat::Raw16, 4032, 3024),
    ]
}
