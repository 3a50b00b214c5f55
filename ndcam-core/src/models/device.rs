use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a camera device as reported by the platform.
///
/// Valid ids are non-negative. `-1` is reserved as the "no device" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub i32);

impl DeviceId {
    pub const INVALID: DeviceId = DeviceId(-1);

    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical orientation classification of a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Front,
    Back,
    External,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facing::Front => "front",
            Facing::Back => "back",
            Facing::External => "external",
        };
        f.write_str(name)
    }
}

/// Pixel formats a camera stream can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Implementation-defined format, only usable by platform consumers.
    Private,
    /// YCbCr 4:2:0 with arbitrary plane layout.
    Yuv420_888,
    Jpeg,
    Raw16,
}

/// Whether a stream configuration produces or consumes frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamDirection {
    Output,
    Input,
}

/// One entry of a device's advertised stream configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamConfiguration {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub direction: StreamDirection,
}

impl StreamConfiguration {
    pub fn output(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            direction: StreamDirection::Output,
        }
    }

    /// Whether this configuration can feed a sink expecting `target`.
    pub fn supports(&self, target: &StreamTarget) -> bool {
        self.direction == StreamDirection::Output
            && self.format == target.format
            && self.width == target.width
            && self.height == target.height
    }
}

/// Format and resolution a frame sink was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamTarget {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

impl StreamTarget {
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
        }
    }
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}x{}", self.format, self.width, self.height)
    }
}

/// A camera discovered during registry initialization.
///
/// Read-only description; it does not own any hardware resource. Opening it
/// through the registry yields a `DeviceHandle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    id: DeviceId,
    facing: Facing,
    stream_configurations: Vec<StreamConfiguration>,
}

impl Device {
    pub fn new(id: DeviceId, facing: Facing) -> Self {
        Self {
            id,
            facing,
            stream_configurations: Vec::new(),
        }
    }

    pub fn with_stream_configurations(mut self, configurations: Vec<StreamConfiguration>) -> Self {
        self.stream_configurations = configurations;
        self
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn is_front(&self) -> bool {
        self.facing == Facing::Front
    }

    pub fn is_back(&self) -> bool {
        self.facing == Facing::Back
    }

    pub fn is_external(&self) -> bool {
        self.facing == Facing::External
    }

    pub fn stream_configurations(&self) -> &[StreamConfiguration] {
        &self.stream_configurations
    }

    /// Whether frames for `target` can be produced by this device.
    ///
    /// A device that advertises no configurations accepts any target.
    pub fn supports(&self, target: &StreamTarget) -> bool {
        self.stream_configurations.is_empty()
            || self.stream_configurations.iter().any(|c| c.supports(target))
    }
}
