//! The `raw` field of an [`crate::Envelope`]: the image buffer (or opaque reference) set exactly
//! once by a head node.

use serde::{Deserialize, Serialize};

/// The payload a head node contributes to an envelope.
///
/// `Image` is the shape the original `RawImage` data type validates against (3- or 4-channel
/// `uint8`); `Native` carries anything else a `NativeObject`-typed node produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawValue {
    /// A decoded image buffer, row-major, `height * width * channels` bytes.
    Image {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Number of channels (must be 3 or 4 to satisfy `RawImage`).
        channels: u8,
        /// Raw pixel bytes.
        data: Vec<u8>,
    },
    /// Any other adapter-serializable value.
    Native(serde_json::Value),
}

impl RawValue {
    /// Returns the byte length of an image payload's shape, i.e. `width * height * channels`.
    #[must_use]
    pub fn expected_image_len(width: u32, height: u32, channels: u8) -> usize {
        width as usize * height as usize * channels as usize
    }

    /// Validates the invariants `RawImage` enforces: 3- or 4-channel, `uint8`, and a buffer whose
    /// length matches `width * height * channels`.
    pub fn validate_as_image(&self) -> Result<(), RawImageError> {
        match self {
            RawValue::Image {
                width,
                height,
                channels,
                data,
            } => {
                if !(*channels == 3 || *channels == 4) {
                    return Err(RawImageError::InvalidChannels(*channels));
                }
                let expected = Self::expected_image_len(*width, *height, *channels);
                if data.len() != expected {
                    return Err(RawImageError::ShapeMismatch {
                        expected,
                        actual: data.len(),
                    });
                }
                Ok(())
            }
            RawValue::Native(_) => Err(RawImageError::NotAnImage),
        }
    }
}

/// Errors raised when a data type registered against `RawImage`'s validator receives a value
/// that is not a valid 3- or 4-channel `uint8` image.
#[derive(thiserror::Error, Debug)]
pub enum RawImageError {
    /// The channel count was not 3 or 4.
    #[error("image must be 3-channel (RGB/BGR) or 4-channel (RGBA/BGRA), got {0} channels")]
    InvalidChannels(u8),

    /// The buffer length didn't match `width * height * channels`.
    #[error("image buffer length {actual} does not match expected shape length {expected}")]
    ShapeMismatch {
        /// Expected length given declared width/height/channels.
        expected: usize,
        /// Actual buffer length.
        actual: usize,
    },

    /// The value was not an image at all.
    #[error("raw value is not an image")]
    NotAnImage,
}
