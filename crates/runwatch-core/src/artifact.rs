//! Binary result artifact produced by a successful run.

use crate::CoreError;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Display dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const WIDTH_RANGE: (u32, u32) = (400, 1920);
    pub const HEIGHT_RANGE: (u32, u32) = (300, 1080);

    /// Create a viewport, rejecting sizes the browser window cannot take.
    pub fn new(width: u32, height: u32) -> Result<Self, CoreError> {
        check_range("width", width, Self::WIDTH_RANGE)?;
        check_range("height", height, Self::HEIGHT_RANGE)?;
        Ok(Self { width, height })
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

fn check_range(dimension: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), CoreError> {
    if value < min || value > max {
        return Err(CoreError::InvalidViewport {
            dimension,
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Loaded artifact bytes plus how they should be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub viewport: Viewport,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Encode as a `data:` URI for embedding in HTML-like displays.
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_bounds() {
        assert!(Viewport::new(1280, 720).is_ok());
        assert!(Viewport::new(400, 300).is_ok());
        assert!(Viewport::new(1920, 1080).is_ok());
        assert!(matches!(
            Viewport::new(399, 720),
            Err(CoreError::InvalidViewport { dimension: "width", .. })
        ));
        assert!(matches!(
            Viewport::new(1280, 1081),
            Err(CoreError::InvalidViewport { dimension: "height", .. })
        ));
    }

    #[test]
    fn test_data_uri() {
        let artifact = Artifact {
            bytes: b"GIF89a".to_vec(),
            content_type: "image/gif".to_string(),
            viewport: Viewport::default(),
        };
        assert_eq!(artifact.len(), 6);
        assert_eq!(artifact.to_data_uri(), "data:image/gif;base64,R0lGODlh");
    }
}
