use crate::error::ConfigError;

/// Largest accepted minimum-area threshold.
pub const MAX_MIN_SIZE: u32 = 310_000;

/// Per-frame tunables, read once at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Blobs with a smaller pixel count are dropped.
    pub min_size: u32,
    /// Gray value treated as background by the labeler.
    pub background: u8,
}

impl ExtractorConfig {
    pub fn new(min_size: u32, background: u8) -> Result<Self, ConfigError> {
        Self::default()
            .with_min_size(min_size)
            .map(|config| config.with_background(background))
    }

    pub fn with_min_size(mut self, min_size: u32) -> Result<Self, ConfigError> {
        if min_size > MAX_MIN_SIZE {
            return Err(ConfigError::MinSizeOutOfRange {
                value: min_size,
                max: MAX_MIN_SIZE,
            });
        }
        self.min_size = min_size;
        Ok(self)
    }

    pub fn with_background(mut self, background: u8) -> Self {
        self.background = background;
        self
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_size: 10_000,
            background: 0,
        }
    }
}
