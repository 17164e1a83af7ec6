use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use contestboard_common::Platform;

use super::{ContestSource, Harvest, SourceError};

/// Placeholder for platforms without a working listing (HackerRank,
/// InterviewBit). Always reports [`SourceError::Unsupported`].
pub struct UnsupportedSource {
    platform: Platform,
}

impl UnsupportedSource {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl ContestSource for UnsupportedSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, _now: DateTime<FixedOffset>) -> Result<Harvest, SourceError> {
        Err(SourceError::Unsupported(self.platform))
    }
}
