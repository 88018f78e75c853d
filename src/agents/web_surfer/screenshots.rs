//! Screenshot persistence
//!
//! Images are written under a directory acquired once at startup and named by
//! capture time at microsecond resolution. Two captures in the same
//! microsecond map to the same file and the later one overwrites the earlier.
//! Files are always PNG; other formats are transcoded before writing.

use crate::types::{AppError, AppResult, ImageData};
use bytes::Bytes;
use chrono::{DateTime, Local};
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Source of capture timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A screenshot written to disk and the public path it is served under
#[derive(Debug, Clone, PartialEq)]
pub struct SavedImage {
    pub file_path: PathBuf,
    pub web_path: String,
}

pub struct ScreenshotStore {
    dir: PathBuf,
    web_prefix: String,
    clock: Arc<dyn Clock>,
}

impl ScreenshotStore {
    /// Create the output directory (and parents) if needed
    pub fn acquire(dir: impl Into<PathBuf>, web_prefix: &str) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!(path = %dir.display(), "Screenshots directory ready");

        Ok(Self {
            dir,
            web_prefix: web_prefix.trim_end_matches('/').to_string(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `screenshot_<YYYYMMDD_HHMMSS_microseconds>.png`
    pub fn file_name_at(timestamp: DateTime<Local>) -> String {
        timestamp.format("screenshot_%Y%m%d_%H%M%S_%6f.png").to_string()
    }

    pub async fn save(&self, image: &ImageData) -> AppResult<SavedImage> {
        let png = if image.is_png() {
            image.bytes.clone()
        } else {
            let source = image.bytes.clone();
            let media_type = image.media_type.clone();
            tokio::task::spawn_blocking(move || transcode_to_png(&source, &media_type))
                .await
                .map_err(|e| AppError::Internal(format!("PNG encoding task failed: {}", e)))??
        };

        let file_name = Self::file_name_at(self.clock.now());
        let file_path = self.dir.join(&file_name);
        tokio::fs::write(&file_path, &png).await?;

        let web_path = format!("{}/{}", self.web_prefix, file_name);
        debug!(path = %file_path.display(), web_path = %web_path, "Saved screenshot");

        Ok(SavedImage { file_path, web_path })
    }
}

fn transcode_to_png(source: &[u8], media_type: &str) -> AppResult<Bytes> {
    let decoded = image::load_from_memory(source).map_err(|e| {
        AppError::InvalidRequest(format!("screenshot ({}) could not be decoded: {}", media_type, e))
    })?;
    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("PNG encoding failed: {}", e)))?;
    debug!(media_type, "Transcoded screenshot to PNG");
    Ok(Bytes::from(out.into_inner()))
}
