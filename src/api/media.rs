//! The media upload collaborator's report shapes.
//!
//! Uploads themselves go straight from the UI to the media service; this
//! module only models the report that comes back and its conversion into the
//! values embedded in later mutations: a lecture's `videoInfo` and a
//! course's `courseThumbnail` URL.

use serde::{Deserialize, Serialize};

/// The uploaded video reference embedded in an `updateLecture` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub video_url: String,
    pub public_id: String,
}

/// The asset record inside a successful upload report.
///
/// Field names are the media service's, which speaks snake_case unlike the
/// course API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedMedia {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    pub public_id: String,
}

impl UploadedMedia {
    /// The asset URL, preferring the TLS variant.
    #[must_use]
    pub fn best_url(&self) -> Option<&str> {
        self.secure_url.as_deref().or(self.url.as_deref())
    }
}

/// What the media service reports after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReport {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<UploadedMedia>,
}

impl UploadReport {
    /// Converts a successful video upload into the `videoInfo` value for an
    /// `updateLecture` body. `None` when the upload failed or reported no
    /// usable URL.
    #[must_use]
    pub fn video_info(&self) -> Option<VideoInfo> {
        if !self.success {
            return None;
        }
        let media = self.data.as_ref()?;
        Some(VideoInfo {
            video_url: media.best_url()?.to_string(),
            public_id: media.public_id.clone(),
        })
    }

    /// The thumbnail URL for an `updateCourse` body, when the upload
    /// succeeded.
    #[must_use]
    pub fn thumbnail_url(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.data.as_ref()?.best_url()
    }
}
