//! Run Configuration - One Immutable Value, Threaded Explicitly
//!
//! The CLI layer owns parsing and validation; the core receives a single
//! `BatchConfig` and never reads ambient state. Enumerated options are
//! real enums so invalid values die at the argument parser.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    Macos,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    H264,
    Quicktime,
}

impl VideoFormat {
    /// Format name as the host's render dialog spells it.
    pub fn host_name(&self) -> &'static str {
        match self {
            VideoFormat::H264 => "H.264",
            VideoFormat::Quicktime => "QuickTime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    Medium,
    High,
}

impl QualityPreset {
    pub fn host_name(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low Quality",
            QualityPreset::Medium => "Medium Quality",
            QualityPreset::High => "High Quality",
        }
    }
}

/// Named target size for video export. `Document` defers to the native
/// document dimensions; explicit width+height in `VideoConfig` overrides
/// whichever preset is named here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SizePreset {
    Document,
    Hd720,
    Hd1080,
    Uhd4k,
}

impl SizePreset {
    pub fn host_name(&self) -> &'static str {
        match self {
            SizePreset::Document => "document",
            SizePreset::Hd720 => "HDTV 720p",
            SizePreset::Hd1080 => "HDTV 1080p",
            SizePreset::Uhd4k => "UHD 4K",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AspectMode {
    Document,
    Square,
    Widescreen,
}

impl AspectMode {
    pub fn host_name(&self) -> &'static str {
        match self {
            AspectMode::Document => "document",
            AspectMode::Square => "1:1",
            AspectMode::Widescreen => "16:9",
        }
    }
}

/// Video export settings; present only when the run renders video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    pub format: VideoFormat,
    pub preset: QualityPreset,
    pub size: SizePreset,
    pub aspect: AspectMode,
    /// Both present -> fixed custom-size directive overriding `size`.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl VideoConfig {
    /// Explicit dimensions only count when both are supplied.
    pub fn explicit_dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

fn default_bounds_timeout() -> u64 {
    300
}

fn default_batch_timeout() -> u64 {
    1800
}

/// Everything a run needs, validated upstream, immutable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// The layered template document, consumed read-only.
    pub template: PathBuf,
    /// CSV data set.
    pub data: PathBuf,
    /// Directory image column values resolve against.
    pub image_root: PathBuf,
    /// Scratch directory for reports and the generated script.
    pub work_dir: PathBuf,
    /// Overrides every record's `output` column when set.
    #[serde(default)]
    pub output_override: Option<PathBuf>,
    /// Host application identifier (bundle name on macOS, executable path
    /// on Windows).
    pub host_app: String,
    pub platform: HostPlatform,
    #[serde(default = "default_bounds_timeout")]
    pub bounds_timeout_secs: u64,
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_secs: u64,
    #[serde(default)]
    pub video: Option<VideoConfig>,
}

impl BatchConfig {
    /// Output directory for a record: the global override wins, then the
    /// record's own `output` column, then the work directory.
    pub fn output_dir_for(&self, record_output: Option<&PathBuf>) -> PathBuf {
        if let Some(dir) = &self.output_override {
            return dir.clone();
        }
        if let Some(dir) = record_output {
            return dir.clone();
        }
        self.work_dir.clone()
    }

    /// Template file stem used to name per-record outputs.
    pub fn template_stem(&self) -> String {
        self.template
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BatchConfig {
        BatchConfig {
            template: PathBuf::from("/tpl/banner.psd"),
            data: PathBuf::from("/data/rows.csv"),
            image_root: PathBuf::from("/assets"),
            work_dir: PathBuf::from("/work"),
            output_override: None,
            host_app: "Adobe Photoshop 2024".to_string(),
            platform: HostPlatform::Macos,
            bounds_timeout_secs: default_bounds_timeout(),
            batch_timeout_secs: default_batch_timeout(),
            video: None,
        }
    }

    #[test]
    fn override_beats_record_output() {
        let mut cfg = config();
        cfg.output_override = Some(PathBuf::from("/forced"));
        let record = Some(PathBuf::from("/per-row"));
        assert_eq!(cfg.output_dir_for(record.as_ref()), PathBuf::from("/forced"));

        cfg.output_override = None;
        assert_eq!(cfg.output_dir_for(record.as_ref()), PathBuf::from("/per-row"));
        assert_eq!(cfg.output_dir_for(None), PathBuf::from("/work"));
    }

    #[test]
    fn explicit_dimensions_need_both_axes() {
        let mut video = VideoConfig {
            format: VideoFormat::H264,
            preset: QualityPreset::High,
            size: SizePreset::Hd1080,
            aspect: AspectMode::Document,
            width: Some(1920),
            height: None,
        };
        assert_eq!(video.explicit_dimensions(), None);
        video.height = Some(1080);
        assert_eq!(video.explicit_dimensions(), Some((1920, 1080)));
    }
}
