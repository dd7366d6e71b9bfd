//! Instruction Model - Typed Edits, Serialized Elsewhere
//!
//! One record compiles to an ordered instruction sequence against a fresh
//! copy of the template. The sequence is fixed: open copy, one group per
//! column in row-declaration order, save, export, close. Instructions are
//! never reordered or batched across records; failure isolation happens
//! in the serialized guarded blocks, not here.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{BatchConfig, VideoConfig};
use crate::records::{Binding, Record};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Instruction {
    /// Open the template and work on a duplicate; the template itself is
    /// never mutated.
    OpenCopy { template: PathBuf },
    /// Replace an image-capable slot's content and reset its transform.
    ReplaceImage { slot: String, asset: String },
    /// Put text into the first text-capable slot inside the target's
    /// nested document; warning-only no-op when none exists.
    SetNestedText { slot: String, text: String },
    /// Replace a slot's own text content; no-op when the slot is not
    /// text-capable.
    SetDirectText { slot: String, text: String },
    SaveAs { path: PathBuf },
    ExportVideo {
        dir: PathBuf,
        file_name: String,
        video: VideoConfig,
    },
    CloseDocument,
}

/// Output document name for a record: template stem plus record id.
pub fn output_stem(cfg: &BatchConfig, record: &Record) -> String {
    format!("{}_{}", cfg.template_stem(), record.product_id)
}

/// Compile one (post-resize) record into its instruction sequence.
pub fn compile_record(record: &Record, cfg: &BatchConfig) -> Vec<Instruction> {
    let stem = output_stem(cfg, record);
    let out_dir = cfg.output_dir_for(record.output_dir.as_ref());

    let mut instructions = vec![Instruction::OpenCopy {
        template: cfg.template.clone(),
    }];

    for (column, value) in &record.columns {
        let instruction = match Binding::classify(column) {
            Binding::Image { slot } => Instruction::ReplaceImage {
                slot,
                asset: value.clone(),
            },
            Binding::NestedText { slot } => Instruction::SetNestedText {
                slot,
                text: value.clone(),
            },
            Binding::DirectText { slot } => Instruction::SetDirectText {
                slot,
                text: value.clone(),
            },
        };
        instructions.push(instruction);
    }

    instructions.push(Instruction::SaveAs {
        path: out_dir.join(format!("{}.psd", stem)),
    });
    if let Some(video) = &cfg.video {
        instructions.push(Instruction::ExportVideo {
            dir: out_dir,
            file_name: stem,
            video: video.clone(),
        });
    }
    instructions.push(Instruction::CloseDocument);
    instructions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AspectMode, HostPlatform, QualityPreset, SizePreset, VideoFormat};

    fn config(video: bool) -> BatchConfig {
        BatchConfig {
            template: PathBuf::from("/tpl/banner.psd"),
            data: PathBuf::from("/data/rows.csv"),
            image_root: PathBuf::from("/assets"),
            work_dir: PathBuf::from("/work"),
            output_override: None,
            host_app: "Adobe Photoshop 2024".to_string(),
            platform: HostPlatform::Macos,
            bounds_timeout_secs: 300,
            batch_timeout_secs: 1800,
            video: video.then(|| VideoConfig {
                format: VideoFormat::H264,
                preset: QualityPreset::High,
                size: SizePreset::Hd1080,
                aspect: AspectMode::Document,
                width: None,
                height: None,
            }),
        }
    }

    fn record() -> Record {
        Record {
            row: 1,
            product_id: "sku-7".into(),
            output_dir: Some(PathBuf::from("/out/seven")),
            columns: vec![
                ("Image 1".into(), "/assets/_fitted/sku-7_Image 1.png".into()),
                ("txt_Title".into(), "Summer Sale".into()),
                ("Subtitle".into(), "Now on".into()),
            ],
        }
    }

    #[test]
    fn sequence_order_is_fixed() {
        let seq = compile_record(&record(), &config(true));
        assert!(matches!(seq[0], Instruction::OpenCopy { .. }));
        assert_eq!(
            seq[1],
            Instruction::ReplaceImage {
                slot: "Image 1".into(),
                asset: "/assets/_fitted/sku-7_Image 1.png".into()
            }
        );
        assert_eq!(
            seq[2],
            Instruction::SetNestedText {
                slot: "Title".into(),
                text: "Summer Sale".into()
            }
        );
        assert_eq!(
            seq[3],
            Instruction::SetDirectText {
                slot: "Subtitle".into(),
                text: "Now on".into()
            }
        );
        assert_eq!(
            seq[4],
            Instruction::SaveAs {
                path: PathBuf::from("/out/seven/banner_sku-7.psd")
            }
        );
        assert!(matches!(seq[5], Instruction::ExportVideo { .. }));
        assert_eq!(seq[6], Instruction::CloseDocument);
    }

    #[test]
    fn no_video_config_means_no_export_instruction() {
        let seq = compile_record(&record(), &config(false));
        assert!(!seq
            .iter()
            .any(|i| matches!(i, Instruction::ExportVideo { .. })));
        assert_eq!(*seq.last().unwrap(), Instruction::CloseDocument);
    }

    #[test]
    fn rows_with_same_id_but_different_output_diverge() {
        let cfg = config(false);
        let mut a = record();
        let mut b = record();
        a.output_dir = Some(PathBuf::from("/out/a"));
        b.output_dir = Some(PathBuf::from("/out/b"));
        let save_a = compile_record(&a, &cfg);
        let save_b = compile_record(&b, &cfg);
        assert_eq!(
            save_a[4],
            Instruction::SaveAs {
                path: PathBuf::from("/out/a/banner_sku-7.psd")
            }
        );
        assert_eq!(
            save_b[4],
            Instruction::SaveAs {
                path: PathBuf::from("/out/b/banner_sku-7.psd")
            }
        );
    }
}
