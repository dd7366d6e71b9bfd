//! LayerBatch Core - Visual Template Batch Compiler
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Bounds Are Extracted Exactly Once
//! 2. Validation Gates All Row Work
//! 3. Column Names Alone Decide Bindings
//! 4. Instructions Are Ordered And Guarded
//! 5. The Host Executes, The Engine Specifies

pub mod bounds;
pub mod config;
pub mod exec;
pub mod instructions;
pub mod pipeline;
pub mod records;
pub mod resize;
pub mod script;
pub mod slots;

pub use bounds::{BoundsMap, BoundsScan, ValidationOutcome};
pub use config::{AspectMode, BatchConfig, HostPlatform, SizePreset, VideoConfig, VideoFormat};
pub use exec::HostLauncher;
pub use instructions::{compile_record, Instruction};
pub use pipeline::{BatchPipeline, PipelineError, RowWarning, RunSummary};
pub use records::{load_records, required_slot_names, Binding, Record};
pub use slots::{Slot, SlotGeometry, SlotKind};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Columns that carry batch bookkeeping, never slot bindings.
pub const RESERVED_COLUMNS: [&str; 3] = ["id", "product_id", "output"];

/// Subdirectory of the image root holding resized derived assets.
pub const FITTED_DIR: &str = "_fitted";
