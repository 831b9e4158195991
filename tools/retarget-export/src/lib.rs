//! retarget-export library
//!
//! Clip I/O and the batch driver around the retarget-core pipeline, usable
//! from other tools as well as the CLI binary.

pub mod batch;
pub mod export;
pub mod import;

pub use batch::{process_batch, process_single};
pub use export::export_clip;
pub use import::{
    import_clip, import_template, is_clip_file, list_animations, CLIP_EXTENSIONS, FRAME_RATE,
};
