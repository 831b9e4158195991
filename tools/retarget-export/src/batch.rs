//! Batch driver: retarget every recognized clip in a directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use retarget_core::{
    bake_bones, rename_to_target, simplify, RetargetError, RetargetOptions, Scene,
};

use crate::export::export_clip;
use crate::import::{import_clip, import_template, is_clip_file};

/// Convert every supported clip in `input_dir` against the skeleton
/// template, writing one GLB per clip into `output_dir`.
///
/// Returns the number of files successfully converted. Files with an
/// unsupported extension are not clips and never counted; a clip without a
/// recognizable hip bone is logged, skipped and not counted, and the batch
/// carries on. IO and decode failures abort the whole batch.
pub fn process_batch(
    input_dir: &Path,
    output_dir: &Path,
    template: &Path,
    options: RetargetOptions,
) -> Result<usize> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read input directory: {:?}", input_dir))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut scene = Scene::new();
    let mut numfiles = 0;

    for file in files {
        if !is_clip_file(&file) {
            continue;
        }

        // Every clip is a transaction over the scene; reset is the commit.
        scene.reset();

        match convert_one(&mut scene, &file, template, output_dir, options) {
            Ok(output) => {
                tracing::info!("Converted {:?} -> {:?}", file, output);
                numfiles += 1;
            }
            Err(ConvertError::SkipClip(err)) => {
                tracing::warn!("Skipping {:?}: {}", file, err);
            }
            Err(ConvertError::Fatal(err)) => {
                scene.reset();
                return Err(err);
            }
        }

        scene.reset();
    }

    Ok(numfiles)
}

/// Convert a single clip file. `output` defaults to the input path with a
/// `.glb` extension next to the input.
pub fn process_single(
    input: &Path,
    output: Option<PathBuf>,
    template: &Path,
    options: RetargetOptions,
) -> Result<PathBuf> {
    let output_dir = output
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or_else(|| input.parent().unwrap_or(Path::new(".")))
        .to_path_buf();
    if !output_dir.as_os_str().is_empty() {
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;
    }

    let mut scene = Scene::new();
    scene.reset();
    let result = match output {
        Some(path) => convert_into(&mut scene, input, template, path, options),
        None => convert_one(&mut scene, input, template, &output_dir, options)
            .map_err(ConvertError::into_inner),
    };
    scene.reset();
    result
}

enum ConvertError {
    /// Fatal for this clip only; the batch should continue.
    SkipClip(RetargetError),
    Fatal(anyhow::Error),
}

impl ConvertError {
    fn into_inner(self) -> anyhow::Error {
        match self {
            Self::SkipClip(err) => err.into(),
            Self::Fatal(err) => err,
        }
    }
}

fn convert_one(
    scene: &mut Scene,
    file: &Path,
    template: &Path,
    output_dir: &Path,
    options: RetargetOptions,
) -> std::result::Result<PathBuf, ConvertError> {
    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("clip")
        .to_string();
    let output = output_dir.join(format!("{stem}.glb"));
    convert_into(scene, file, template, output, options).map_err(classify)
}

fn classify(err: anyhow::Error) -> ConvertError {
    match err.downcast::<RetargetError>() {
        Ok(err @ RetargetError::NoHipBone { .. }) => ConvertError::SkipClip(err),
        Ok(other) => ConvertError::Fatal(other.into()),
        Err(err) => ConvertError::Fatal(err),
    }
}

fn convert_into(
    scene: &mut Scene,
    file: &Path,
    template: &Path,
    output: PathBuf,
    options: RetargetOptions,
) -> Result<PathBuf> {
    // Fresh template per clip: its rest pose is never mutated across runs.
    let target = scene.add_armature(import_template(template)?);
    let source = scene.add_armature(import_clip(file)?);

    rename_to_target(scene.armature_mut(source));

    let act_name = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("clip")
        .replace(' ', "_");

    let (src, tgt) = scene.pair_mut(source, target)?;
    bake_bones(src, tgt, &act_name, options)?;

    // Drop the mocap rig before export; only the baked target remains.
    scene.remove_armature(source);
    let target_armature = scene.armature_mut(target);
    if let Some(action) = target_armature.action.as_mut() {
        simplify(action);
    }

    export_clip(&output, scene.armature(target))?;
    Ok(output)
}
