//! retarget-export - mocap clip retargeting tool
//!
//! Converts skeletal animation clips authored against a mocap vendor's
//! bone naming onto a target skeleton template and writes the baked result
//! as GLB.

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use retarget_core::RetargetOptions;
use retarget_export::{batch, import};

#[derive(Parser)]
#[command(name = "retarget-export")]
#[command(about = "Mocap clip retargeting tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Root-motion transfer flags, all enabled by default. Pass an explicit
/// value to disable, e.g. `--use-rotation false`.
#[derive(Args)]
struct RetargetFlags {
    /// Transfer hip motion onto the target root
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    hips_to_root: bool,

    /// Transfer hip motion along the X axis
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    use_x: bool,

    /// Transfer hip motion along the Y axis
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    use_y: bool,

    /// Transfer vertical hip motion
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    use_z: bool,

    /// Transfer hip yaw onto the root
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    use_rotation: bool,

    /// Clamp the root to the ground plane
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    on_ground: bool,
}

impl From<&RetargetFlags> for RetargetOptions {
    fn from(flags: &RetargetFlags) -> Self {
        Self {
            hips_to_root: flags.hips_to_root,
            use_x: flags.use_x,
            use_y: flags.use_y,
            use_z: flags.use_z,
            use_rotation: flags.use_rotation,
            on_ground: flags.on_ground,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Retarget every supported clip in a directory
    Batch {
        /// Directory of input clips (glTF/GLB)
        input: PathBuf,

        /// Output directory for retargeted GLB files
        output: PathBuf,

        /// Target skeleton template file
        #[arg(short, long)]
        template: PathBuf,

        #[command(flatten)]
        flags: RetargetFlags,
    },

    /// Retarget a single clip file
    Single {
        /// Input clip (glTF/GLB)
        input: PathBuf,

        /// Output GLB file (default: input name with .glb next to it)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target skeleton template file
        #[arg(short, long)]
        template: PathBuf,

        #[command(flatten)]
        flags: RetargetFlags,
    },

    /// List the animations in a clip file
    List {
        /// Input clip (glTF/GLB)
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Batch {
            input,
            output,
            template,
            flags,
        } => {
            tracing::info!("Retargeting clips in {:?} -> {:?}", input, output);
            let count = batch::process_batch(&input, &output, &template, (&flags).into())?;
            tracing::info!("Converted {} file(s)", count);
        }

        Commands::Single {
            input,
            output,
            template,
            flags,
        } => {
            let written = batch::process_single(&input, output, &template, (&flags).into())?;
            tracing::info!("Converted {:?} -> {:?}", input, written);
        }

        Commands::List { input } => {
            import::list_animations(&input)?;
        }
    }

    Ok(())
}
