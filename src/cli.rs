/// Command line surface
///
/// Without a subcommand the interactive window opens; the subcommands are
/// headless versions of the same operations.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::archive::{self, reconcile, sheet};
use crate::config::{default_config_path, AppConfig};
use crate::generator::Generator;
use crate::state::params::{GenerationParams, DEFAULT_PROMPT};

#[derive(Parser, Debug)]
#[command(
    name = "sd-studio",
    about = "Generate images from text prompts and browse what you generated",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file (defaults to <config dir>/sd-studio/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Hub identifier of the pretrained pipeline
    #[arg(long, global = true)]
    pub model_id: Option<String>,

    /// Run on CPU even when an accelerator is available
    #[arg(long, global = true)]
    pub cpu: bool,

    /// Directory for generated images
    #[arg(long, global = true)]
    pub images_dir: Option<PathBuf>,

    /// Directory for metadata records
    #[arg(long, global = true)]
    pub metadata_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the interactive generator and gallery
    Ui,

    /// Generate one image and save it with its metadata
    Generate {
        /// Text prompt
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,

        /// Number of inference steps
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
        steps: u32,

        /// Guidance scale
        #[arg(long, default_value_t = 7.5)]
        guidance_scale: f64,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Export the gallery grid as a single contact-sheet image
    Gallery {
        /// Output image file
        #[arg(long, default_value = "gallery.png")]
        output: PathBuf,

        /// Columns in the grid (defaults to the configured value)
        #[arg(long)]
        columns: Option<usize>,

        /// Edge length of each tile in pixels
        #[arg(
            long,
            default_value_t = sheet::TILE_SIZE,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        tile_size: u32,
    },

    /// Print archive statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List generated images that have no metadata record
    Reconcile,

    /// Write the effective configuration to the config file
    InitConfig,
}

impl Cli {
    /// Config file values with command line overrides applied
    pub fn resolve_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref()).context("loading config")?;

        if let Some(model_id) = &self.model_id {
            config.model_id = model_id.clone();
        }
        if self.cpu {
            config.force_cpu = true;
        }
        if let Some(dir) = &self.images_dir {
            config.images_dir = dir.clone();
        }
        if let Some(dir) = &self.metadata_dir {
            config.metadata_dir = dir.clone();
        }

        Ok(config)
    }
}

pub fn run_generate(config: &AppConfig, params: GenerationParams) -> anyhow::Result<()> {
    params.validate()?;

    let mut generator = Generator::load(config).context("loading pipeline")?;
    let (generated, published) = generator.generate_and_persist(&params)?;

    info!("Seed used: {}", generated.seed);
    println!("Image saved to: {}", published.image_path.display());
    println!("Metadata saved to: {}", published.metadata_path.display());
    Ok(())
}

pub fn run_gallery(
    config: &AppConfig,
    output: PathBuf,
    columns: Option<usize>,
    tile_size: u32,
) -> anyhow::Result<()> {
    let records = archive::load_metadata(&config.metadata_dir)?;
    let layout = archive::render_gallery(&records, columns.unwrap_or(config.gallery_columns));
    sheet::export_contact_sheet(&layout, tile_size, &output)?;

    println!(
        "Gallery of {} records ({} rows) saved to: {}",
        records.len(),
        layout.rows(),
        output.display()
    );
    Ok(())
}

pub fn run_stats(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let stats = archive::compute_stats(&config.metadata_dir)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", stats);
    }
    Ok(())
}

pub fn run_reconcile(config: &AppConfig) -> anyhow::Result<()> {
    let orphans = reconcile::find_orphans(&config.output_dirs())?;
    if orphans.is_empty() {
        println!("No orphaned images.");
    } else {
        for path in &orphans {
            println!("{}", path.display());
        }
        println!("{} image(s) without metadata", orphans.len());
    }
    Ok(())
}

pub fn run_init_config(config: &AppConfig, path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    config.save(&path)?;
    println!("Config written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["sd-studio", "generate"]).unwrap();
        match cli.command {
            Some(Command::Generate {
                prompt,
                steps,
                guidance_scale,
                seed,
            }) => {
                assert_eq!(prompt, DEFAULT_PROMPT);
                assert_eq!(steps, 50);
                assert_eq!(guidance_scale, 7.5);
                assert_eq!(seed, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_zero_steps_rejected() {
        assert!(Cli::try_parse_from(["sd-studio", "generate", "--steps", "0"]).is_err());
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        assert!(Cli::try_parse_from(["sd-studio", "gallery", "--tile-size", "0"]).is_err());
        assert!(Cli::try_parse_from(["sd-studio", "gallery", "--tile-size", "64"]).is_ok());
    }

    #[test]
    fn test_overrides_apply() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        let cli = Cli::try_parse_from([
            "sd-studio",
            "stats",
            "--config",
            config_path.to_str().unwrap(),
            "--cpu",
            "--metadata-dir",
            "elsewhere/metadata",
        ])
        .unwrap();

        let config = cli.resolve_config().unwrap();
        assert!(config.force_cpu);
        assert_eq!(config.metadata_dir, PathBuf::from("elsewhere/metadata"));
        assert_eq!(config.images_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_no_subcommand_means_ui() {
        let cli = Cli::try_parse_from(["sd-studio"]).unwrap();
        assert!(cli.command.is_none());
    }
}
