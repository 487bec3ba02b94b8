/// Generation orchestrator
///
/// Owns one loaded pipeline for the life of the process and turns
/// (prompt, parameters) into an image, then into a published image + record.

use image::RgbImage;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::Result;
use crate::output::{naming, OutputDirs, Published};
use crate::pipeline::stable_diffusion::{DEFAULT_MODEL_ID, V1_5_MIRROR_ID};
use crate::pipeline::{Backend, ImagePipeline, StableDiffusion};
use crate::state::{GenerationParams, GenerationRecord};

/// An image fresh out of the pipeline, with the seed it was sampled from
#[derive(Debug, Clone)]
pub struct Generated {
    pub image: RgbImage,
    pub seed: u64,
}

/// Explicitly owned generation context
pub struct Generator<P: ImagePipeline = StableDiffusion> {
    pipeline: P,
    outputs: OutputDirs,
}

impl Generator<StableDiffusion> {
    /// Select a backend and load the configured pretrained pipeline
    ///
    /// Blocking and slow; call once per process.
    pub fn load(config: &AppConfig) -> Result<Self> {
        let backend = Backend::detect(config.force_cpu);
        let pipeline =
            StableDiffusion::load(&config.model_id, backend, config.sliced_attention_size)
                .inspect_err(|_| {
                    if config.model_id == DEFAULT_MODEL_ID {
                        warn!("If the download failed, try --model-id {}", V1_5_MIRROR_ID);
                    }
                })?;
        Ok(Generator::new(pipeline, config.output_dirs()))
    }
}

impl<P: ImagePipeline> Generator<P> {
    pub fn new(pipeline: P, outputs: OutputDirs) -> Self {
        Self { pipeline, outputs }
    }

    pub fn model_id(&self) -> &str {
        self.pipeline.model_id()
    }

    pub fn device_name(&self) -> &str {
        self.pipeline.device_name()
    }

    /// Generate one image
    ///
    /// With `params.seed` set the result is reproducible; otherwise a fresh
    /// seed is drawn for this call. Pipeline errors propagate unchanged.
    pub fn generate(&mut self, params: &GenerationParams) -> Result<Generated> {
        params.validate()?;
        let seed = params.seed.unwrap_or_else(rand::random);

        info!(
            "🎨 Generating: steps={} guidance={} seed={}{}",
            params.steps,
            params.guidance_scale,
            seed,
            if params.seed.is_some() { "" } else { " (random)" }
        );

        let image = self.pipeline.sample(params, seed)?;
        Ok(Generated { image, seed })
    }

    /// Write the image and its metadata record, returning both paths
    pub fn persist(&self, image: &RgbImage, prompt: &str) -> Result<Published> {
        let record = GenerationRecord {
            timestamp: naming::timestamp_now(),
            prompt: prompt.to_string(),
            model_id: self.model_id().to_string(),
            device: self.device_name().to_string(),
            image_path: String::new(),
        };
        self.outputs.publish(image, record)
    }

    /// Generate and persist in one go
    pub fn generate_and_persist(
        &mut self,
        params: &GenerationParams,
    ) -> Result<(Generated, Published)> {
        let generated = self.generate(params)?;
        let published = self.persist(&generated.image, &params.prompt)?;
        Ok((generated, published))
    }
}
