/// Pretrained Stable Diffusion pipeline
///
/// This module manages everything needed to sample from a hub checkpoint:
/// - Weight download through the Hugging Face cache
/// - CLIP text encoder, UNet and VAE construction on the chosen device
/// - Seeded initial latents
/// - The denoising loop and VAE decode

use std::path::PathBuf;
use std::time::Instant;

use candle_core::{DType, Device, Module, Tensor};
use candle_transformers::models::stable_diffusion::{
    self, clip::ClipTextTransformer, unet_2d::UNet2DConditionModel, vae::AutoEncoderKL,
    StableDiffusionConfig,
};
use hf_hub::api::sync::{Api, ApiRepo};
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use super::convert::{denormalize, tensor_to_rgb};
use super::{Backend, ImagePipeline};
use crate::error::{Result, StudioError};
use crate::state::GenerationParams;

/// Hub repository of the default pipeline
///
/// The `runwayml` repository has been taken down; on a fresh cache set
/// `model_id` to the community mirror [`V1_5_MIRROR_ID`] instead.
pub const DEFAULT_MODEL_ID: &str = "runwayml/stable-diffusion-v1-5";

/// Mirror of the v1.5 weights with the same diffusers layout
pub const V1_5_MIRROR_ID: &str = "stable-diffusion-v1-5/stable-diffusion-v1-5";

/// Repository holding the CLIP tokenizer shared by v1.5 and v2.1
const TOKENIZER_REPO: &str = "openai/clip-vit-base-patch32";

/// Scaling factor between VAE latents and UNet latents
const VAE_SCALE: f64 = 0.18215;

/// Latent channels expected by the UNet
const LATENT_CHANNELS: usize = 4;

/// Supported Stable Diffusion architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdVersion {
    V1_5,
    V2_1,
}

impl SdVersion {
    /// Resolve the architecture from a hub model identifier
    pub fn from_model_id(model_id: &str) -> Result<Self> {
        let lower = model_id.to_lowercase();
        if lower.contains("stable-diffusion-v1-5") {
            Ok(SdVersion::V1_5)
        } else if lower.contains("stable-diffusion-2-1") {
            Ok(SdVersion::V2_1)
        } else {
            Err(StudioError::UnknownModel(model_id.to_string()))
        }
    }

    fn config(self, sliced_attention_size: Option<usize>) -> StableDiffusionConfig {
        match self {
            SdVersion::V1_5 => StableDiffusionConfig::v1_5(sliced_attention_size, None, None),
            SdVersion::V2_1 => StableDiffusionConfig::v2_1(sliced_attention_size, None, None),
        }
    }
}

/// Weight files inside a diffusers-layout repository
#[derive(Debug, Clone, Copy)]
enum WeightFile {
    TextEncoder,
    Unet,
    Vae,
}

impl WeightFile {
    fn repo_path(self, use_f16: bool) -> &'static str {
        match (self, use_f16) {
            (WeightFile::TextEncoder, false) => "text_encoder/model.safetensors",
            (WeightFile::TextEncoder, true) => "text_encoder/model.fp16.safetensors",
            (WeightFile::Unet, false) => "unet/diffusion_pytorch_model.safetensors",
            (WeightFile::Unet, true) => "unet/diffusion_pytorch_model.fp16.safetensors",
            (WeightFile::Vae, false) => "vae/diffusion_pytorch_model.safetensors",
            (WeightFile::Vae, true) => "vae/diffusion_pytorch_model.fp16.safetensors",
        }
    }

    fn fetch(self, repo: &ApiRepo, use_f16: bool) -> Result<PathBuf> {
        let file = self.repo_path(use_f16);
        debug!("Fetching {}", file);
        Ok(repo.get(file)?)
    }
}

/// Stable Diffusion loaded onto one device
pub struct StableDiffusion {
    model_id: String,
    backend: Backend,
    device: Device,
    dtype: DType,
    config: StableDiffusionConfig,
    tokenizer: Tokenizer,
    pad_id: u32,
    text_model: ClipTextTransformer,
    unet: UNet2DConditionModel,
    vae: AutoEncoderKL,
}

impl StableDiffusion {
    /// Download (or reuse cached) weights and build the pipeline
    ///
    /// This is slow: expect minutes on first run while weights download,
    /// and several seconds afterwards while they load.
    pub fn load(
        model_id: &str,
        backend: Backend,
        sliced_attention_size: Option<usize>,
    ) -> Result<Self> {
        let start = Instant::now();
        let version = SdVersion::from_model_id(model_id)?;
        let device = backend.device()?;
        let dtype = backend.dtype();
        let config = version.config(sliced_attention_size);

        info!("📦 Loading {} ({:?}) onto {}", model_id, version, backend);

        let api = Api::new()?;
        let repo = api.model(model_id.to_string());

        let tokenizer_file = api.model(TOKENIZER_REPO.to_string()).get("tokenizer.json")?;
        let tokenizer = Tokenizer::from_file(tokenizer_file)
            .map_err(|e| StudioError::Tokenizer(e.to_string()))?;
        let pad_token = config.clip.pad_with.as_deref().unwrap_or("<|endoftext|>");
        let pad_id = *tokenizer.get_vocab(true).get(pad_token).ok_or_else(|| {
            StudioError::Tokenizer(format!("pad token {pad_token} missing from vocabulary"))
        })?;

        // Text encoder stays F32; embeddings are cast in encode_prompt
        let clip_weights = WeightFile::TextEncoder.fetch(&repo, false)?;
        let text_model = stable_diffusion::build_clip_transformer(
            &config.clip,
            clip_weights,
            &device,
            DType::F32,
        )?;

        let unet_weights = WeightFile::Unet.fetch(&repo, backend.uses_f16())?;
        let unet = config.build_unet(unet_weights, &device, LATENT_CHANNELS, false, dtype)?;

        let vae_weights = WeightFile::Vae.fetch(&repo, backend.uses_f16())?;
        let vae = config.build_vae(vae_weights, &device, dtype)?;

        info!(
            "✅ Pipeline ready in {:.1}s ({}x{})",
            start.elapsed().as_secs_f64(),
            config.width,
            config.height
        );

        Ok(StableDiffusion {
            model_id: model_id.to_string(),
            backend,
            device,
            dtype,
            config,
            tokenizer,
            pad_id,
            text_model,
            unet,
            vae,
        })
    }

    /// Tokenize and pad (or truncate) a prompt to the encoder context length
    fn tokenize(&self, prompt: &str) -> Result<Tensor> {
        let max_len = self.config.clip.max_position_embeddings;
        let mut tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| StudioError::Tokenizer(e.to_string()))?
            .get_ids()
            .to_vec();

        if tokens.len() > max_len {
            warn!(
                "Prompt is {} tokens, truncating to {}",
                tokens.len(),
                max_len
            );
            tokens.truncate(max_len);
        }
        tokens.resize(max_len, self.pad_id);

        Ok(Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?)
    }

    /// Text embeddings, with the unconditional embedding stacked first when
    /// guidance is on
    fn encode_prompt(&self, prompt: &str, guided: bool) -> Result<Tensor> {
        let text = self.text_model.forward(&self.tokenize(prompt)?)?;
        let embeddings = if guided {
            let uncond = self.text_model.forward(&self.tokenize("")?)?;
            Tensor::cat(&[uncond, text], 0)?
        } else {
            text
        };
        Ok(embeddings.to_dtype(self.dtype)?)
    }

    /// Initial latent noise drawn from a seeded generator
    ///
    /// Noise is drawn on the CPU and moved to the device so the same seed
    /// gives the same starting point on every backend.
    fn initial_latents(&self, seed: u64, init_noise_sigma: f64) -> Result<Tensor> {
        let shape = (
            1,
            LATENT_CHANNELS,
            self.config.height / 8,
            self.config.width / 8,
        );
        let count = shape.0 * shape.1 * shape.2 * shape.3;

        let mut rng = StdRng::seed_from_u64(seed);
        let noise: Vec<f32> = (0..count)
            .map(|_| StandardNormal.sample(&mut rng))
            .collect();

        let latents = Tensor::from_vec(noise, shape, &Device::Cpu)?.to_device(&self.device)?;
        Ok((latents * init_noise_sigma)?.to_dtype(self.dtype)?)
    }
}

impl ImagePipeline for StableDiffusion {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn device_name(&self) -> &str {
        self.backend.as_str()
    }

    fn sample(&mut self, params: &GenerationParams, seed: u64) -> Result<RgbImage> {
        let start = Instant::now();
        let guided = params.uses_guidance();

        let mut scheduler = self.config.build_scheduler(params.steps as usize)?;
        let text_embeddings = self.encode_prompt(&params.prompt, guided)?;
        let mut latents = self.initial_latents(seed, scheduler.init_noise_sigma())?;

        let timesteps = scheduler.timesteps().to_vec();
        for (index, &timestep) in timesteps.iter().enumerate() {
            let step_start = Instant::now();

            let model_input = if guided {
                Tensor::cat(&[&latents, &latents], 0)?
            } else {
                latents.clone()
            };
            let model_input = scheduler.scale_model_input(model_input, timestep)?;
            let noise_pred = self
                .unet
                .forward(&model_input, timestep as f64, &text_embeddings)?;

            let noise_pred = if guided {
                let chunks = noise_pred.chunk(2, 0)?;
                let (uncond, text) = (&chunks[0], &chunks[1]);
                (uncond + ((text - uncond)? * params.guidance_scale)?)?
            } else {
                noise_pred
            };

            latents = scheduler.step(&noise_pred, timestep, &latents)?;
            debug!(
                "step {}/{} done in {:.2}s",
                index + 1,
                timesteps.len(),
                step_start.elapsed().as_secs_f64()
            );
        }

        let decoded = self.vae.decode(&(latents / VAE_SCALE)?)?;
        let image = denormalize(&decoded)?.squeeze(0)?;
        debug!("decoded image dims {:?}", image.dims());
        let image = tensor_to_rgb(&image)?;

        info!(
            "🎨 Sampled {} steps in {:.1}s",
            params.steps,
            start.elapsed().as_secs_f64()
        );
        Ok(image)
    }
}

// Implement Debug without dumping model weights
impl std::fmt::Debug for StableDiffusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StableDiffusion")
            .field("model_id", &self.model_id)
            .field("backend", &self.backend)
            .field("dtype", &self.dtype)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_from_model_id() {
        assert_eq!(
            SdVersion::from_model_id(DEFAULT_MODEL_ID).unwrap(),
            SdVersion::V1_5
        );
        assert_eq!(
            SdVersion::from_model_id(V1_5_MIRROR_ID).unwrap(),
            SdVersion::V1_5
        );
        assert_eq!(
            SdVersion::from_model_id("stabilityai/stable-diffusion-2-1").unwrap(),
            SdVersion::V2_1
        );
        assert!(matches!(
            SdVersion::from_model_id("acme/not-a-diffusion-model"),
            Err(StudioError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_weight_paths_follow_precision() {
        assert_eq!(
            WeightFile::Unet.repo_path(true),
            "unet/diffusion_pytorch_model.fp16.safetensors"
        );
        assert_eq!(
            WeightFile::Vae.repo_path(false),
            "vae/diffusion_pytorch_model.safetensors"
        );
    }

    #[test]
    fn test_default_resolution() {
        let v1 = SdVersion::V1_5.config(None);
        assert_eq!((v1.width, v1.height), (512, 512));
        let v2 = SdVersion::V2_1.config(None);
        assert_eq!((v2.width, v2.height), (768, 768));
    }
}
