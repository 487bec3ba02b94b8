/// Text-to-image pipeline module
///
/// The diffusion model itself is an external component. This module wraps it
/// behind a small contract so the generator does not care which pretrained
/// pipeline, or which compute backend, produced an image.
///
/// Architecture:
/// - `device.rs` - backend selection and matching numeric precision
/// - `stable_diffusion.rs` - pretrained Stable Diffusion via candle
/// - `convert.rs` - decoded tensor to RGB image

pub mod convert;
pub mod device;
pub mod stable_diffusion;

pub use device::Backend;
pub use stable_diffusion::StableDiffusion;

use image::RgbImage;

use crate::error::Result;
use crate::state::GenerationParams;

/// A pretrained text-to-image pipeline loaded onto a device
pub trait ImagePipeline: Send {
    /// Identifier of the pretrained weights (e.g. a hub repository)
    fn model_id(&self) -> &str;

    /// Name of the compute backend the pipeline runs on
    fn device_name(&self) -> &str;

    /// Sample exactly one image
    ///
    /// Implementations must be deterministic for a given `seed` and
    /// parameter set.
    fn sample(&mut self, params: &GenerationParams, seed: u64) -> Result<RgbImage>;
}
