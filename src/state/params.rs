/// Sampling parameters for a single generation request
///
/// These are the values the form sliders and CLI flags edit. They are
/// validated once, before anything is handed to the diffusion pipeline.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::{Result, StudioError};

/// Prompt shown in a fresh form
pub const DEFAULT_PROMPT: &str = "A beautiful sunset over a mountain lake, digital art";

/// Slider range for inference steps
pub const STEPS_RANGE: RangeInclusive<u32> = 20..=100;

/// Slider range for guidance scale
pub const GUIDANCE_RANGE: RangeInclusive<f64> = 1.0..=20.0;

/// Seed offered when "Use custom seed" is ticked
pub const DEFAULT_SEED: u64 = 42;

/// All inputs to one generation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Free text prompt
    pub prompt: String,

    /// Number of denoising steps
    /// - More steps trade latency for quality
    /// - Recommended 20 to 100
    pub steps: u32,

    /// Classifier-free guidance scale
    /// - Higher values follow the prompt more closely
    /// - Values of 1.0 or below disable guidance
    pub guidance_scale: f64,

    /// Seed for reproducible output; `None` draws a fresh one per call
    pub seed: Option<u64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            steps: 50,
            guidance_scale: 7.5,
            seed: None,
        }
    }
}

impl GenerationParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Reject parameters the pipeline cannot sample with
    pub fn validate(&self) -> Result<()> {
        if self.prompt.is_empty() {
            return Err(StudioError::InvalidParams("prompt is empty".to_string()));
        }
        if self.steps == 0 {
            return Err(StudioError::InvalidParams(
                "steps must be positive".to_string(),
            ));
        }
        if !self.guidance_scale.is_finite() || self.guidance_scale <= 0.0 {
            return Err(StudioError::InvalidParams(format!(
                "guidance scale must be a positive number, got {}",
                self.guidance_scale
            )));
        }
        Ok(())
    }

    /// Whether classifier-free guidance is applied for these parameters
    pub fn uses_guidance(&self) -> bool {
        self.guidance_scale > 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_form() {
        let params = GenerationParams::default();
        assert_eq!(params.steps, 50);
        assert_eq!(params.guidance_scale, 7.5);
        assert_eq!(params.seed, None);
        assert!(STEPS_RANGE.contains(&params.steps));
        assert!(GUIDANCE_RANGE.contains(&params.guidance_scale));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let params = GenerationParams::new("");
        assert!(matches!(
            params.validate(),
            Err(StudioError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_zero_steps_rejected() {
        let mut params = GenerationParams::new("a fox");
        params.steps = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_bad_guidance_rejected() {
        let mut params = GenerationParams::new("a fox");
        params.guidance_scale = 0.0;
        assert!(params.validate().is_err());

        params.guidance_scale = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_guidance_threshold() {
        let mut params = GenerationParams::new("a fox");
        params.guidance_scale = 1.0;
        assert!(!params.uses_guidance());

        params.guidance_scale = 1.5;
        assert!(params.uses_guidance());
    }
}
