use candle_core::{DType, Device, Tensor};
use image::RgbImage;

use crate::error::Result;

/// Map VAE output in [-1, 1] to an 8-bit tensor in [0, 255]
pub fn denormalize(decoded: &Tensor) -> Result<Tensor> {
    let image = ((decoded / 2.)? + 0.5)?.to_device(&Device::Cpu)?;
    let image = (image.to_dtype(DType::F32)?.clamp(0f32, 1.)? * 255.)?;
    Ok(image.to_dtype(DType::U8)?)
}

/// Convert a `(3, height, width)` u8 tensor into an RGB image
pub fn tensor_to_rgb(tensor: &Tensor) -> Result<RgbImage> {
    let (channels, height, width) = tensor.dims3()?;
    if channels != 3 {
        return Err(candle_core::Error::Msg(format!(
            "expected 3 channels, got {:?}",
            tensor.dims()
        ))
        .into());
    }

    let pixels = tensor
        .to_device(&Device::Cpu)?
        .permute((1, 2, 0))?
        .flatten_all()?
        .to_vec1::<u8>()?;

    RgbImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        candle_core::Error::Msg(format!("pixel buffer does not fit {width}x{height}")).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StudioError;

    #[test]
    fn test_channels_first_to_interleaved() {
        // 2x1 image: red pixel then blue pixel
        let data: Vec<u8> = vec![255, 0, 0, 0, 0, 255];
        let tensor = Tensor::from_vec(data, (3, 1, 2), &Device::Cpu).unwrap();

        let img = tensor_to_rgb(&tensor).unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn test_denormalize_clamps() {
        let tensor = Tensor::new(&[[[-3.0f32, -1.0, 0.0, 1.0, 3.0]]], &Device::Cpu).unwrap();
        let out = denormalize(&tensor).unwrap();
        let values = out.flatten_all().unwrap().to_vec1::<u8>().unwrap();
        assert_eq!(values[0], 0);
        assert_eq!(values[1], 0);
        assert_eq!(values[3], 255);
        assert_eq!(values[4], 255);
        assert!((126..=128).contains(&values[2]));
    }

    #[test]
    fn test_wrong_channel_count() {
        let tensor = Tensor::zeros((4, 2, 2), DType::U8, &Device::Cpu).unwrap();
        assert!(matches!(
            tensor_to_rgb(&tensor),
            Err(StudioError::Candle(_))
        ));
    }
}
