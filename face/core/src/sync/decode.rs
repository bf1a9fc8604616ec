//! Icon decoding backed by the `image` crate

use image::imageops::FilterType;

use crate::error::SyncError;
use crate::host::IconDecoder;
use crate::presentation::IconImage;

/// Decodes PNG, JPEG, GIF, BMP and WebP and scales without filtering
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageIconDecoder;

impl IconDecoder for ImageIconDecoder {
    fn decode_and_scale(&self, bytes: &[u8], size: u32) -> Result<IconImage, SyncError> {
        if size == 0 {
            return Err(SyncError::DecodeFailure(
                "icon size must be positive".to_string(),
            ));
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| SyncError::DecodeFailure(e.to_string()))?;

        // Unfiltered, matching the host bitmap scaler
        let scaled = decoded.resize_exact(size, size, FilterType::Nearest);
        IconImage::from_rgba(size, size, scaled.to_rgba8().into_raw())
    }
}
