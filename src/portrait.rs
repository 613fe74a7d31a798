//! Portrait extraction from DG2.
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use simplelog::{debug, warn};
use std::io::{self, Read};

use crate::types::{BiometricImageFormat, EFDG2_3_4};

/// Portraits are scaled to fit in this box, aspect ratio kept.
pub const PORTRAIT_MAX_WIDTH: u32 = 240;
pub const PORTRAIT_MAX_HEIGHT: u32 = 270;

/// Reads exactly `len` bytes, however the reader chooses to split them up.
///
/// A short read is not the end of the stream. Only a read of zero bytes before `len`
/// is reached counts as one, and is reported as `UnexpectedEof`.
pub fn read_exact_len<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;
    return Ok(buffer);
}

/// Decodes `len` image bytes from `reader` and scales the result for display.
pub fn decode_portrait<R: Read>(
    reader: &mut R,
    len: usize,
    image_format: BiometricImageFormat,
) -> Option<DynamicImage> {
    let image_data = match read_exact_len(reader, len) {
        Ok(image_data) => image_data,
        Err(e) => {
            warn!("Portrait is shorter than its declared {}b: {}", len, e);
            return None;
        }
    };
    let decoded = match image_format {
        BiometricImageFormat::Jpeg => {
            image::load_from_memory_with_format(&image_data, ImageFormat::Jpeg)
                .map_err(|e| e.to_string())
        }
        BiometricImageFormat::Jpeg2000 => decode_jpeg2000(&image_data),
        // Let the decoder sniff it
        BiometricImageFormat::Reserved => {
            image::load_from_memory(&image_data).map_err(|e| e.to_string())
        }
    };
    return match decoded {
        Ok(portrait) => {
            debug!(
                "Decoded a {}x{} portrait",
                portrait.width(),
                portrait.height()
            );
            Some(portrait.resize(PORTRAIT_MAX_WIDTH, PORTRAIT_MAX_HEIGHT, FilterType::Lanczos3))
        }
        Err(e) => {
            warn!("Could not decode portrait: {}", e);
            None
        }
    };
}

/// Decodes a JP2 file or a bare J2K codestream.
fn decode_jpeg2000(image_data: &[u8]) -> Result<DynamicImage, String> {
    let jp2_image = jpeg2k::Image::from_bytes(image_data).map_err(|e| e.to_string())?;
    return DynamicImage::try_from(&jp2_image).map_err(|e| e.to_string());
}

/// The first face image in DG2, decoded. None if there is none or it does not decode.
pub fn extract_portrait(dg2: &EFDG2_3_4) -> Option<DynamicImage> {
    let face_image = dg2.first_face_image()?;
    let mut image_data = face_image.data.as_slice();
    return decode_portrait(&mut image_data, face_image.data.len(), face_image.image_format);
}
