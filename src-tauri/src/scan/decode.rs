//! QR decoding of camera frames.
//!
//! The webview captures a still from the video element and sends it as a
//! data URL (`data:image/jpeg;base64,...`). A frame that cannot be read is
//! not an error for the capture loop; callers treat it as "no code".

use base64::{engine::general_purpose::STANDARD, Engine};
use image::GrayImage;
use tracing::debug;

/// Decode the first readable QR code in a captured frame.
///
/// Returns `Ok(None)` when the frame holds no readable code and `Err` when
/// the frame itself is malformed.
pub fn decode_frame(frame: &str) -> Result<Option<String>, String> {
    let bytes = frame_bytes(frame)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| format!("Failed to load frame: {}", e))?
        .to_luma8();
    Ok(decode_luma(&img))
}

/// Strip an optional data-URL header and base64-decode the payload.
fn frame_bytes(frame: &str) -> Result<Vec<u8>, String> {
    let payload = match frame.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => {
            if !header.ends_with(";base64") {
                return Err(format!("Unsupported frame encoding: {}", header));
            }
            data
        }
        _ => frame,
    };

    if payload.trim().is_empty() {
        return Err("Empty frame".to_string());
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("Invalid base64 frame: {}", e))
}

/// Scan a greyscale image for QR grids and return the first one that decodes.
pub fn decode_luma(img: &GrayImage) -> Option<String> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    if width == 0 || height == 0 {
        return None;
    }

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
        img.get_pixel(x as u32, y as u32)[0]
    });
    let grids = prepared.detect_grids();
    debug!("Detected {} candidate QR grids", grids.len());

    grids.iter().find_map(|grid| match grid.decode() {
        Ok((_meta, content)) => Some(content),
        Err(e) => {
            debug!("QR grid failed to decode: {:?}", e);
            None
        }
    })
}
