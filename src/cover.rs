use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageEncoder};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use crate::error::DecodeError;

pub const DEFAULT_MAX_DIMENSION: u32 = 300;
pub const DEFAULT_JPEG_QUALITY: u8 = 70;
pub const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(5);

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub max_dimension: u32,
    pub quality: u8,
    pub timeout: Duration,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_JPEG_QUALITY,
            timeout: DEFAULT_DECODE_TIMEOUT,
        }
    }
}

/// A cover ready to be stored inline on a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

pub fn normalize_file(path: &Path, options: NormalizeOptions) -> Result<EncodedImage, DecodeError> {
    let bytes = std::fs::read(path)?;
    log::info!("normalizing cover {} ({} bytes)", path.display(), bytes.len());
    normalize(bytes, options)
}

/// Decodes `bytes`, shrinks the image so neither side exceeds
/// `options.max_dimension` and re-encodes it as a JPEG data URI.
///
/// Decoding happens on a worker thread. If it has not finished after
/// `options.timeout` the worker is abandoned and `DecodeError::TimedOut`
/// is returned.
pub fn normalize(bytes: Vec<u8>, options: NormalizeOptions) -> Result<EncodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    run_with_timeout(options.timeout, move || normalize_blocking(&bytes, options))
}

/// Runs `work` on a worker thread and waits at most `timeout` for it.
/// A timed-out worker keeps running detached and its result is dropped.
fn run_with_timeout<T, F>(timeout: Duration, work: F) -> Result<T, DecodeError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DecodeError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        // receiver may be gone after a timeout
        let _ = tx.send(work());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            log::warn!("cover decode timed out after {:?}", timeout);
            Err(DecodeError::TimedOut(timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            log::error!("cover decode worker exited without a result");
            Err(DecodeError::WorkerFailed)
        }
    }
}

fn normalize_blocking(bytes: &[u8], options: NormalizeOptions) -> Result<EncodedImage, DecodeError> {
    let img = image::load_from_memory(bytes).map_err(DecodeError::Malformed)?;
    let (width, height) = img.dimensions();
    let (target_width, target_height) = scaled_dimensions(width, height, options.max_dimension);

    let resized = if (target_width, target_height) == (width, height) {
        img
    } else {
        img.resize_exact(target_width, target_height, FilterType::Triangle)
    };
    let rgb = resized.to_rgb8();

    let mut jpeg_bytes: Vec<u8> = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg_bytes, options.quality.clamp(1, 100));
    encoder
        .write_image(&rgb, target_width, target_height, image::ExtendedColorType::Rgb8)
        .map_err(DecodeError::Encode)?;

    log::info!(
        "cover normalized {}x{} -> {}x{} ({} bytes)",
        width,
        height,
        target_width,
        target_height,
        jpeg_bytes.len()
    );

    Ok(EncodedImage {
        data_uri: format!("{}{}", DATA_URI_PREFIX, STANDARD.encode(&jpeg_bytes)),
        width: target_width,
        height: target_height,
    })
}

/// Uniform scale so the longer side fits `max_dimension`. Never upscales.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    let max_dimension = max_dimension.max(1);
    if longest == 0 || longest <= max_dimension {
        return (width, height);
    }
    let scale = f64::from(max_dimension) / f64::from(longest);
    let fit = |side: u32| -> u32 {
        let scaled = (f64::from(side) * scale).round() as u32;
        scaled.clamp(1, max_dimension)
    };
    (fit(width), fit(height))
}

/// Splits a base64 `data:image/...` URI into mime type and raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), DecodeError> {
    let rest = uri.strip_prefix("data:").ok_or(DecodeError::InvalidDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(DecodeError::InvalidDataUri)?;
    let mime = header
        .strip_suffix(";base64")
        .filter(|mime| mime.starts_with("image/"))
        .ok_or(DecodeError::InvalidDataUri)?;
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| DecodeError::InvalidDataUri)?;
    Ok((mime.to_string(), bytes))
}

pub fn decode_data_uri_image(uri: &str) -> Result<DynamicImage, DecodeError> {
    let (_, bytes) = decode_data_uri(uri)?;
    image::load_from_memory(&bytes).map_err(DecodeError::Malformed)
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

/// Tracks the most recent cover pick so a slow normalization cannot
/// overwrite the result of a newer one.
#[derive(Debug, Default)]
pub struct CoverSelection {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket(u64);

impl CoverSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> SelectionTicket {
        SelectionTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: SelectionTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Returns the result only if no newer selection has started.
    pub fn accept<T>(&self, ticket: SelectionTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            log::info!("discarding stale cover result for selection {}", ticket.0);
            None
        }
    }
}
