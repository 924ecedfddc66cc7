//! Raster engine built on the `image` crate.

use crate::engine::{EngineStats, ImageEngine, Operation, ResizeSpec};
use crate::{CropStrategy, OutputFormat};
use daguerre_error::{ImageError, ImageErrorKind};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use strum::IntoEnumIterator;

/// Candidate windows scored by the entropy and attention strategies.
const FOCAL_CANDIDATES: u32 = 16;

/// Longest side of the luma copy that entropy and attention score.
const SCORING_EDGE: u32 = 512;

/// Encoder quality when the request leaves it at zero.
const DEFAULT_JPEG_QUALITY: u8 = 80;

#[derive(Debug, Default)]
struct Counters {
    mem: AtomicU64,
    mem_high: AtomicU64,
    live_images: AtomicU64,
    allocs: AtomicU64,
    decode: AtomicU64,
    resize: AtomicU64,
    strip_metadata: AtomicU64,
    encode: AtomicU64,
}

impl Counters {
    fn counter(&self, operation: Operation) -> &AtomicU64 {
        match operation {
            Operation::Decode => &self.decode,
            Operation::Resize => &self.resize,
            Operation::StripMetadata => &self.strip_metadata,
            Operation::Encode => &self.encode,
        }
    }

    fn record(&self, operation: Operation) {
        self.counter(operation).fetch_add(1, Ordering::Relaxed);
    }
}

/// Memory accounting for one decoded image. Released on drop.
#[derive(Debug)]
struct MemoryLease {
    counters: Arc<Counters>,
    bytes: u64,
}

impl MemoryLease {
    fn acquire(counters: &Arc<Counters>, bytes: u64) -> Self {
        let now = counters.mem.fetch_add(bytes, Ordering::AcqRel) + bytes;
        counters.mem_high.fetch_max(now, Ordering::AcqRel);
        counters.live_images.fetch_add(1, Ordering::AcqRel);
        counters.allocs.fetch_add(1, Ordering::Relaxed);
        Self {
            counters: counters.clone(),
            bytes,
        }
    }
}

impl Drop for MemoryLease {
    fn drop(&mut self) {
        self.counters.mem.fetch_sub(self.bytes, Ordering::AcqRel);
        self.counters.live_images.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A decoded image tracked by its engine.
#[derive(Debug)]
pub struct RasterImage {
    pixels: DynamicImage,
    _lease: MemoryLease,
}

impl RasterImage {
    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The underlying pixels.
    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }
}

/// [`ImageEngine`] for JPEG, PNG and WebP.
///
/// Clones share counters.
#[derive(Debug, Clone, Default)]
pub struct RasterEngine {
    counters: Arc<Counters>,
}

impl RasterEngine {
    /// New engine with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&self, pixels: DynamicImage) -> RasterImage {
        let bytes = pixels.as_bytes().len() as u64;
        RasterImage {
            _lease: MemoryLease::acquire(&self.counters, bytes),
            pixels,
        }
    }

    /// Cut the source window the strategy picks at the aspect ratio of
    /// `width`×`height`, then scale that window to exactly `width`×`height`.
    ///
    /// The window is chosen in source coordinates, so nothing larger than the
    /// source or the output is ever allocated.
    fn cover_and_crop(
        &self,
        pixels: &DynamicImage,
        width: u32,
        height: u32,
        crop: CropStrategy,
    ) -> DynamicImage {
        let (source_width, source_height) = (pixels.width(), pixels.height());
        let (window_width, window_height) =
            crop_window(source_width, source_height, width, height);

        let (x, y) = if window_width < source_width {
            let excess = source_width - window_width;
            (source_offset(crop, pixels, Axis::Columns, window_width, excess), 0)
        } else {
            let excess = source_height - window_height;
            (0, source_offset(crop, pixels, Axis::Rows, window_height, excess))
        };

        tracing::trace!(x, y, window_width, window_height, %crop, "Cropping source window");
        pixels
            .crop_imm(x, y, window_width, window_height)
            .resize_exact(width, height, FilterType::Lanczos3)
    }
}

fn scaled(dimension: u32, scale: f64) -> u32 {
    ((f64::from(dimension) * scale).round() as u32).max(1)
}

/// Largest source window with the aspect ratio of `width`×`height`.
fn crop_window(source_width: u32, source_height: u32, width: u32, height: u32) -> (u32, u32) {
    let (source_width, source_height) = (u64::from(source_width), u64::from(source_height));
    let (width, height) = (u64::from(width.max(1)), u64::from(height.max(1)));

    if source_width * height > source_height * width {
        let window = (source_height * width + height / 2) / height;
        (window.clamp(1, source_width) as u32, source_height as u32)
    } else {
        let window = (source_width * height + width / 2) / width;
        (source_width as u32, window.clamp(1, source_height) as u32)
    }
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    Columns,
    Rows,
}

/// Offset along `axis` of a `window`-long slice of the source, `excess` being the slack.
fn source_offset(
    crop: CropStrategy,
    pixels: &DynamicImage,
    axis: Axis,
    window: u32,
    excess: u32,
) -> u32 {
    match crop {
        CropStrategy::Low => 0,
        CropStrategy::High => excess,
        CropStrategy::Centre | CropStrategy::None | CropStrategy::All => excess / 2,
        CropStrategy::Entropy | CropStrategy::Attention => {
            let luma = scoring_luma(pixels);
            let extent = match axis {
                Axis::Columns => luma.width(),
                Axis::Rows => luma.height(),
            };
            let factor = f64::from(extent) / f64::from(window + excess);
            let scaled_window = ((f64::from(window) * factor).round() as u32).clamp(1, extent);
            let offset = scored_offset(crop, &luma, axis, scaled_window, extent - scaled_window);
            ((f64::from(offset) / factor).round() as u32).min(excess)
        }
    }
}

/// Luma copy of the source, downscaled so its longest side is at most [`SCORING_EDGE`].
fn scoring_luma(pixels: &DynamicImage) -> GrayImage {
    let longest = pixels.width().max(pixels.height());
    if longest <= SCORING_EDGE {
        return pixels.to_luma8();
    }
    let factor = f64::from(SCORING_EDGE) / f64::from(longest);
    pixels
        .resize_exact(
            scaled(pixels.width(), factor),
            scaled(pixels.height(), factor),
            FilterType::Triangle,
        )
        .to_luma8()
}

/// Best offset by luminance entropy, or by edge energy for `attention`.
fn scored_offset(
    crop: CropStrategy,
    luma: &GrayImage,
    axis: Axis,
    window: u32,
    excess: u32,
) -> u32 {
    if crop == CropStrategy::Attention {
        let gradients = line_gradients(luma, axis);
        let mut prefix = Vec::with_capacity(gradients.len() + 1);
        prefix.push(0u64);
        for gradient in &gradients {
            prefix.push(prefix[prefix.len() - 1] + gradient);
        }
        best_candidate(excess, |offset| {
            (prefix[(offset + window) as usize] - prefix[offset as usize]) as f64
        })
    } else {
        let histograms = line_histograms(luma, axis);
        best_candidate(excess, |offset| {
            let mut total = [0u64; 256];
            for line in &histograms[offset as usize..(offset + window) as usize] {
                for (sum, count) in total.iter_mut().zip(line.iter()) {
                    *sum += u64::from(*count);
                }
            }
            entropy(&total)
        })
    }
}

/// Highest scoring of evenly spaced offsets; ties keep the lowest offset.
fn best_candidate(excess: u32, score: impl Fn(u32) -> f64) -> u32 {
    let mut best = (0, f64::MIN);
    for step in 0..=FOCAL_CANDIDATES {
        let offset = (u64::from(excess) * u64::from(step) / u64::from(FOCAL_CANDIDATES)) as u32;
        let value = score(offset);
        if value > best.1 {
            best = (offset, value);
        }
    }
    best.0
}

fn line_histograms(luma: &GrayImage, axis: Axis) -> Vec<[u32; 256]> {
    let (width, height) = luma.dimensions();
    let lines = match axis {
        Axis::Columns => width,
        Axis::Rows => height,
    };
    let mut histograms = vec![[0u32; 256]; lines as usize];
    for (x, y, pixel) in luma.enumerate_pixels() {
        let line = match axis {
            Axis::Columns => x,
            Axis::Rows => y,
        };
        histograms[line as usize][usize::from(pixel.0[0])] += 1;
    }
    histograms
}

fn line_gradients(luma: &GrayImage, axis: Axis) -> Vec<u64> {
    let (width, height) = luma.dimensions();
    let lines = match axis {
        Axis::Columns => width,
        Axis::Rows => height,
    };
    let mut gradients = vec![0u64; lines as usize];
    for (x, y, pixel) in luma.enumerate_pixels() {
        let value = i32::from(pixel.0[0]);
        let mut magnitude = 0;
        if x + 1 < width {
            magnitude += (i32::from(luma.get_pixel(x + 1, y).0[0]) - value).unsigned_abs();
        }
        if y + 1 < height {
            magnitude += (i32::from(luma.get_pixel(x, y + 1).0[0]) - value).unsigned_abs();
        }
        let line = match axis {
            Axis::Columns => x,
            Axis::Rows => y,
        };
        gradients[line as usize] += u64::from(magnitude);
    }
    gradients
}

fn entropy(histogram: &[u64; 256]) -> f64 {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0.0;
    }
    histogram
        .iter()
        .filter(|count| **count > 0)
        .map(|count| {
            let p = *count as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

fn encode_error(format: OutputFormat, e: image::ImageError) -> ImageError {
    ImageError::new(ImageErrorKind::Encode(format!("{}: {}", format, e)))
}

impl ImageEngine for RasterEngine {
    type Image = RasterImage;

    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, ImageError> {
        let pixels = image::load_from_memory(bytes).map_err(|e| match e {
            image::ImageError::Unsupported(e) => {
                ImageError::new(ImageErrorKind::UnsupportedFormat(e.to_string()))
            }
            e => ImageError::new(ImageErrorKind::Decode(e.to_string())),
        })?;
        self.counters.record(Operation::Decode);
        tracing::debug!(width = pixels.width(), height = pixels.height(), "Decoded image");
        Ok(self.track(pixels))
    }

    #[tracing::instrument(skip(self, image), fields(from_width = image.width(), from_height = image.height()))]
    fn resize(&self, image: RasterImage, spec: &ResizeSpec) -> Result<RasterImage, ImageError> {
        let (width, height) = spec.target_for(image.width(), image.height());

        let pixels = if spec.is_forced() {
            image.pixels.resize_exact(width, height, FilterType::Lanczos3)
        } else if spec.crop().crops() {
            self.cover_and_crop(&image.pixels, width, height, *spec.crop())
        } else {
            image.pixels.resize(width, height, FilterType::Lanczos3)
        };
        drop(image);

        self.counters.record(Operation::Resize);
        tracing::debug!(
            width = pixels.width(),
            height = pixels.height(),
            forced = spec.is_forced(),
            "Resized image"
        );
        Ok(self.track(pixels))
    }

    fn strip_metadata(&self, image: RasterImage) -> RasterImage {
        // Decoded buffers carry pixels only; EXIF and ICC never survive decode.
        self.counters.record(Operation::StripMetadata);
        image
    }

    #[tracing::instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn encode(
        &self,
        image: &RasterImage,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>, ImageError> {
        let mut out = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                let quality = if quality == 0 {
                    DEFAULT_JPEG_QUALITY
                } else {
                    quality
                };
                let rgb = DynamicImage::ImageRgb8(image.pixels.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
                    .map_err(|e| encode_error(format, e))?;
            }
            OutputFormat::Png => {
                image
                    .pixels
                    .write_with_encoder(PngEncoder::new(&mut out))
                    .map_err(|e| encode_error(format, e))?;
            }
            OutputFormat::Webp => {
                // Lossless only; quality does not apply.
                let pixels = if image.pixels.color().has_alpha() {
                    DynamicImage::ImageRgba8(image.pixels.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(image.pixels.to_rgb8())
                };
                pixels
                    .write_with_encoder(WebPEncoder::new_lossless(&mut out))
                    .map_err(|e| encode_error(format, e))?;
            }
        }

        self.counters.record(Operation::Encode);
        tracing::debug!(%format, size = out.len(), "Encoded image");
        Ok(out)
    }

    fn stats(&self) -> EngineStats {
        let counters = &self.counters;
        let operation_counts: BTreeMap<String, u64> = Operation::iter()
            .map(|op| {
                (
                    op.as_ref().to_string(),
                    counters.counter(op).load(Ordering::Relaxed),
                )
            })
            .collect();
        EngineStats::new(
            counters.mem.load(Ordering::Acquire),
            counters.mem_high.load(Ordering::Acquire),
            counters.live_images.load(Ordering::Acquire),
            counters.allocs.load(Ordering::Relaxed),
            operation_counts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let pixels = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(pixels)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn dimensions(engine: &RasterEngine, bytes: &[u8]) -> (u32, u32) {
        let image = engine.decode(bytes).unwrap();
        (image.width(), image.height())
    }

    #[test]
    fn test_both_dimensions_force_size() {
        let engine = RasterEngine::new();
        let spec = ResizeSpec::new(200, 200, CropStrategy::None);
        let out = engine.render(&png(1000, 500), &spec, OutputFormat::Png, 0).unwrap();
        assert_eq!(dimensions(&engine, &out), (200, 200));
    }

    #[test]
    fn test_single_dimension_preserves_aspect() {
        let engine = RasterEngine::new();
        let spec = ResizeSpec::new(200, 0, CropStrategy::None);
        let out = engine.render(&png(1000, 500), &spec, OutputFormat::Png, 0).unwrap();
        assert_eq!(dimensions(&engine, &out), (200, 100));

        let spec = ResizeSpec::new(0, 100, CropStrategy::All);
        let out = engine.render(&png(1000, 500), &spec, OutputFormat::Png, 0).unwrap();
        assert_eq!(dimensions(&engine, &out), (200, 100));
    }

    #[test]
    fn test_crop_strategy_fills_box() {
        let engine = RasterEngine::new();
        let source = png(400, 200);
        for crop in [
            CropStrategy::Centre,
            CropStrategy::Low,
            CropStrategy::High,
            CropStrategy::Entropy,
            CropStrategy::Attention,
        ] {
            let spec = ResizeSpec::new(100, 0, crop);
            let out = engine.render(&source, &spec, OutputFormat::Png, 0).unwrap();
            assert_eq!(dimensions(&engine, &out), (100, 200), "crop={}", crop);
        }
    }

    #[test]
    fn test_focal_offsets() {
        // Flat left half, noisy right half
        let luma = GrayImage::from_fn(100, 10, |x, y| {
            if x < 50 {
                image::Luma([128])
            } else {
                image::Luma([((x * 37 + y * 91) % 256) as u8])
            }
        });
        let pixels = DynamicImage::ImageLuma8(luma);
        let offset = |crop| source_offset(crop, &pixels, Axis::Columns, 50, 50);
        assert_eq!(offset(CropStrategy::Low), 0);
        assert_eq!(offset(CropStrategy::High), 50);
        assert_eq!(offset(CropStrategy::Centre), 25);
        assert_eq!(offset(CropStrategy::Entropy), 50);
        assert_eq!(offset(CropStrategy::Attention), 50);
    }

    #[test]
    fn test_focal_offsets_on_downscaled_source() {
        // Detail only in the last quarter of a source wider than the scoring edge
        let luma = GrayImage::from_fn(2048, 4, |x, y| {
            if x < 1536 {
                image::Luma([128])
            } else {
                image::Luma([((x * 37 + y * 91) % 256) as u8])
            }
        });
        let pixels = DynamicImage::ImageLuma8(luma);
        for crop in [CropStrategy::Entropy, CropStrategy::Attention] {
            let offset = source_offset(crop, &pixels, Axis::Columns, 512, 1536);
            assert!(offset > 1400 && offset <= 1536, "crop={} offset={}", crop, offset);
        }
    }

    #[test]
    fn test_crop_window_keeps_target_aspect() {
        assert_eq!(crop_window(400, 200, 100, 200), (100, 200));
        assert_eq!(crop_window(200, 400, 100, 100), (200, 200));
        assert_eq!(crop_window(300, 300, 100, 100), (300, 300));
        // Extreme sources never widen past themselves
        assert_eq!(crop_window(1, 400, 400, 400), (1, 1));
        assert_eq!(crop_window(5000, 1, 1, 5000), (1, 1));
    }

    #[test]
    fn test_extreme_aspect_crop_stays_small() {
        let engine = RasterEngine::new();
        let source = png(1, 400);
        for crop in [CropStrategy::Centre, CropStrategy::Entropy, CropStrategy::Attention] {
            let spec = ResizeSpec::new(400, 0, crop);
            let out = engine.render(&source, &spec, OutputFormat::Png, 0).unwrap();
            assert_eq!(dimensions(&engine, &out), (400, 400), "crop={}", crop);
        }
        // Peak tracked memory is the output itself, never a cover-sized intermediate
        assert_eq!(*engine.stats().mem_high(), 400 * 400 * 3);
    }

    #[test]
    fn test_encodes_every_format() {
        let engine = RasterEngine::new();
        let source = png(64, 32);
        let spec = ResizeSpec::default();

        let jpeg = engine.render(&source, &spec, OutputFormat::Jpeg, 50).unwrap();
        assert_eq!(&jpeg[..3], &[0xFF, 0xD8, 0xFF]);

        let webp = engine.render(&source, &spec, OutputFormat::Webp, 0).unwrap();
        assert_eq!(&webp[..4], b"RIFF");
        assert_eq!(&webp[8..12], b"WEBP");

        let png_out = engine.render(&source, &spec, OutputFormat::Png, 0).unwrap();
        assert_eq!(&png_out[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_webp_ignores_quality() {
        let engine = RasterEngine::new();
        let source = png(32, 32);
        let spec = ResizeSpec::default();
        let low = engine.render(&source, &spec, OutputFormat::Webp, 10).unwrap();
        let high = engine.render(&source, &spec, OutputFormat::Webp, 90).unwrap();
        assert_eq!(low, high);

        let jpeg_low = engine.render(&source, &spec, OutputFormat::Jpeg, 10).unwrap();
        let jpeg_high = engine.render(&source, &spec, OutputFormat::Jpeg, 90).unwrap();
        assert_ne!(jpeg_low, jpeg_high);
    }

    #[test]
    fn test_memory_lease_released_on_error() {
        let engine = RasterEngine::new();
        assert!(engine.decode(b"not an image").is_err());

        let image = engine.decode(&png(10, 10)).unwrap();
        let during = engine.stats();
        assert_eq!(*during.live_images(), 1);
        assert_eq!(*during.mem(), 300);
        drop(image);

        let after = engine.stats();
        assert_eq!(*after.mem(), 0);
        assert_eq!(*after.live_images(), 0);
        assert_eq!(*after.mem_high(), 300);
        assert_eq!(*after.allocs(), 1);
        assert_eq!(after.operation_counts()["decode"], 1);
    }

    #[test]
    fn test_decode_failure_kind() {
        let engine = RasterEngine::new();
        let err = engine.decode(b"not an image").unwrap_err();
        assert!(matches!(
            err.kind(),
            ImageErrorKind::Decode(_) | ImageErrorKind::UnsupportedFormat(_)
        ));
    }
}
