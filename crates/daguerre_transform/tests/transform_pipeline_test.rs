//! Request parsing feeding the raster engine.

use daguerre_transform::{
    ImageEngine, OutputFormat, RasterEngine, ResizeSpec, TransformRequest,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

fn png_with_alpha(width: u32, height: u32) -> Vec<u8> {
    let pixels = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 128]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(pixels)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[test]
fn test_request_drives_engine() {
    let request =
        TransformRequest::parse([("width", "10"), ("size", "50x20"), ("format", "webp")]).unwrap();
    let engine = RasterEngine::new();
    let format = request.output_format(Some(OutputFormat::Png)).unwrap();

    let out = engine
        .render(
            &png_with_alpha(100, 100),
            &ResizeSpec::from(&request),
            format,
            *request.quality(),
        )
        .unwrap();

    let decoded = image::load_from_memory_with_format(&out, ImageFormat::WebP).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (50, 20));
    assert!(decoded.color().has_alpha());
}

#[test]
fn test_jpeg_output_drops_alpha() {
    let engine = RasterEngine::new();
    let out = engine
        .render(
            &png_with_alpha(16, 16),
            &ResizeSpec::default(),
            OutputFormat::Jpeg,
            90,
        )
        .unwrap();
    let decoded = image::load_from_memory_with_format(&out, ImageFormat::Jpeg).unwrap();
    assert!(!decoded.color().has_alpha());
}

#[test]
fn test_stats_track_operations_and_release_memory() {
    let engine = RasterEngine::new();
    let source = png_with_alpha(20, 10);
    let spec = ResizeSpec::from(&TransformRequest::parse([("width", "10")]).unwrap());

    engine.render(&source, &spec, OutputFormat::Png, 0).unwrap();
    // Unparseable input fails after nothing was allocated
    assert!(engine.render(b"garbage", &spec, OutputFormat::Png, 0).is_err());

    let stats = engine.stats();
    assert_eq!(*stats.mem(), 0);
    assert_eq!(*stats.live_images(), 0);
    assert_eq!(*stats.allocs(), 2);
    assert!(*stats.mem_high() >= 20 * 10 * 4);
    assert_eq!(stats.operation_counts()["decode"], 1);
    assert_eq!(stats.operation_counts()["resize"], 1);
    assert_eq!(stats.operation_counts()["encode"], 1);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["live_images"], 0);
}
