//! Stats reporter against a live service.

use bytes::Bytes;
use daguerre::{AssetService, ObjectStoreStorage, ServiceConfig, StatsReporter};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

#[tokio::test]
async fn test_snapshot_reflects_engine_work() {
    let service = AssetService::with_raster_engine(
        ServiceConfig::new(),
        Arc::new(ObjectStoreStorage::in_memory()),
    );
    let reporter = StatsReporter::new(Arc::clone(service.engine()));

    let before = reporter.snapshot();
    assert_eq!(before.engine().operation_counts()["encode"], 0);

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(40, 40))
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();
    let upload = futures::stream::iter([Ok(Bytes::from(png.into_inner()))]);
    let id = service.ingest(upload).await.unwrap();
    service
        .read_query(id.as_str(), [("size", "20x10"), ("format", "jpeg")])
        .await
        .unwrap();

    let after = reporter.snapshot();
    assert_eq!(after.engine().operation_counts()["decode"], 1);
    assert_eq!(after.engine().operation_counts()["resize"], 1);
    assert_eq!(after.engine().operation_counts()["encode"], 1);
    assert_eq!(*after.engine().live_images(), 0);
    assert_eq!(*after.engine().mem(), 0);

    // Reading stats changes nothing
    assert_eq!(reporter.snapshot().engine(), after.engine());
}
