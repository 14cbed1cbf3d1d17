use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use king_images::core::{BatchUploader, ImageHost, ImageRecord, Result, UploadFile};
use king_images::store::{Gallery, GalleryError};

fn temp_gallery_path() -> PathBuf {
    std::env::temp_dir().join(format!("king-images-test-{}.json", uuid::Uuid::new_v4()))
}

fn record(id: &str, name: &str, date: i64) -> ImageRecord {
    ImageRecord {
        id: id.to_string(),
        name: name.to_string(),
        file_type: "png".to_string(),
        url: format!("https://i0.example.com/{name}.png"),
        width: 640,
        height: 480,
        date,
    }
}

#[tokio::test]
async fn gallery_survives_reload() {
    let path = temp_gallery_path();

    {
        let mut gallery = Gallery::open(&path).await.unwrap();
        assert!(gallery.is_empty());

        gallery.put(record("a", "one", 10));
        gallery.bulk_put(vec![record("b", "two", 20), record("c", "three", 30)]);
        assert!(gallery.delete("b"));
        assert!(!gallery.delete("missing"));
        gallery.save().await.unwrap();
    }

    let gallery = Gallery::open(&path).await.unwrap();
    let images = gallery.to_array();
    assert_eq!(images.len(), 2);
    // 最新的排前面
    assert_eq!(images[0].id, "c");
    assert_eq!(images[1].id, "a");

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn gallery_serializes_type_field() {
    let path = temp_gallery_path();

    let mut gallery = Gallery::open(&path).await.unwrap();
    gallery.put(record("a", "one", 10));
    gallery.save().await.unwrap();

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(raw.contains(r#""type": "png""#));

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn import_validates_before_writing() {
    let path = temp_gallery_path();
    let mut gallery = Gallery::open(&path).await.unwrap();
    gallery.put(record("keep", "keep", 1));

    let err = gallery
        .import_json(r#"[{"id": "x", "name": "no-url", "width": 1}]"#)
        .unwrap_err();
    assert!(matches!(err, GalleryError::InvalidRecord(_)));
    assert_eq!(gallery.len(), 1);

    let imported = gallery
        .import_json(
            r#"[
                {"id": "a", "name": "one", "type": "png",
                 "url": "https://i0.example.com/one.png",
                 "width": 1, "height": 1, "date": 5},
                {"id": "keep", "name": "updated", "type": "png",
                 "url": "https://i0.example.com/keep.png",
                 "width": 2, "height": 2, "date": 6}
            ]"#,
        )
        .unwrap();
    assert_eq!(imported, 2);
    // 同 ID 覆盖
    assert_eq!(gallery.len(), 2);

    let _ = tokio::fs::remove_file(&path).await;
}

/// 固定返回 http 地址的假图床
struct StaticHost;

#[async_trait]
impl ImageHost for StaticHost {
    async fn upload(&self, file: &UploadFile) -> Result<String> {
        Ok(format!("http://i0.example.com/bfs/{}", file.name))
    }
}

fn png_file(name: &str) -> UploadFile {
    let mut buf = Vec::new();
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(8, 6));
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    UploadFile::new(name, "image/png", Bytes::from(buf), 0)
}

/// 批量上传到假图床，成功记录直接入库再读回
#[tokio::test]
async fn batch_upload_results_flow_into_gallery() {
    let uploader = BatchUploader::new(Arc::new(StaticHost)).with_concurrency(2);
    let files = vec![png_file("a.png"), png_file("b.png"), png_file("c.png")];

    let result = uploader.upload_batch(files, None).await;
    assert_eq!(result.success_count, 3);
    assert_eq!(result.failed_count, 0);
    for rec in &result.success {
        assert!(rec.url.starts_with("https://i0.example.com/bfs/"));
        assert_eq!((rec.width, rec.height), (8, 6));
    }

    let path = temp_gallery_path();
    let mut gallery = Gallery::open(&path).await.unwrap();
    gallery.bulk_put(result.success);
    gallery.save().await.unwrap();

    let reloaded = Gallery::open(&path).await.unwrap();
    assert_eq!(reloaded.len(), 3);

    let _ = tokio::fs::remove_file(&path).await;
}
