mod common;

use assert_matches::assert_matches;
use image::{ImageFormat, Rgba};

use cocotext_inspect::dataset::DatasetIndex;
use cocotext_inspect::error::CocoError;
use cocotext_inspect::render::{BOX_COLOR, FileExport, LabelFont, visualize};

use common::{CapturePresenter, encoded_image};

const DOC: &str = r#"{
    "imgs": {"1": {"id": 1, "file_name": "img.png"}},
    "imgToAnns": {"1": [1, 2]},
    "anns": {
        "1": {"bbox": [10, 20, 30, 15]},
        "2": {"bbox": [50, 40, 10, 10], "utf8_string": "OK"}
    }
}"#;

#[test]
fn draws_boxes_and_presents_in_memory_image() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("img.png");
    std::fs::write(&path, encoded_image(100, 80, ImageFormat::Png)).unwrap();

    let index = DatasetIndex::from_json(DOC).unwrap();
    let annotations = index.annotations_for_image(1);
    let presenter = CapturePresenter::default();

    visualize(&path, &annotations, &LabelFont::Bitmap, &presenter).unwrap();

    let captured = presenter.image.borrow();
    let (name, image) = captured.as_ref().unwrap();
    assert_eq!(name, "img.png");
    assert_eq!(image.dimensions(), (100, 80));
    assert_eq!(*image.get_pixel(10, 20), BOX_COLOR);
    assert_eq!(*image.get_pixel(40, 35), BOX_COLOR);
    assert_eq!(*image.get_pixel(25, 27), Rgba([255, 255, 255, 255]));
    assert_eq!(*image.get_pixel(50, 40), BOX_COLOR);
}

#[test]
fn annotation_without_text_renders_empty_label() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("img.png");
    std::fs::write(&path, encoded_image(100, 80, ImageFormat::Png)).unwrap();

    let index = DatasetIndex::from_json(DOC).unwrap();
    let first = index.annotations_for_image(1)[0];
    assert!(first.utf8_string.is_none());

    let font = LabelFont::load(std::path::Path::new("no-such-font.ttf"), 16.0);
    let presenter = CapturePresenter::default();
    visualize(&path, &[first], &font, &presenter).unwrap();

    let captured = presenter.image.borrow();
    let (_, image) = captured.as_ref().unwrap();
    let blue = image
        .pixels()
        .filter(|pixel| pixel.0[2] > 200 && pixel.0[0] < 50)
        .count();
    assert_eq!(blue, 0);
}

#[test]
fn file_export_writes_the_rendered_image() {
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("COCO_train2014_000001.jpg");
    std::fs::write(&source, encoded_image(64, 48, ImageFormat::Jpeg)).unwrap();
    let target = temp.path().join("out/rendered.png");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();

    let index = DatasetIndex::from_json(DOC).unwrap();
    visualize(
        &source,
        &index.annotations_for_image(1),
        &LabelFont::Bitmap,
        &FileExport::new(&target),
    )
    .unwrap();

    let written = image::open(&target).unwrap();
    assert_eq!((written.width(), written.height()), (64, 48));
}

#[test]
fn missing_or_corrupt_image_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let presenter = CapturePresenter::default();

    let missing = temp.path().join("absent.jpg");
    assert_matches!(
        visualize(&missing, &[], &LabelFont::Bitmap, &presenter),
        Err(CocoError::ImageOpen { .. })
    );

    let corrupt = temp.path().join("corrupt.jpg");
    std::fs::write(&corrupt, b"not an image").unwrap();
    assert_matches!(
        visualize(&corrupt, &[], &LabelFont::Bitmap, &presenter),
        Err(CocoError::ImageOpen { .. })
    );
    assert!(presenter.image.borrow().is_none());
}
