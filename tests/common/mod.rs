#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::sync::Mutex;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use cocotext_inspect::error::CocoError;
use cocotext_inspect::progress::{ProgressEvent, ProgressSink};
use cocotext_inspect::render::Presenter;

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn advanced_total(&self) -> u64 {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                ProgressEvent::Advanced(delta) => *delta,
                _ => 0,
            })
            .sum()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Keeps the last presented image in memory.
#[derive(Default)]
pub struct CapturePresenter {
    pub image: RefCell<Option<(String, RgbaImage)>>,
}

impl Presenter for CapturePresenter {
    fn present(&self, image: &RgbaImage, name: &str) -> Result<(), CocoError> {
        *self.image.borrow_mut() = Some((name.to_string(), image.clone()));
        Ok(())
    }
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, format)
        .unwrap();
    bytes.into_inner()
}
