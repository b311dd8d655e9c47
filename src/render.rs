use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use ab_glyph::FontVec;
use directories::UserDirs;
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{DynamicImage, ImageReader, Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::dataset::AnnotationRecord;
use crate::error::CocoError;

pub const BOX_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const LABEL_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]);
pub const BOX_LINE_WIDTH: i32 = 3;
pub const LABEL_OFFSET: i32 = 10;

const BITMAP_GLYPH_SIZE: i64 = 8;
// Labels starting further left or above than this never reach the canvas.
const LABEL_MAX_EXTENT: i64 = 1 << 16;

const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/msttcorefonts",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/truetype",
    "/Library/Fonts",
    "/System/Library/Fonts/Supplemental",
    "C:\\Windows\\Fonts",
];

pub enum LabelFont {
    TrueType { font: FontVec, size: f32 },
    Bitmap,
}

impl LabelFont {
    pub fn load(name: &Path, size: f32) -> Self {
        for candidate in font_candidates(name) {
            let Ok(bytes) = fs::read(&candidate) else {
                continue;
            };
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    tracing::debug!(font = %candidate.display(), "label font loaded");
                    return LabelFont::TrueType { font, size };
                }
                Err(err) => {
                    tracing::debug!(font = %candidate.display(), error = %err, "unusable font file");
                }
            }
        }
        tracing::debug!(font = %name.display(), "falling back to built-in bitmap font");
        LabelFont::Bitmap
    }

    pub fn is_bitmap(&self) -> bool {
        matches!(self, LabelFont::Bitmap)
    }

    fn draw(&self, image: &mut RgbaImage, x: i32, y: i32, text: &str) {
        if text.is_empty() {
            return;
        }
        match self {
            LabelFont::TrueType { font, size } => {
                draw_text_mut(image, LABEL_COLOR, x, y, *size, font, text);
            }
            LabelFont::Bitmap => draw_bitmap_text(image, x, y, text),
        }
    }
}

fn font_candidates(name: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![name.to_path_buf()];
    if name.is_absolute() {
        return candidates;
    }
    if let Some(dirs) = UserDirs::new() {
        if let Some(font_dir) = dirs.font_dir() {
            candidates.push(font_dir.join(name));
        }
    }
    candidates.extend(SYSTEM_FONT_DIRS.iter().map(|dir| Path::new(dir).join(name)));
    candidates
}

fn draw_bitmap_text(image: &mut RgbaImage, x: i32, y: i32, text: &str) {
    let mut cursor = i64::from(x);
    for ch in text.chars() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| LATIN_FONTS.get(ch))
            .or_else(|| BASIC_FONTS.get('?'));
        if let Some(rows) = glyph {
            for (dy, row) in rows.iter().enumerate() {
                for dx in 0..BITMAP_GLYPH_SIZE as u32 {
                    if (*row >> dx) & 1 == 1 {
                        let px = cursor + i64::from(dx);
                        put_clipped(image, px, i64::from(y) + dy as i64, LABEL_COLOR);
                    }
                }
            }
        }
        cursor += BITMAP_GLYPH_SIZE;
    }
}

fn put_clipped(image: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x < 0 || y < 0 || x >= i64::from(image.width()) || y >= i64::from(image.height()) {
        return;
    }
    image.put_pixel(x as u32, y as u32, color);
}

pub fn draw_annotations(image: &mut RgbaImage, annotations: &[&AnnotationRecord], font: &LabelFont) {
    let canvas_w = i64::from(image.width());
    let canvas_h = i64::from(image.height());
    for ann in annotations {
        let bbox = ann.bbox;
        // Float-to-int casts saturate; everything below stays in i64.
        let x0 = bbox.x.round() as i64;
        let y0 = bbox.y.round() as i64;
        // Corner-inclusive, like an outline drawn from (x, y) to (x + w, y + h).
        let x1 = x0.saturating_add(bbox.width.round() as i64);
        let y1 = y0.saturating_add(bbox.height.round() as i64);

        for inset in 0..i64::from(BOX_LINE_WIDTH) {
            let left = x0.saturating_add(inset);
            let top = y0.saturating_add(inset);
            let right = x1.saturating_sub(inset);
            let bottom = y1.saturating_sub(inset);
            if right < left || bottom < top {
                break;
            }
            // Edges beyond the canvas are pulled to one pixel outside it, where
            // they are clipped away.
            let left = left.clamp(-1, canvas_w);
            let top = top.clamp(-1, canvas_h);
            let right = right.clamp(-1, canvas_w);
            let bottom = bottom.clamp(-1, canvas_h);
            let (Ok(x), Ok(y), Ok(w), Ok(h)) = (
                i32::try_from(left),
                i32::try_from(top),
                u32::try_from(right - left + 1),
                u32::try_from(bottom - top + 1),
            ) else {
                continue;
            };
            draw_hollow_rect_mut(image, Rect::at(x, y).of_size(w, h), BOX_COLOR);
        }

        let label_y = y0.saturating_sub(i64::from(LABEL_OFFSET));
        if x0 >= canvas_w || label_y >= canvas_h {
            continue;
        }
        let label_x = i32::try_from(x0.max(-LABEL_MAX_EXTENT)).unwrap_or(0);
        let label_y = i32::try_from(label_y.max(-LABEL_MAX_EXTENT)).unwrap_or(0);
        font.draw(image, label_x, label_y, ann.text());
    }
}

pub trait Presenter {
    fn present(&self, image: &RgbaImage, name: &str) -> Result<(), CocoError>;
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn present(&self, image: &RgbaImage, name: &str) -> Result<(), CocoError> {
        self.as_ref().present(image, name)
    }
}

pub struct FileExport {
    path: PathBuf,
}

impl FileExport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Presenter for FileExport {
    fn present(&self, image: &RgbaImage, _name: &str) -> Result<(), CocoError> {
        save_image(image, &self.path)?;
        tracing::info!(path = %self.path.display(), "rendered image written");
        Ok(())
    }
}

pub struct SystemViewer;

impl Presenter for SystemViewer {
    fn present(&self, image: &RgbaImage, name: &str) -> Result<(), CocoError> {
        let stem = Path::new(name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        let path = std::env::temp_dir().join(format!("cocotext-{stem}.png"));
        save_image(image, &path)?;

        let status = opener_command(&path)
            .status()
            .map_err(|err| CocoError::Present(err.to_string()))?;
        if !status.success() {
            return Err(CocoError::Present(format!(
                "viewer exited with {status} for {}",
                path.display()
            )));
        }
        Ok(())
    }
}

fn opener_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

fn save_image(image: &RgbaImage, path: &Path) -> Result<(), CocoError> {
    let is_jpeg = path
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            ext == "jpg" || ext == "jpeg"
        })
        .unwrap_or(false);
    let result = if is_jpeg {
        DynamicImage::ImageRgba8(image.clone()).to_rgb8().save(path)
    } else {
        image.save(path)
    };
    result.map_err(|err| CocoError::ImageWrite {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub fn visualize(
    image_path: &Path,
    annotations: &[&AnnotationRecord],
    font: &LabelFont,
    presenter: &dyn Presenter,
) -> Result<(), CocoError> {
    let open_error = |message: String| CocoError::ImageOpen {
        path: image_path.to_path_buf(),
        message,
    };
    let mut image = ImageReader::open(image_path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|err| open_error(err.to_string()))?
        .decode()
        .map_err(|err| open_error(err.to_string()))?
        .to_rgba8();

    draw_annotations(&mut image, annotations, font);

    let name = image_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    presenter.present(&image, &name)
}
