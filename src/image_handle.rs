//! Image binding and lazy decoding.
//!
//! Every analyzer and enhancer works on an [`ImageHandle`]: a small, explicit
//! state machine that holds either a caller-provided pixel buffer or a path
//! that is decoded on first access.
//!
//! ```text
//!            bind(Buffer)            load()
//! Unbound ──────────────▶ BoundBuffer ──────▶ (buffer returned as-is)
//!    │
//!    │ bind(Path)              load()
//!    └──────────────▶ BoundPath ──────▶ Loaded (decoded image cached)
//! ```
//!
//! Rebinding from any state replaces the source and drops the cached image.
//!
//! ## Pixel layout
//!
//! Buffers are [`image::DynamicImage`] values, so channel order is **RGB**
//! (or single-channel luma for grayscale inputs) at 8 bits per channel once
//! converted by the consumers. Files are decoded with the `image` crate's pure
//! Rust decoders; the format is sniffed from the file contents, not only the
//! extension.

use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use crate::types::ErrorKind;

#[derive(Error, Debug)]
pub enum HandleError {
    #[error("Either an image buffer or a path must be provided")]
    NothingToBind,
    #[error("No image bound: bind a buffer or a path first")]
    Unbound,
    #[error("Failed to read image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl HandleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HandleError::NothingToBind => ErrorKind::Validation,
            HandleError::Unbound => ErrorKind::State,
            HandleError::Io { .. } | HandleError::Decode { .. } => ErrorKind::Io,
        }
    }
}

/// Decoders compiled into the binary, keyed by extension.
const RASTER_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("bmp", ImageFormat::Bmp),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    RASTER_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// True if the path has an extension we can decode (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Load and decode an image from disk.
pub fn decode_image(path: &Path) -> Result<DynamicImage, HandleError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|source| HandleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    reader.decode().map_err(|source| HandleError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// What an [`ImageHandle`] is bound to.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Buffer(DynamicImage),
    Path(PathBuf),
}

impl ImageSource {
    /// Build a source from optional parts. The buffer wins when both are given.
    pub fn from_parts(
        buffer: Option<DynamicImage>,
        path: Option<PathBuf>,
    ) -> Result<Self, HandleError> {
        match (buffer, path) {
            (Some(image), _) => Ok(ImageSource::Buffer(image)),
            (None, Some(path)) => Ok(ImageSource::Path(path)),
            (None, None) => Err(HandleError::NothingToBind),
        }
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Buffer(image)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

#[derive(Debug, Default)]
enum HandleState {
    #[default]
    Unbound,
    BoundBuffer(DynamicImage),
    BoundPath(PathBuf),
    Loaded {
        path: PathBuf,
        image: DynamicImage,
    },
}

/// A bound image that decodes lazily and caches the result.
///
/// Not shared across threads: batch processing gives each worker its own
/// handle. See the [module docs](self) for the state diagram.
#[derive(Debug, Default)]
pub struct ImageHandle {
    state: HandleState,
}

impl ImageHandle {
    /// An unbound handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle already bound to `source`.
    pub fn bound(source: impl Into<ImageSource>) -> Self {
        let mut handle = Self::new();
        handle.bind(source);
        handle
    }

    /// Bind a buffer or path, dropping any previously cached image.
    pub fn bind(&mut self, source: impl Into<ImageSource>) {
        self.state = match source.into() {
            ImageSource::Buffer(image) => HandleState::BoundBuffer(image),
            ImageSource::Path(path) => HandleState::BoundPath(path),
        };
    }

    /// Bind from optional parts; fails if neither a buffer nor a path is given.
    pub fn bind_parts(
        &mut self,
        buffer: Option<DynamicImage>,
        path: Option<PathBuf>,
    ) -> Result<(), HandleError> {
        let source = ImageSource::from_parts(buffer, path)?;
        self.bind(source);
        Ok(())
    }

    /// Return to the unbound state.
    pub fn unbind(&mut self) {
        self.state = HandleState::Unbound;
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self.state, HandleState::Unbound)
    }

    /// True once pixel data is available without further I/O.
    pub fn is_loaded(&self) -> bool {
        matches!(
            self.state,
            HandleState::BoundBuffer(_) | HandleState::Loaded { .. }
        )
    }

    /// The bound path, if the handle was bound by path.
    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            HandleState::BoundPath(path) | HandleState::Loaded { path, .. } => Some(path),
            HandleState::Unbound | HandleState::BoundBuffer(_) => None,
        }
    }

    /// Access the pixel data, decoding from disk on first use.
    pub fn load(&mut self) -> Result<&DynamicImage, HandleError> {
        if let HandleState::BoundPath(path) = &self.state {
            debug!(path = %path.display(), "decoding image");
            let image = decode_image(path)?;
            let path = path.clone();
            self.state = HandleState::Loaded { path, image };
        }
        match &self.state {
            HandleState::BoundBuffer(image) | HandleState::Loaded { image, .. } => Ok(image),
            HandleState::Unbound | HandleState::BoundPath(_) => Err(HandleError::Unbound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};
    use tempfile::TempDir;

    fn gray(value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([value])))
    }

    #[test]
    fn new_handle_is_unbound() {
        let mut handle = ImageHandle::new();
        assert!(!handle.is_bound());
        assert!(matches!(handle.load(), Err(HandleError::Unbound)));
    }

    #[test]
    fn bind_parts_requires_buffer_or_path() {
        let mut handle = ImageHandle::new();
        let err = handle.bind_parts(None, None).unwrap_err();
        assert!(matches!(err, HandleError::NothingToBind));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!handle.is_bound());
    }

    #[test]
    fn buffer_wins_when_both_given() {
        let mut handle = ImageHandle::new();
        handle
            .bind_parts(Some(gray(7)), Some(PathBuf::from("/does/not/exist.png")))
            .unwrap();
        assert!(handle.path().is_none());
        assert_eq!(handle.load().unwrap().to_luma8().get_pixel(0, 0)[0], 7);
    }

    #[test]
    fn buffer_is_returned_without_io() {
        let mut handle = ImageHandle::bound(gray(42));
        assert!(handle.is_loaded());
        let image = handle.load().unwrap();
        assert_eq!(image.width(), 4);
    }

    #[test]
    fn path_is_decoded_lazily_and_cached() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("frame.png");
        RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let mut handle = ImageHandle::bound(path.clone());
        assert!(!handle.is_loaded());
        assert_eq!(handle.load().unwrap().width(), 3);
        assert!(handle.is_loaded());

        // Cached: deleting the file does not affect further loads.
        std::fs::remove_file(&path).unwrap();
        assert_eq!(handle.load().unwrap().height(), 2);
        assert_eq!(handle.path(), Some(path.as_path()));
    }

    #[test]
    fn rebinding_clears_cache() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("frame.png");
        RgbImage::from_pixel(3, 2, image::Rgb([0, 0, 0]))
            .save(&path)
            .unwrap();

        let mut handle = ImageHandle::bound(path.as_path());
        handle.load().unwrap();
        handle.bind(gray(1));
        assert!(handle.path().is_none());
        assert_eq!(handle.load().unwrap().width(), 4);

        handle.unbind();
        assert!(matches!(handle.load(), Err(HandleError::Unbound)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut handle = ImageHandle::bound(PathBuf::from("/no/such/frame.jpg"));
        let err = handle.load().unwrap_err();
        assert!(matches!(err, HandleError::Io { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
        // Still bound: a later retry sees the same path.
        assert!(handle.is_bound());
    }

    #[test]
    fn undecodable_file_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = decode_image(&path).unwrap_err();
        assert!(matches!(err, HandleError::Decode { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn supported_extensions_include_common_formats() {
        let exts = supported_input_extensions();
        for ext in ["jpg", "jpeg", "png", "bmp", "tif", "webp"] {
            assert!(exts.contains(&ext), "{ext} should be supported");
        }
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a/B.JPG")));
        assert!(is_supported_image(Path::new("x.Png")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("no_extension")));
    }
}
