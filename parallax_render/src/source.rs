// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`ImageSource`] implementations backed by the `image` crate.
//!
//! Both sources probe bounds from the file header without decoding pixels,
//! decode at full size, shrink by the requested factor and premultiply.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;
use image::{ImageError, ImageReader};
use parallax_core::error::DecodeError;
use parallax_core::source::{ImageId, ImageSource, PixelBuffer, PixelSize};
use tiny_skia::ColorU8;

/// Encoded images held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryImageSource {
    images: HashMap<ImageId, Arc<[u8]>>,
}

impl MemoryImageSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the encoded bytes for `id`.
    pub fn insert(&mut self, id: ImageId, bytes: impl Into<Arc<[u8]>>) {
        self.images.insert(id, bytes.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_image(mut self, id: ImageId, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.insert(id, bytes);
        self
    }

    fn reader(&self, id: ImageId) -> Result<ImageReader<Cursor<Arc<[u8]>>>, DecodeError> {
        let bytes = self.images.get(&id).ok_or(DecodeError::UnknownImage(id))?;
        ImageReader::new(Cursor::new(Arc::clone(bytes)))
            .with_guessed_format()
            .map_err(|err| io_error(id, &err))
    }
}

impl ImageSource for MemoryImageSource {
    fn probe_bounds(&self, id: ImageId) -> Result<PixelSize, DecodeError> {
        probe(id, self.reader(id)?)
    }

    fn decode(&self, id: ImageId, downsample: u32) -> Result<PixelBuffer, DecodeError> {
        decode(id, self.reader(id)?, downsample)
    }
}

/// Images read from disk on demand.
#[derive(Clone, Debug, Default)]
pub struct FileImageSource {
    paths: HashMap<ImageId, PathBuf>,
}

impl FileImageSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers paths in order, numbering them from 0.
    ///
    /// Returns the source and the assigned identifiers.
    #[must_use]
    pub fn from_paths<I, P>(paths: I) -> (Self, Vec<ImageId>)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut source = Self::new();
        let mut ids = Vec::new();
        for (n, path) in (0_u32..).zip(paths) {
            let id = ImageId(n);
            source.insert(id, path);
            ids.push(id);
        }
        (source, ids)
    }

    /// Adds (or replaces) the path for `id`.
    pub fn insert(&mut self, id: ImageId, path: impl Into<PathBuf>) {
        self.paths.insert(id, path.into());
    }

    /// The path registered for `id`.
    #[must_use]
    pub fn path(&self, id: ImageId) -> Option<&Path> {
        self.paths.get(&id).map(PathBuf::as_path)
    }

    fn reader(&self, id: ImageId) -> Result<ImageReader<BufReader<File>>, DecodeError> {
        let path = self.paths.get(&id).ok_or(DecodeError::UnknownImage(id))?;
        ImageReader::open(path)
            .and_then(ImageReader::with_guessed_format)
            .map_err(|err| io_error(id, &err))
    }
}

impl ImageSource for FileImageSource {
    fn probe_bounds(&self, id: ImageId) -> Result<PixelSize, DecodeError> {
        probe(id, self.reader(id)?)
    }

    fn decode(&self, id: ImageId, downsample: u32) -> Result<PixelBuffer, DecodeError> {
        decode(id, self.reader(id)?, downsample)
    }
}

fn probe<R: BufRead + Seek>(
    id: ImageId,
    reader: ImageReader<R>,
) -> Result<PixelSize, DecodeError> {
    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| image_error(id, err))?;
    Ok(PixelSize::new(width, height))
}

fn decode<R: BufRead + Seek>(
    id: ImageId,
    reader: ImageReader<R>,
    downsample: u32,
) -> Result<PixelBuffer, DecodeError> {
    let mut image = reader.decode().map_err(|err| image_error(id, err))?;
    let factor = downsample.max(1);
    if factor > 1 {
        let width = (image.width() / factor).max(1);
        let height = (image.height() / factor).max(1);
        log::debug!(
            "shrinking {id} from {}x{} to {width}x{height}",
            image.width(),
            image.height()
        );
        image = image.resize_exact(width, height, FilterType::Triangle);
    }

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut data = rgba.into_raw();
    premultiply(&mut data);
    PixelBuffer::from_rgba8_premultiplied(width, height, data).map_err(|err| {
        DecodeError::Format {
            id,
            message: err.to_string(),
        }
    })
}

fn premultiply(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        if px[3] == u8::MAX {
            continue;
        }
        let c = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        px.copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
}

fn io_error(id: ImageId, err: &std::io::Error) -> DecodeError {
    DecodeError::Io {
        id,
        message: err.to_string(),
    }
}

fn image_error(id: ImageId, err: ImageError) -> DecodeError {
    match err {
        ImageError::IoError(err) => io_error(id, &err),
        other => DecodeError::Format {
            id,
            message: other.to_string(),
        },
    }
}
