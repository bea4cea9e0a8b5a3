//! Image assets sent by the host
//!
//! Bytes arrive once; later `ImageCreation`s for the same id set
//! `imageDataOmitted` and are answered from the cache. Decoding the payload
//! (format and frame sizes) is delegated to an [`ImageInspector`].

use std::collections::HashMap;
use std::fmt;

use remote_ui_protocol::{ImageCreation, ImageFormat, ImageFrameMetadata, ImageMetadata};

use crate::error::{Classify, ErrorKind};

/// Reads format and frame sizes out of raw image bytes
pub trait ImageInspector {
    fn inspect(&self, bytes: &[u8]) -> (ImageFormat, Vec<ImageFrameMetadata>);
}

/// Reports every payload as an unknown format with no frames
#[derive(Debug, Clone, Copy, Default)]
pub struct OpaqueInspector;

impl ImageInspector for OpaqueInspector {
    fn inspect(&self, _bytes: &[u8]) -> (ImageFormat, Vec<ImageFrameMetadata>) {
        (ImageFormat::Unknown, Vec::new())
    }
}

impl<F> ImageInspector for F
where
    F: Fn(&[u8]) -> (ImageFormat, Vec<ImageFrameMetadata>),
{
    fn inspect(&self, bytes: &[u8]) -> (ImageFormat, Vec<ImageFrameMetadata>) {
        self(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    #[error("image {0} has no payload and is not cached")]
    MissingPayload(i64),
}

impl Classify for ImageError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::UnknownId
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub bytes: Vec<u8>,
    pub metadata: ImageMetadata,
    pub revision: u64,
}

pub struct ImageStore {
    assets: HashMap<i64, ImageAsset>,
    inspector: Box<dyn ImageInspector>,
    created: Vec<ImageMetadata>,
    next_revision: u64,
}

impl fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStore")
            .field("assets", &self.assets.len())
            .field("created", &self.created.len())
            .finish_non_exhaustive()
    }
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new(Box::new(OpaqueInspector))
    }
}

impl ImageStore {
    pub fn new(inspector: Box<dyn ImageInspector>) -> Self {
        Self {
            assets: HashMap::new(),
            inspector,
            created: Vec::new(),
            next_revision: 0,
        }
    }

    /// Store (or look up) an image and report its metadata
    pub fn create(&mut self, creation: &ImageCreation) -> Result<ImageMetadata, ImageError> {
        let Some(data) = &creation.image_data else {
            return self
                .assets
                .get(&creation.id)
                .map(|asset| asset.metadata.clone())
                .ok_or(ImageError::MissingPayload(creation.id));
        };

        let (format, frames) = self.inspector.inspect(&data.0);
        let metadata = ImageMetadata {
            id: creation.id,
            format,
            frames: Some(frames),
        };
        self.next_revision += 1;
        self.assets.insert(
            creation.id,
            ImageAsset {
                bytes: data.0.clone(),
                metadata: metadata.clone(),
                revision: self.next_revision,
            },
        );
        self.created.push(metadata.clone());
        Ok(metadata)
    }

    pub fn destroy(&mut self, id: i64) -> bool {
        self.assets.remove(&id).is_some()
    }

    pub fn get(&self, id: i64) -> Option<&ImageAsset> {
        self.assets.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.assets.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &ImageAsset)> {
        self.assets.iter().map(|(id, asset)| (*id, asset))
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn clear(&mut self) {
        self.assets.clear();
        self.created.clear();
    }

    /// Metadata of images stored since the last call
    pub fn take_created(&mut self) -> Vec<ImageMetadata> {
        std::mem::take(&mut self.created)
    }
}
