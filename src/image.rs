use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::{fmt, path::Path};

/// MIME type assumed for bare base64 payloads that carry no data URL header.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("not an image: {0}")]
    NotAnImage(String),
    #[error("malformed data URL")]
    MalformedDataUrl,
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("image payload is empty")]
    Empty,
    #[error("image is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
}

/// An image held in memory together with its declared MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    mime: String,
    bytes: Vec<u8>,
}

impl ImageData {
    /// Builds an image from raw bytes, rejecting types outside `image/*`.
    pub fn from_bytes(mime: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ImageError> {
        let mime = mime.into().trim().to_ascii_lowercase();
        if !is_image_mime(&mime) {
            return Err(ImageError::NotAnImage(mime));
        }
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self { mime, bytes })
    }

    /// Parses `data:<mime>;base64,<payload>`.
    ///
    /// Bare base64 without the `data:` header is accepted as well and treated
    /// as [`DEFAULT_IMAGE_MIME`].
    pub fn from_data_url(input: &str) -> Result<Self, ImageError> {
        let input = input.trim();
        let Some(rest) = input.strip_prefix("data:") else {
            return Self::from_bytes(DEFAULT_IMAGE_MIME, STANDARD.decode(input)?);
        };

        let (header, payload) = rest.split_once(',').ok_or(ImageError::MalformedDataUrl)?;
        let mut params = header.split(';');
        let mime = params.next().unwrap_or_default();
        if !params.any(|param| param.eq_ignore_ascii_case("base64")) {
            return Err(ImageError::MalformedDataUrl);
        }

        Self::from_bytes(mime, STANDARD.decode(payload)?)
    }

    /// Reads an image file, guessing its type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let mime = mime_guess::from_path(path)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !is_image_mime(&mime) {
            return Err(ImageError::NotAnImage(mime));
        }

        let bytes = std::fs::read(path)?;
        Self::from_bytes(mime, bytes)
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64())
    }

    /// Fails with [`ImageError::TooLarge`] when the decoded image exceeds `limit` bytes.
    pub fn ensure_within(&self, limit: usize) -> Result<(), ImageError> {
        if self.len() > limit {
            return Err(ImageError::TooLarge {
                size: self.len(),
                limit,
            });
        }
        Ok(())
    }
}

// keep multi-megabyte payloads out of log lines
impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.split_once('/')
        .is_some_and(|(kind, subtype)| kind.eq_ignore_ascii_case("image") && !subtype.is_empty())
}
