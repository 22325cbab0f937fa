//! # Fingerprint Module
//!
//! Turns an image file into a content fingerprint.
//!
//! ## How It Works
//! 1. Fully decode the file (format sniffed from its bytes)
//! 2. Normalise to RGBA at the image's native sample depth
//! 3. Digest depth tag + dimensions + pixels with BLAKE3
//!
//! The digest covers decoded pixels, never the encoded file, so a PNG and a
//! lossless re-encode of the same pixels collide while a single changed
//! pixel value never does.
//!
//! ## Example
//! ```rust,ignore
//! use pixel_dedup::core::fingerprint::{Fingerprinter, PixelFingerprinter};
//!
//! let fingerprinter = PixelFingerprinter::default();
//! let record = fingerprinter.fingerprint(&path)?;
//! println!("{}", record.fingerprint);
//! ```

mod decode;

pub use decode::{FastDecoder, ImageDecoder, SniffedFormat};

use crate::error::{DedupError, FingerprintError, ParseFingerprintError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Width of a full BLAKE3 digest in bytes
pub const DIGEST_BYTES: usize = 32;

/// Identifier for an image's decoded pixel content.
///
/// Two images with equal fingerprints are treated as duplicates.
/// Serialised as the hex of its key bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint {
    bytes: [u8; DIGEST_BYTES],
    key_bytes: u8,
}

impl Fingerprint {
    /// Build a fingerprint from a full digest, keeping the first `key_bytes`.
    ///
    /// The dropped tail is zeroed so equality only looks at the key.
    pub fn from_digest(digest: [u8; DIGEST_BYTES], key_bytes: usize) -> Self {
        let key_bytes = key_bytes.clamp(1, DIGEST_BYTES);
        let mut bytes = [0u8; DIGEST_BYTES];
        bytes[..key_bytes].copy_from_slice(&digest[..key_bytes]);
        Self {
            bytes,
            key_bytes: key_bytes as u8,
        }
    }

    /// Fingerprint an already decoded image
    pub fn of_image(image: &DynamicImage, key_bytes: usize) -> Self {
        Self::from_digest(digest_pixels(image), key_bytes)
    }

    /// The bytes used as the grouping key
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.key_bytes as usize]
    }

    /// Lowercase hex of the key bytes
    pub fn to_hex(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Whether this fingerprint was narrowed below the full digest
    pub fn is_truncated(&self) -> bool {
        (self.key_bytes as usize) < DIGEST_BYTES
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    /// Parse the hex form produced by `to_hex`
    fn from_str(hex: &str) -> Result<Self, Self::Err> {
        if hex.is_empty() || hex.len() % 2 != 0 || hex.len() > DIGEST_BYTES * 2 {
            return Err(ParseFingerprintError::Length {
                len: hex.len(),
                max: DIGEST_BYTES * 2,
            });
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseFingerprintError::InvalidHex {
                value: hex.to_string(),
            });
        }

        let nibble = |b: u8| (b as char).to_digit(16).unwrap_or(0) as u8;
        let mut digest = [0u8; DIGEST_BYTES];
        for (byte, pair) in digest.iter_mut().zip(hex.as_bytes().chunks(2)) {
            *byte = (nibble(pair[0]) << 4) | nibble(pair[1]);
        }

        Ok(Self::from_digest(digest, hex.len() / 2))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ParseFingerprintError;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        hex.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_hex()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Digest the decoded pixels of an image.
fn digest_pixels(image: &DynamicImage) -> [u8; DIGEST_BYTES] {
    let color = image.color();
    let sample_bytes = color.bytes_per_pixel() / color.channel_count().max(1);

    let mut hasher = blake3::Hasher::new();
    hasher.update(&[sample_bytes]);
    hasher.update(&image.width().to_le_bytes());
    hasher.update(&image.height().to_le_bytes());

    match sample_bytes {
        1 => {
            hasher.update(image.to_rgba8().as_raw());
        }
        2 => {
            let raw: Vec<u8> = image
                .to_rgba16()
                .as_raw()
                .iter()
                .flat_map(|s| s.to_le_bytes())
                .collect();
            hasher.update(&raw);
        }
        _ => {
            let raw: Vec<u8> = image
                .to_rgba32f()
                .as_raw()
                .iter()
                .flat_map(|s| s.to_bits().to_le_bytes())
                .collect();
            hasher.update(&raw);
        }
    }

    *hasher.finalize().as_bytes()
}

/// A fingerprinted file.
///
/// Owned by the scanner until merged, then by the duplicate index.
#[derive(Clone)]
pub struct ImageRecord {
    /// Canonical absolute path
    pub path: PathBuf,
    /// Content fingerprint
    pub fingerprint: Fingerprint,
    /// Decoded dimensions (width, height)
    pub dimensions: (u32, u32),
    /// Decoded pixels, when the scan was configured to keep them
    pub decoded: Option<Arc<DynamicImage>>,
}

impl fmt::Debug for ImageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRecord")
            .field("path", &self.path)
            .field("fingerprint", &self.fingerprint)
            .field("dimensions", &self.dimensions)
            .field("decoded", &self.decoded.is_some())
            .finish()
    }
}

/// Configuration for fingerprinting
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    /// Truncate the digest to this many bytes (None = full 32-byte digest).
    ///
    /// Narrow keys make accidental collisions between different images
    /// more likely; only set this deliberately.
    pub key_bytes: Option<usize>,
    /// Keep decoded pixels on each record for later previews
    pub retain_pixels: bool,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            key_bytes: None,
            retain_pixels: true,
        }
    }
}

impl FingerprintConfig {
    /// Effective key width in bytes
    pub fn key_width(&self) -> usize {
        self.key_bytes.unwrap_or(DIGEST_BYTES)
    }

    /// Reject key widths outside 1..=32
    pub fn validate(&self) -> Result<(), DedupError> {
        match self.key_bytes {
            Some(n) if n == 0 || n > DIGEST_BYTES => Err(DedupError::Config(format!(
                "key width must be between 1 and {} bytes, got {}",
                DIGEST_BYTES, n
            ))),
            _ => Ok(()),
        }
    }
}

/// Produces an `ImageRecord` for a file.
///
/// Implement this to substitute the decoding/digest strategy (e.g. in tests).
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, path: &Path) -> Result<ImageRecord, FingerprintError>;
}

/// Default fingerprinter: decode, then digest the pixels
pub struct PixelFingerprinter {
    config: FingerprintConfig,
    decoder: Box<dyn ImageDecoder>,
}

impl PixelFingerprinter {
    /// Create a fingerprinter using the fast decoder
    pub fn new(config: FingerprintConfig) -> Result<Self, DedupError> {
        Self::with_decoder(config, Box::new(FastDecoder::new()))
    }

    /// Create a fingerprinter with a custom decoder
    pub fn with_decoder(
        config: FingerprintConfig,
        decoder: Box<dyn ImageDecoder>,
    ) -> Result<Self, DedupError> {
        config.validate()?;
        Ok(Self { config, decoder })
    }

    pub fn config(&self) -> &FingerprintConfig {
        &self.config
    }
}

impl Default for PixelFingerprinter {
    fn default() -> Self {
        Self {
            config: FingerprintConfig::default(),
            decoder: Box::new(FastDecoder::new()),
        }
    }
}

impl Fingerprinter for PixelFingerprinter {
    fn fingerprint(&self, path: &Path) -> Result<ImageRecord, FingerprintError> {
        let image = self.decoder.decode(path)?;

        if image.width() == 0 || image.height() == 0 {
            return Err(FingerprintError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        let fingerprint = Fingerprint::of_image(&image, self.config.key_width());
        debug!(path = %path.display(), %fingerprint, "fingerprinted");

        Ok(ImageRecord {
            path: path.to_path_buf(),
            fingerprint,
            dimensions: (image.width(), image.height()),
            decoded: self.config.retain_pixels.then(|| Arc::new(image)),
        })
    }
}
