//! The PNG drawn on the signing page, decoded into PDF image objects.

use std::io::Read;

use flate2::read::ZlibDecoder;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::warn;

use crate::errors::AppError;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// 8-bit pixels with colour samples and alpha kept in separate planes,
/// the layout PDF expects for an image with a soft mask.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureImage {
    pub width: u32,
    pub height: u32,
    pub gray: bool,
    pub color: Vec<u8>,
    pub alpha: Option<Vec<u8>>,
}

struct Header {
    width: u32,
    height: u32,
    color_type: u8,
}

fn invalid(reason: &str) -> AppError {
    AppError::Validation(format!("Invalid signature image: {}", reason))
}

fn be_u32(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(bytes.get(..4)?.try_into().ok()?))
}

fn parse_header(data: &[u8]) -> Result<Header, AppError> {
    if data.len() < 13 {
        return Err(invalid("short header"));
    }
    let width = be_u32(&data[0..4]).unwrap_or(0);
    let height = be_u32(&data[4..8]).unwrap_or(0);
    let (bit_depth, color_type, interlace) = (data[8], data[9], data[12]);

    if width == 0 || height == 0 {
        return Err(invalid("empty image"));
    }
    if bit_depth != 8 || !matches!(color_type, 0 | 2 | 4 | 6) {
        return Err(invalid("only 8-bit gray or RGB images are supported"));
    }
    if interlace != 0 {
        return Err(invalid("interlaced images are not supported"));
    }
    Ok(Header { width, height, color_type })
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Reverses the per-row PNG filters. `bpp` is bytes per pixel.
fn unfilter(raw: &[u8], width: usize, height: usize, bpp: usize) -> Result<Vec<u8>, AppError> {
    let stride = width * bpp;
    if raw.len() < height * (stride + 1) {
        return Err(invalid("truncated pixel data"));
    }

    let mut out = vec![0u8; height * stride];
    for row in 0..height {
        let start = row * (stride + 1);
        let filter = raw[start];
        let line = &raw[start + 1..start + 1 + stride];

        let (done, rest) = out.split_at_mut(row * stride);
        let current = &mut rest[..stride];
        let prior = (row > 0).then(|| &done[(row - 1) * stride..]);

        for i in 0..stride {
            let a = if i >= bpp { current[i - bpp] } else { 0 };
            let b = prior.map_or(0, |p| p[i]);
            let c = if i >= bpp { prior.map_or(0, |p| p[i - bpp]) } else { 0 };
            let x = line[i];
            current[i] = match filter {
                0 => x,
                1 => x.wrapping_add(a),
                2 => x.wrapping_add(b),
                3 => x.wrapping_add(((a as u16 + b as u16) / 2) as u8),
                4 => x.wrapping_add(paeth(a, b, c)),
                _ => return Err(invalid("unknown row filter")),
            };
        }
    }
    Ok(out)
}

impl SignatureImage {
    pub fn from_png(bytes: &[u8]) -> Result<Self, AppError> {
        let mut rest = bytes.strip_prefix(PNG_MAGIC).ok_or_else(|| invalid("not a PNG file"))?;
        let mut header = None;
        let mut compressed = Vec::new();

        while rest.len() >= 12 {
            let len = be_u32(rest).ok_or_else(|| invalid("truncated chunk"))? as usize;
            let kind = &rest[4..8];
            let data = rest.get(8..8 + len).ok_or_else(|| invalid("truncated chunk"))?;
            match kind {
                b"IHDR" => header = Some(parse_header(data)?),
                b"IDAT" => compressed.extend_from_slice(data),
                b"IEND" => break,
                _ => {}
            }
            rest = rest.get(12 + len..).ok_or_else(|| invalid("truncated chunk"))?;
        }

        let header = header.ok_or_else(|| invalid("missing header"))?;
        let mut raw = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut raw)
            .map_err(|_| invalid("corrupt pixel data"))?;

        let channels = match header.color_type {
            0 => 1,
            2 => 3,
            4 => 2,
            _ => 4,
        };
        let pixels = unfilter(&raw, header.width as usize, header.height as usize, channels)?;

        let gray = matches!(header.color_type, 0 | 4);
        let has_alpha = matches!(header.color_type, 4 | 6);
        let color_channels = if gray { 1 } else { 3 };

        let (color, alpha) = if has_alpha {
            let mut color = Vec::with_capacity(pixels.len());
            let mut alpha = Vec::with_capacity(pixels.len() / channels);
            for pixel in pixels.chunks_exact(channels) {
                color.extend_from_slice(&pixel[..color_channels]);
                alpha.push(pixel[color_channels]);
            }
            (color, Some(alpha))
        } else {
            (pixels, None)
        };

        Ok(Self {
            width: header.width,
            height: header.height,
            gray,
            color,
            alpha,
        })
    }

    fn stream(&self, color_space: &str, samples: Vec<u8>) -> Stream {
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => self.width as i64,
                "Height" => self.height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
            },
            samples,
        );
        if let Err(e) = stream.compress() {
            warn!(error = %e, "Signature image left uncompressed");
        }
        stream
    }

    /// Adds the image (and its soft mask) to `doc` and returns the image id.
    pub fn add_to(&self, doc: &mut Document) -> ObjectId {
        let color_space = if self.gray { "DeviceGray" } else { "DeviceRGB" };
        let mut image = self.stream(color_space, self.color.clone());
        if let Some(alpha) = &self.alpha {
            let mask_id = doc.add_object(self.stream("DeviceGray", alpha.clone()));
            image.dict.set("SMask", Object::Reference(mask_id));
        }
        doc.add_object(image)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;

    use flate2::{write::ZlibEncoder, Compression};

    fn chunk(out: &mut Vec<u8>, kind: &[u8], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        // The decoder does not verify checksums.
        out.extend_from_slice(&[0, 0, 0, 0]);
    }

    /// Encodes already-filtered rows (each starting with its filter byte).
    pub fn png(width: u32, height: u32, color_type: u8, filtered_rows: &[Vec<u8>]) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(&width.to_be_bytes());
        header.extend_from_slice(&height.to_be_bytes());
        header.extend_from_slice(&[8, color_type, 0, 0, 0]);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        for row in filtered_rows {
            encoder.write_all(row).unwrap();
        }
        let data = encoder.finish().unwrap();

        let mut out = super::PNG_MAGIC.to_vec();
        chunk(&mut out, b"IHDR", &header);
        chunk(&mut out, b"IDAT", &data);
        chunk(&mut out, b"IEND", &[]);
        out
    }

    /// A 2x1 RGBA image: one opaque black pixel, one transparent one.
    pub fn signature_png() -> Vec<u8> {
        png(2, 1, 6, &[vec![0, 0, 0, 0, 255, 0, 0, 0, 0]])
    }
}
