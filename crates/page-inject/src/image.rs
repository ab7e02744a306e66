//! Image XObjects for inserted pictures

use crate::{PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, ImageDecoder, ImageReader};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Write};

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Detected image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Detect image format from magic bytes
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 8 {
        return Err(PdfError::ImageError("Image data too short".to_string()));
    }

    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Ok(ImageFormat::Jpeg);
    }

    if data[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Ok(ImageFormat::Png);
    }

    Err(PdfError::ImageError("Unknown image format".to_string()))
}

/// JPEG info including dimensions and color components
#[derive(Debug, Clone, Copy)]
struct JpegInfo {
    width: u32,
    height: u32,
    num_components: u8,
}

/// Read the SOF segment: precision, height, width, component count
fn get_jpeg_info(data: &[u8]) -> Result<JpegInfo> {
    let mut i = 2;
    while i + 10 < data.len() {
        if data[i] != 0xFF {
            i += 1;
            continue;
        }

        let marker = data[i + 1];

        // SOF0..SOF15 except DHT, JPG and DAC
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC {
            let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
            let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
            let num_components = data[i + 9];
            return Ok(JpegInfo {
                width,
                height,
                num_components,
            });
        }

        if i + 4 < data.len() {
            let length = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            if length < 2 {
                break;
            }
            i += 2 + length;
        } else {
            break;
        }
    }

    Err(PdfError::ImageError(
        "Could not parse JPEG info".to_string(),
    ))
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Image XObject for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    /// Color space ("DeviceRGB", "DeviceGray", "DeviceCMYK")
    pub color_space: String,
    pub bits_per_component: u8,
    /// PDF filter ("DCTDecode" for JPEG, "FlateDecode" for PNG)
    pub filter: String,
    /// Encoded sample data
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit alpha channel, if the source had one
    pub smask: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Decode any supported format
    pub fn decode(data: &[u8]) -> Result<Self> {
        match detect_format(data)? {
            ImageFormat::Jpeg => Self::from_jpeg(data),
            ImageFormat::Png => Self::from_png(data),
        }
    }

    /// Create XObject from JPEG data
    ///
    /// JPEG images are embedded as-is with the DCTDecode filter.
    pub fn from_jpeg(data: &[u8]) -> Result<Self> {
        let info = get_jpeg_info(data)?;

        let color_space = match info.num_components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };

        Ok(Self {
            width: info.width,
            height: info.height,
            color_space: color_space.to_string(),
            bits_per_component: 8,
            filter: "DCTDecode".to_string(),
            data: data.to_vec(),
            smask: None,
        })
    }

    /// Create XObject from PNG data
    ///
    /// Samples are re-encoded with FlateDecode; an alpha channel becomes a
    /// separate soft mask.
    pub fn from_png(data: &[u8]) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
        let decoder = reader.into_decoder()?;

        let (width, height) = decoder.dimensions();
        let color_type = decoder.color_type();
        let image = DynamicImage::from_decoder(decoder)?;

        let (raw, color_space, alpha) = match color_type {
            image::ColorType::L8 | image::ColorType::L16 => {
                (image.to_luma8().into_raw(), "DeviceGray", None)
            }
            image::ColorType::La8 | image::ColorType::La16 => {
                let la = image.to_luma_alpha8();
                let gray: Vec<u8> = la.pixels().map(|p| p[0]).collect();
                let alpha: Vec<u8> = la.pixels().map(|p| p[1]).collect();
                (gray, "DeviceGray", Some(alpha))
            }
            image::ColorType::Rgba8 | image::ColorType::Rgba16 | image::ColorType::Rgba32F => {
                let rgba = image.to_rgba8();
                let mut rgb = Vec::with_capacity((width * height * 3) as usize);
                let mut alpha = Vec::with_capacity((width * height) as usize);
                for pixel in rgba.pixels() {
                    rgb.extend_from_slice(&pixel.0[..3]);
                    alpha.push(pixel[3]);
                }
                (rgb, "DeviceRGB", Some(alpha))
            }
            _ => (image.to_rgb8().into_raw(), "DeviceRGB", None),
        };

        // A fully opaque alpha channel carries no information
        let smask = match alpha {
            Some(alpha) if alpha.iter().any(|&a| a != 0xFF) => Some(deflate(&alpha)?),
            _ => None,
        };

        Ok(Self {
            width,
            height,
            color_space: color_space.to_string(),
            bits_per_component: 8,
            filter: "FlateDecode".to_string(),
            data: deflate(&raw)?,
            smask,
        })
    }

    /// Convert to lopdf Stream object (without the soft mask reference)
    pub fn to_pdf_stream(&self) -> Stream {
        let mut dict = Dictionary::new();

        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", self.width as i64);
        dict.set("Height", self.height as i64);
        dict.set(
            "ColorSpace",
            Object::Name(self.color_space.as_bytes().to_vec()),
        );
        dict.set("BitsPerComponent", self.bits_per_component as i64);
        dict.set("Filter", Object::Name(self.filter.as_bytes().to_vec()));
        dict.set("Length", self.data.len() as i64);

        Stream::new(dict, self.data.clone())
    }

    /// Add the image (and its soft mask) to the document
    pub fn install(self, doc: &mut Document) -> ObjectId {
        let mut stream = self.to_pdf_stream();

        if let Some(mask) = self.smask {
            let mask_dict = Dictionary::from_iter(vec![
                ("Type", "XObject".into()),
                ("Subtype", "Image".into()),
                ("Width", (self.width as i64).into()),
                ("Height", (self.height as i64).into()),
                ("ColorSpace", "DeviceGray".into()),
                ("BitsPerComponent", 8.into()),
                ("Filter", "FlateDecode".into()),
                ("Length", (mask.len() as i64).into()),
            ]);
            let mask_id = doc.add_object(Stream::new(mask_dict, mask));
            stream.dict.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(stream)
    }
}
