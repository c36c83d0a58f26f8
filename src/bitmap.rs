use image::GenericImageView;
use std::io::Write;

/// Pixel data ready to be written as a PDF image XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) color_space: &'static str,
    pub(crate) bits_per_component: u8,
    pub(crate) filter: &'static str,
    pub(crate) data: Vec<u8>,
    pub(crate) alpha: Option<AlphaData>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AlphaData {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) bits_per_component: u8,
    pub(crate) filter: &'static str,
    pub(crate) data: Vec<u8>,
}

impl ImageData {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Straight (non-premultiplied) RGBA8 rows, top row first.
    pub fn from_rgba8(width: u32, height: u32, rgba: &[u8]) -> ImageData {
        let pixels = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);
        let mut has_alpha = false;
        for px in rgba.chunks_exact(4).take(pixels) {
            if px[3] != 255 {
                has_alpha = true;
            }
            rgb.extend_from_slice(&px[..3]);
            alpha.push(px[3]);
        }

        let alpha = if has_alpha {
            Some(AlphaData {
                width,
                height,
                bits_per_component: 8,
                filter: "/FlateDecode",
                data: flate_compress(&alpha),
            })
        } else {
            None
        };
        ImageData {
            width,
            height,
            color_space: "/DeviceRGB",
            bits_per_component: 8,
            filter: "/FlateDecode",
            data: flate_compress(&rgb),
            alpha,
        }
    }

    pub fn solid_rgb(width: u32, height: u32, rgb: [u8; 3]) -> ImageData {
        let rgba: Vec<u8> = (0..(width as usize * height as usize))
            .flat_map(|_| [rgb[0], rgb[1], rgb[2], 255])
            .collect();
        ImageData::from_rgba8(width, height, &rgba)
    }
}

/// Decodes PNG/JPEG bytes. Gray and RGB JPEG data is passed through untouched
/// as `/DCTDecode`; CMYK/YCCK JPEGs are re-encoded from decoded RGB.
pub fn decode_image_bytes(data: &[u8]) -> Result<ImageData, image::ImageError> {
    let format = image::guess_format(data).ok();
    let decoded = image::load_from_memory(data)?;
    let (width, height) = decoded.dimensions();

    if matches!(format, Some(image::ImageFormat::Jpeg)) {
        let color_space = match jpeg_component_count(data) {
            Some(1) => Some("/DeviceGray"),
            Some(3) => Some("/DeviceRGB"),
            _ => None,
        };
        if let Some(color_space) = color_space {
            return Ok(ImageData {
                width,
                height,
                color_space,
                bits_per_component: 8,
                filter: "/DCTDecode",
                data: data.to_vec(),
                alpha: None,
            });
        }
    }

    let rgba = decoded.to_rgba8();
    Ok(ImageData::from_rgba8(width, height, rgba.as_raw()))
}

/// Component count from the first SOF segment, or `None` if the header
/// cannot be walked before scan data starts.
fn jpeg_component_count(data: &[u8]) -> Option<u8> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        match marker {
            0xFF => {
                pos += 1;
                continue;
            }
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            }
            0xDA | 0xD9 => return None,
            _ => {}
        }
        let len = u16::from_be_bytes([*data.get(pos + 2)?, *data.get(pos + 3)?]) as usize;
        let is_sof = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            // length(2) precision(1) height(2) width(2) components(1)
            return data.get(pos + 9).copied();
        }
        pos += 2 + len;
    }
    None
}

pub(crate) fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}
