use crate::shared::frame::Frame;

/// Decodes an encoded image (PNG, JPEG, BMP, ...) into an RGB frame.
///
/// The format is sniffed from the bytes, so uploads need no file name.
pub fn decode_image(bytes: &[u8], index: usize) -> Result<Frame, image::ImageError> {
    let img = image::load_from_memory(bytes)?.to_rgb8();
    Ok(Frame::from_rgb_image(img, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decodes_png() {
        let frame = decode_image(&png_bytes(8, 6, [10, 20, 30]), 4).unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));
        assert_eq!(frame.index(), 4);
        assert_eq!(&frame.data()[..3], &[10, 20, 30]);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode_image(b"definitely not an image", 0).is_err());
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(decode_image(&[], 0).is_err());
    }
}
