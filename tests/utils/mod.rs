// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Not all functions are used from all test targets. So allow dead code in this module.
#![allow(dead_code)]

use imv_backends::*;

use rand::Rng;
use rand::SeedableRng;

use std::path::Path;
use std::path::PathBuf;

pub const RED: [u8; 3] = [255, 0, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];
pub const WHITE: [u8; 3] = [255, 255, 255];

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("Failed to write fixture");
    path
}

#[cfg(feature = "gif")]
fn gif_palette(colors: &[[u8; 3]]) -> Vec<u8> {
    colors.iter().flatten().copied().collect()
}

/// A looping GIF where frame `i` fills the whole canvas with `colors[i]`.
#[cfg(feature = "gif")]
pub fn gif_animation(width: u16, height: u16, colors: &[[u8; 3]], delay: u16) -> Vec<u8> {
    let palette = gif_palette(colors);
    let mut encoder = gif::Encoder::new(Vec::new(), width, height, &palette).unwrap();
    encoder.set_repeat(gif::Repeat::Infinite).unwrap();
    for index in 0..colors.len() {
        let pixels = vec![index as u8; width as usize * height as usize];
        let mut frame = gif::Frame::from_indexed_pixels(width, height, pixels, None);
        frame.delay = delay;
        encoder.write_frame(&frame).unwrap();
    }
    encoder.into_inner().unwrap()
}

/// A 4x2 GIF whose second frame only covers the left half of the canvas.
#[cfg(feature = "gif")]
pub fn gif_partial_update() -> Vec<u8> {
    let palette = gif_palette(&[RED, GREEN]);
    let mut encoder = gif::Encoder::new(Vec::new(), 4, 2, &palette).unwrap();
    let mut frame = gif::Frame::from_indexed_pixels(4, 2, vec![0; 8], None);
    frame.delay = 5;
    frame.dispose = gif::DisposalMethod::Keep;
    encoder.write_frame(&frame).unwrap();
    let mut frame = gif::Frame::from_indexed_pixels(2, 2, vec![1; 4], None);
    frame.delay = 7;
    encoder.write_frame(&frame).unwrap();
    encoder.into_inner().unwrap()
}

#[cfg(feature = "png")]
fn encode_png(
    width: u32,
    height: u32,
    color: png::ColorType,
    depth: png::BitDepth,
    data: &[u8],
) -> Vec<u8> {
    let mut output = Vec::new();
    let mut encoder = png::Encoder::new(&mut output, width, height);
    encoder.set_color(color);
    encoder.set_depth(depth);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(data).unwrap();
    writer.finish().unwrap();
    output
}

/// A black and white checkerboard, one pixel per square.
fn checker(x: u32, y: u32) -> bool {
    (x + y) % 2 == 0
}

#[cfg(feature = "png")]
pub fn png_gray_1bit_checker(width: u32, height: u32) -> Vec<u8> {
    let row_bytes = width.div_ceil(8) as usize;
    let mut data = vec![0u8; row_bytes * height as usize];
    for y in 0..height {
        for x in 0..width {
            if checker(x, y) {
                data[y as usize * row_bytes + x as usize / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    encode_png(width, height, png::ColorType::Grayscale, png::BitDepth::One, &data)
}

#[cfg(feature = "png")]
pub fn png_rgb_8bit_checker(width: u32, height: u32) -> Vec<u8> {
    let mut data = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let value = if checker(x, y) { 255 } else { 0 };
            data.extend_from_slice(&[value; 3]);
        }
    }
    encode_png(width, height, png::ColorType::Rgb, png::BitDepth::Eight, &data)
}

/// Returns the encoded PNG and its RGBA pixels.
#[cfg(feature = "png")]
pub fn png_rgba_random(width: u32, height: u32, seed: u64) -> (Vec<u8>, Vec<u8>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut pixels = vec![0u8; (width * height * 4) as usize];
    rng.fill(&mut pixels[..]);
    let encoded = encode_png(width, height, png::ColorType::Rgba, png::BitDepth::Eight, &pixels);
    (encoded, pixels)
}

#[cfg(feature = "png")]
pub fn png_palette_with_transparency() -> Vec<u8> {
    let mut output = Vec::new();
    let mut encoder = png::Encoder::new(&mut output, 2, 1);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(vec![10, 20, 30, 40, 50, 60]);
    encoder.set_trns(vec![0x80]);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&[0, 1]).unwrap();
    writer.finish().unwrap();
    output
}

#[cfg(feature = "image")]
pub fn bmp_rgb(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let pixels = ::image::RgbImage::from_pixel(width, height, ::image::Rgb(color));
    let mut output = std::io::Cursor::new(Vec::new());
    pixels
        .write_to(&mut output, ::image::ImageFormat::Bmp)
        .unwrap();
    output.into_inner()
}

/// Bytes that none of the backends recognizes.
pub fn not_an_image() -> Vec<u8> {
    b"this is a plain text file and not an image at all".to_vec()
}

/// A bare JPEG XL codestream signature followed by garbage.
pub fn jxl_truncated_codestream() -> Vec<u8> {
    vec![0xff, 0x0a, 0x00, 0x01, 0x02]
}

/// Lossless JPEG XL codestream of 8-bit `pixels` in `colorspace`.
#[cfg(feature = "jpegxl")]
pub fn jxl_encode(
    width: usize,
    height: usize,
    colorspace: zune_core::colorspace::ColorSpace,
    pixels: &[u8],
) -> Vec<u8> {
    let options = zune_core::options::EncoderOptions::new(
        width,
        height,
        colorspace,
        zune_core::bit_depth::BitDepth::Eight,
    );
    zune_jpegxl::JxlSimpleEncoder::new(pixels, options)
        .encode()
        .unwrap()
}

#[cfg(feature = "jpegxl")]
pub fn jxl_rgba(width: usize, height: usize, pixels: &[u8]) -> Vec<u8> {
    jxl_encode(width, height, zune_core::colorspace::ColorSpace::RGBA, pixels)
}

#[cfg(feature = "jpegxl")]
pub fn jxl_gray(width: usize, height: usize, pixels: &[u8]) -> Vec<u8> {
    jxl_encode(width, height, zune_core::colorspace::ColorSpace::Luma, pixels)
}

// LSB-first bit writer, the bit order of JPEG XL headers.
#[cfg(feature = "jpegxl")]
#[derive(Default)]
struct JxlBits {
    bytes: Vec<u8>,
    bits: usize,
}

#[cfg(feature = "jpegxl")]
impl JxlBits {
    fn put(&mut self, count: usize, value: u64) {
        for bit in 0..count {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if (value >> bit) & 1 == 1 {
                *self.bytes.last_mut().unwrap() |= 1 << (self.bits % 8);
            }
            self.bits += 1;
        }
    }

    fn zero_pad(&mut self) {
        self.bits = self.bytes.len() * 8;
    }

    fn size(&mut self, size: usize) {
        assert!(size > 1 && size <= 512);
        self.put(2, 0);
        self.put(9, (size - 1) as u64);
    }

    // Image header of an 8-bit RGBA codestream. `animated` adds an animation
    // header with 100 ticks per second.
    fn image_header(&mut self, width: usize, height: usize, animated: bool) {
        self.put(16, 0x0aff);
        self.put(1, 0); // not small
        self.size(height);
        self.put(3, 0); // no ratio
        self.size(width);
        self.put(1, 0); // metadata all_default
        self.put(1, u64::from(animated)); // extra_fields
        if animated {
            self.put(3, 0); // orientation 1
            self.put(1, 0); // no intrinsic size
            self.put(1, 0); // no preview
            self.put(1, 1); // have_animation
            self.put(2, 0); // tps_numerator = 100
            self.put(2, 0); // tps_denominator = 1
            self.put(2, 0); // num_loops = 0
            self.put(1, 0); // no timecodes
        }
        self.put(1, 0); // integer samples
        self.put(2, 0); // 8 bits per sample
        self.put(1, 1); // modular_16bit_buffers
        self.put(2, 1); // one extra channel
        self.put(1, 1); // default alpha channel
        self.put(1, 0); // not xyb
        self.put(1, 1); // sRGB colour encoding
        if animated {
            self.put(1, 1); // default tone mapping
        }
        self.put(2, 0); // no extensions
        self.put(1, 1); // default transform data
        self.zero_pad();
    }

    // Frame header of a modular RGBA frame. `duration` is only present in
    // animated codestreams.
    fn frame_header(&mut self, duration: Option<u8>, is_last: bool) {
        self.put(1, 0); // all_default
        self.put(2, 0); // regular frame
        self.put(1, 1); // modular
        self.put(2, 0); // no flags
        self.put(1, 0); // not YCbCr
        self.put(2, 0); // no upsampling
        self.put(2, 0); // no alpha upsampling
        self.put(2, 1); // default group size
        self.put(2, 0); // one pass
        self.put(1, 0); // no crop
        self.put(2, 0); // replace
        self.put(2, 0); // replace alpha
        if let Some(ticks) = duration {
            self.put(2, 2);
            self.put(8, u64::from(ticks));
        }
        self.put(1, u64::from(is_last));
        if !is_last {
            self.put(2, 0); // not saved as reference
        }
        self.put(2, 0); // no name
        self.put(1, 0); // restoration filter not all_default
        self.put(1, 0); // no gaborish
        self.put(2, 0); // no EPF
        self.put(2, 0); // no restoration filter extensions
        self.put(2, 0); // no frame header extensions
        self.put(1, 0); // no TOC permutation
        self.zero_pad();
    }
}

/// An animated RGBA JPEG XL codestream at 100 ticks per second. Frame `i`
/// fills the canvas with `frames[i].0` and lasts `frames[i].1` ticks.
///
/// Each frame is encoded as a still image and its TOC and group data are
/// placed behind animated frame headers.
#[cfg(feature = "jpegxl")]
pub fn jxl_animation(width: usize, height: usize, frames: &[([u8; 4], u8)]) -> Vec<u8> {
    let mut still_headers = JxlBits::default();
    still_headers.image_header(width, height, false);
    still_headers.frame_header(None, true);

    let mut output = JxlBits::default();
    output.image_header(width, height, true);
    let mut stream = output.bytes;
    for (index, (color, ticks)) in frames.iter().enumerate() {
        let pixels: Vec<u8> = color.repeat(width * height);
        let still = jxl_rgba(width, height, &pixels);
        assert!(still.starts_with(&still_headers.bytes));
        let mut header = JxlBits::default();
        header.frame_header(Some(*ticks), index + 1 == frames.len());
        stream.extend_from_slice(&header.bytes);
        stream.extend_from_slice(&still[still_headers.bytes.len()..]);
    }
    stream
}

pub fn assert_rgba(image: &Image, x: u32, y: u32, rgba: [u8; 4]) {
    let offset = (y * image.width() + x) as usize * 4;
    assert_eq!(
        &image.bitmap().data()[offset..offset + 4],
        &rgba,
        "pixel ({x}, {y})"
    );
}

pub fn load_first(source: &mut Source<'_>) -> (Image, u32) {
    let frame = source.load_first_frame();
    (frame.image.expect("first frame failed"), frame.frametime)
}

pub fn load_next(source: &mut Source<'_>) -> (Image, u32) {
    let frame = source.load_next_frame();
    (frame.image.expect("next frame failed"), frame.frametime)
}
