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

use crate::backend::Backend;
use crate::bitmap::Bitmap;
use crate::internal_utils::*;
use crate::io::Input;
use crate::source::*;
use crate::*;

use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::path::Path;

pub static BACKEND: Backend = Backend {
    name: "png",
    description: "PNG decoder backed by the png crate.",
    website: "https://github.com/image-rs/image-png",
    license: "MIT",
    open_path,
    open_input,
};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Converts one 8-bit decoded row to RGBA. Gray is replicated into the three color channels and
/// a missing alpha channel is filled with 0xff.
pub(crate) fn expand_row(color_type: png::ColorType, src: &[u8], dst: &mut [u8]) -> ImvResult<()> {
    let channels = match color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => {
            return ImvError::decode_failed("png palette was not expanded");
        }
    };
    if src.len() / channels < dst.len() / 4 {
        return ImvError::decode_failed("png row is too short");
    }
    for (pixel, out) in src.chunks_exact(channels).zip(dst.chunks_exact_mut(4)) {
        let rgba = match color_type {
            png::ColorType::Grayscale => [pixel[0], pixel[0], pixel[0], 0xff],
            png::ColorType::GrayscaleAlpha => [pixel[0], pixel[0], pixel[0], pixel[1]],
            png::ColorType::Rgb => [pixel[0], pixel[1], pixel[2], 0xff],
            _ => [pixel[0], pixel[1], pixel[2], pixel[3]],
        };
        out.copy_from_slice(&rgba);
    }
    Ok(())
}

pub(crate) struct PngDecoder<R: Read> {
    // Dropped as soon as the image has been decoded.
    reader: Option<png::Reader<R>>,
    width: u32,
    height: u32,
}

impl<R: Read> PngDecoder<R> {
    /// `stream` must start with the signature.
    pub(crate) fn create(stream: R) -> ImvResult<Self> {
        let mut decoder = png::Decoder::new(stream);
        // Palette expansion, sub-byte unpacking and tRNS to alpha, then 16 to 8 bits.
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let reader = match decoder.read_info() {
            Ok(reader) => reader,
            Err(err) => {
                log::debug!("png: unable to read header: {err}");
                return ImvError::unsupported();
            }
        };
        let info = reader.info();
        let (width, height) = (info.width, info.height);
        log::debug!("png: {width}x{height} {:?}", info.color_type);
        Ok(Self {
            reader: Some(reader),
            width,
            height,
        })
    }

    fn decode(reader: &mut png::Reader<R>, width: u32, height: u32) -> ImvResult<Bitmap> {
        let mut bitmap = Bitmap::allocate(width, height)?;
        let (color_type, bit_depth) = reader.output_color_type();
        if bit_depth != png::BitDepth::Eight {
            return ImvError::decode_failed(format!("unexpected png output depth {bit_depth:?}"));
        }
        let mut buffer = try_alloc_zeroed(reader.output_buffer_size())?;
        let info = reader
            .next_frame(&mut buffer)
            .map_err(ImvError::map_decode_failed)?;
        if info.width != width || info.height != height || info.line_size == 0 {
            return ImvError::decode_failed("png frame does not match the header");
        }
        let row_bytes = bitmap.row_bytes();
        let rows = buffer[..info.buffer_size()].chunks_exact(info.line_size);
        for (src, dst) in rows.zip(bitmap.data_mut().chunks_exact_mut(row_bytes)) {
            expand_row(color_type, src, dst)?;
        }
        Ok(bitmap)
    }
}

impl<R: Read> FrameDecoder for PngDecoder<R> {
    fn first_frame(&mut self) -> ImvResult<DecodedFrame> {
        let Some(mut reader) = self.reader.take() else {
            return ImvError::decode_failed("png image has already been decoded");
        };
        let bitmap = Self::decode(&mut reader, self.width, self.height)?;
        Ok((bitmap, 0))
    }

    fn next_frame(&mut self) -> ImvResult<DecodedFrame> {
        log::warn!("png: animated png is not supported");
        ImvError::not_implemented()
    }
}

fn open_path(path: &Path) -> ImvResult<Source<'static>> {
    let mut file = File::open(path).map_err(ImvError::map_bad_path)?;
    let mut signature = [0u8; 8];
    match file.read_exact(&mut signature) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return ImvError::unsupported();
        }
        Err(err) => return ImvError::bad_path(err),
    }
    if signature != PNG_SIGNATURE {
        return ImvError::unsupported();
    }
    let stream = Cursor::new(signature).chain(BufReader::new(file));
    Ok(Source::create(
        BACKEND.name,
        Box::new(PngDecoder::create(stream)?),
    ))
}

fn open_input(input: Input<'_>) -> ImvResult<Source<'_>> {
    let signature: [u8; 8] = match input.bytes().get(..8) {
        Some(bytes) if bytes == PNG_SIGNATURE => PNG_SIGNATURE,
        _ => return ImvError::unsupported(),
    };
    let mut rest = Cursor::new(input);
    rest.set_position(8);
    let stream = Cursor::new(signature).chain(rest);
    Ok(Source::create(
        BACKEND.name,
        Box::new(PngDecoder::create(stream)?),
    ))
}
