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
use crate::io::Input;
use crate::source::*;
use crate::*;

use ::image::ImageDecoder;
use std::io::BufRead;
use std::io::Cursor;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;

pub static BACKEND: Backend = Backend {
    name: "image",
    description: "Fallback for the still image formats of the image crate.",
    website: "https://github.com/image-rs/image",
    license: "MIT OR Apache-2.0",
    open_path,
    open_input,
};

enum Origin<'a> {
    // Files are read again when the frame is decoded.
    Path(PathBuf),
    Memory(Input<'a>),
}

pub(crate) struct GenericDecoder<'a> {
    origin: Origin<'a>,
    format: ::image::ImageFormat,
    last_frame: Option<Bitmap>,
}

impl<'a> GenericDecoder<'a> {
    fn create(origin: Origin<'a>, format: ::image::ImageFormat) -> ImvResult<Self> {
        if !format.reading_enabled() {
            log::debug!("image: no decoder for {format:?}");
            return ImvError::unsupported();
        }
        log::debug!("image: probed as {format:?}");
        Ok(Self {
            origin,
            format,
            last_frame: None,
        })
    }

    fn decode(&self) -> ImvResult<Bitmap> {
        let image = match &self.origin {
            Origin::Path(path) => decode_oriented(
                ::image::ImageReader::open(path).map_err(ImvError::map_decode_failed)?,
                self.format,
            ),
            Origin::Memory(input) => decode_oriented(
                ::image::ImageReader::new(Cursor::new(input.bytes())),
                self.format,
            ),
        }
        .map_err(ImvError::map_decode_failed)?;
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Bitmap::from_vec(width, height, rgba.into_raw())
    }
}

// Decodes with the EXIF orientation applied.
fn decode_oriented<R: BufRead + Seek>(
    mut reader: ::image::ImageReader<R>,
    format: ::image::ImageFormat,
) -> ::image::ImageResult<::image::DynamicImage> {
    reader.set_format(format);
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation()?;
    let mut image = ::image::DynamicImage::from_decoder(decoder)?;
    if orientation != ::image::metadata::Orientation::NoTransforms {
        log::debug!("image: applying {orientation:?}");
    }
    image.apply_orientation(orientation);
    Ok(image)
}

impl FrameDecoder for GenericDecoder<'_> {
    fn first_frame(&mut self) -> ImvResult<DecodedFrame> {
        let bitmap = self.decode()?;
        self.last_frame = Some(bitmap.clone());
        Ok((bitmap, 0))
    }

    // Only single frame images are decoded, so the next frame is the same one again.
    fn next_frame(&mut self) -> ImvResult<DecodedFrame> {
        match &self.last_frame {
            Some(bitmap) => Ok((bitmap.clone(), 0)),
            None => ImvError::decode_failed("no frame has been decoded yet"),
        }
    }
}

fn open_path(path: &Path) -> ImvResult<Source<'static>> {
    // The content decides the format. The file extension is only used when the content is not
    // recognized.
    let reader = ::image::ImageReader::open(path)
        .map_err(ImvError::map_bad_path)?
        .with_guessed_format()
        .map_err(ImvError::map_bad_path)?;
    let Some(format) = reader.format() else {
        return ImvError::unsupported();
    };
    let decoder = GenericDecoder::create(Origin::Path(path.to_path_buf()), format)?;
    Ok(Source::create(BACKEND.name, Box::new(decoder)))
}

fn open_input(input: Input<'_>) -> ImvResult<Source<'_>> {
    let Ok(format) = ::image::guess_format(input.bytes()) else {
        return ImvError::unsupported();
    };
    let decoder = GenericDecoder::create(Origin::Memory(input), format)?;
    Ok(Source::create(BACKEND.name, Box::new(decoder)))
}
