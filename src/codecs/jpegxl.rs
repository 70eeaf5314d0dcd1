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

use std::io::Cursor;
use std::path::Path;

pub static BACKEND: Backend = Backend {
    name: "jpegxl",
    description: "JPEG XL decoder backed by jxl-oxide.",
    website: "https://github.com/tirr-c/jxl-oxide",
    license: "MIT OR Apache-2.0",
    open_path,
    open_input,
};

const CONTAINER_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0c, 0x4a, 0x58, 0x4c, 0x20, 0x0d, 0x0a, 0x87, 0x0a,
];
const CODESTREAM_SIGNATURE: [u8; 2] = [0xff, 0x0a];

// The frame list grows by this many entries at a time.
const FRAME_CHUNK: usize = 64;

// Used when an animation declares a zero tick rate.
const DEFAULT_FRAMETIME_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signature {
    Valid,
    NotEnoughBytes,
    Invalid,
}

fn match_prefix(bytes: &[u8], signature: &[u8]) -> Signature {
    let len = bytes.len().min(signature.len());
    if bytes[..len] != signature[..len] {
        Signature::Invalid
    } else if len < signature.len() {
        Signature::NotEnoughBytes
    } else {
        Signature::Valid
    }
}

/// Tells whether `bytes` start like a bare JPEG XL codestream or a JPEG XL container.
pub fn check_signature(bytes: &[u8]) -> Signature {
    match match_prefix(bytes, &CODESTREAM_SIGNATURE) {
        Signature::Invalid => match_prefix(bytes, &CONTAINER_SIGNATURE),
        result => result,
    }
}

/// Events produced while decoding a whole JPEG XL stream, in the order the decode loop
/// expects them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum JxlEvent {
    BasicInfo {
        width: u32,
        height: u32,
        /// Ticks per second as (numerator, denominator), for animations.
        tick_rate: Option<(u32, u32)>,
    },
    NeedImageOutBuffer {
        size: usize,
        duration_ticks: u32,
    },
    FullImage,
    Success,
    NeedMoreInput,
}

pub(crate) trait JxlEventSource {
    fn next_event(&mut self) -> ImvResult<JxlEvent>;
    /// Writes the current frame as RGBA into `buffer`. Called after `NeedImageOutBuffer`.
    fn write_image(&mut self, buffer: &mut [u8]) -> ImvResult<()>;
}

#[derive(Debug)]
struct Frame {
    data: Vec<u8>,
    frametime: u32,
}

#[derive(Debug, Default)]
struct DecodedStream {
    width: u32,
    height: u32,
    frames: Vec<Frame>,
}

fn frametime_ms(tick_rate: Option<(u32, u32)>, ticks: u32) -> u32 {
    match tick_rate {
        None => 0,
        Some((0, _)) | Some((_, 0)) => DEFAULT_FRAMETIME_MS,
        Some((numerator, denominator)) => {
            let ms = u64::from(ticks) * 1000 * u64::from(denominator) / u64::from(numerator);
            u32::try_from(ms).unwrap_or(u32::MAX)
        }
    }
}

fn decode_all<S: JxlEventSource>(source: &mut S) -> ImvResult<DecodedStream> {
    let mut stream = DecodedStream::default();
    let mut tick_rate = None;
    let mut pending: Option<Frame> = None;
    loop {
        match source.next_event()? {
            JxlEvent::BasicInfo {
                width,
                height,
                tick_rate: rate,
            } => {
                stream.width = width;
                stream.height = height;
                tick_rate = rate;
            }
            JxlEvent::NeedImageOutBuffer {
                size,
                duration_ticks,
            } => {
                let expected = buffer_size(stream.width, stream.height, 4)?;
                if size != expected {
                    return ImvError::decode_failed(format!(
                        "jpeg xl frame needs {size} bytes, expected {expected}"
                    ));
                }
                if stream.frames.len() == stream.frames.capacity() {
                    stream
                        .frames
                        .try_reserve_exact(FRAME_CHUNK)
                        .map_err(ImvError::map_out_of_memory)?;
                }
                let mut data = try_alloc_zeroed(size)?;
                source.write_image(&mut data)?;
                pending = Some(Frame {
                    data,
                    frametime: frametime_ms(tick_rate, duration_ticks),
                });
            }
            JxlEvent::FullImage => match pending.take() {
                Some(frame) => stream.frames.push(frame),
                None => return ImvError::decode_failed("jpeg xl frame completed without a buffer"),
            },
            JxlEvent::Success => break,
            JxlEvent::NeedMoreInput => {
                return ImvError::decode_failed("jpeg xl stream is truncated");
            }
        }
    }
    if stream.frames.is_empty() {
        return ImvError::decode_failed("jpeg xl stream has no frames");
    }
    Ok(stream)
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0 + 0.5) as u8
}

/// Converts interleaved normalized samples to RGBA8.
pub(crate) fn rgba_from_samples(
    format: jxl_oxide::PixelFormat,
    samples: &[f32],
    buffer: &mut [u8],
) -> ImvResult<()> {
    let channels = format.channels();
    if format.has_black() {
        return ImvError::decode_failed("cmyk jpeg xl images are not supported");
    }
    if samples.len() / channels != buffer.len() / 4 {
        return ImvError::decode_failed("jpeg xl frame size mismatch");
    }
    for (pixel, out) in samples.chunks_exact(channels).zip(buffer.chunks_exact_mut(4)) {
        let rgba = match format {
            jxl_oxide::PixelFormat::Gray => [pixel[0], pixel[0], pixel[0], 1.0],
            jxl_oxide::PixelFormat::Graya => [pixel[0], pixel[0], pixel[0], pixel[1]],
            jxl_oxide::PixelFormat::Rgb => [pixel[0], pixel[1], pixel[2], 1.0],
            _ => [pixel[0], pixel[1], pixel[2], pixel[3]],
        };
        for (dst, src) in out.iter_mut().zip(rgba) {
            *dst = to_u8(src);
        }
    }
    Ok(())
}

type OxideImage<'a> = jxl_oxide::JxlImage<Cursor<Input<'a>>>;

// Drives jxl-oxide and reports its progress as a sequence of JxlEvents.
struct OxideDriver<'a> {
    input: Input<'a>,
    image: Option<OxideImage<'a>>,
    render: Option<jxl_oxide::Render>,
}

impl<'a> OxideDriver<'a> {
    fn new(input: Input<'a>) -> Self {
        Self {
            input,
            image: None,
            render: None,
        }
    }
}

impl JxlEventSource for OxideDriver<'_> {
    fn next_event(&mut self) -> ImvResult<JxlEvent> {
        let Some(image) = self.image.as_mut() else {
            let image = jxl_oxide::JxlImage::from_reader(Cursor::new(self.input.clone()))
                .map_err(ImvError::map_decode_failed)?;
            let tick_rate = image
                .image_header()
                .metadata
                .animation
                .as_ref()
                .map(|animation| (animation.tps_numerator, animation.tps_denominator));
            let event = JxlEvent::BasicInfo {
                width: image.width(),
                height: image.height(),
                tick_rate,
            };
            self.image = Some(image);
            return Ok(event);
        };
        if self.render.take().is_some() {
            return Ok(JxlEvent::FullImage);
        }
        match image
            .render_next_frame()
            .map_err(ImvError::map_decode_failed)?
        {
            jxl_oxide::RenderResult::Done(render) => {
                let size = buffer_size(image.width(), image.height(), 4)?;
                let duration_ticks = render.duration();
                self.render = Some(render);
                Ok(JxlEvent::NeedImageOutBuffer {
                    size,
                    duration_ticks,
                })
            }
            jxl_oxide::RenderResult::NeedMoreData => Ok(JxlEvent::NeedMoreInput),
            jxl_oxide::RenderResult::NoMoreFrames => Ok(JxlEvent::Success),
        }
    }

    fn write_image(&mut self, buffer: &mut [u8]) -> ImvResult<()> {
        let (Some(image), Some(render)) = (self.image.as_ref(), self.render.as_ref()) else {
            return ImvError::decode_failed("no jpeg xl frame to write");
        };
        let framebuffer = render.image();
        rgba_from_samples(image.pixel_format(), framebuffer.buf(), buffer)
    }
}

pub(crate) struct JxlDecoder<'a> {
    input: Input<'a>,
    width: u32,
    height: u32,
    frames: Vec<Frame>,
    index: usize,
}

impl<'a> JxlDecoder<'a> {
    fn create(input: Input<'a>) -> ImvResult<Self> {
        match check_signature(input.bytes()) {
            Signature::Valid => {}
            // The input is always complete, so a short signature is not a JPEG XL file.
            Signature::NotEnoughBytes | Signature::Invalid => return ImvError::unsupported(),
        }
        Ok(Self {
            input,
            width: 0,
            height: 0,
            frames: Vec::new(),
            index: 0,
        })
    }

    fn decode_with<S: JxlEventSource>(&mut self, source: &mut S) -> ImvResult<()> {
        let stream = decode_all(source)?;
        log::debug!(
            "jpegxl: decoded {} frames of {}x{}",
            stream.frames.len(),
            stream.width,
            stream.height
        );
        self.width = stream.width;
        self.height = stream.height;
        self.frames = stream.frames;
        Ok(())
    }

    fn current(&self) -> ImvResult<DecodedFrame> {
        let Some(frame) = self.frames.get(self.index) else {
            return ImvError::decode_failed("jpeg xl stream has not been decoded");
        };
        let bitmap = Bitmap::copy_from_slice(self.width, self.height, &frame.data)?;
        Ok((bitmap, frame.frametime))
    }
}

impl FrameDecoder for JxlDecoder<'_> {
    fn first_frame(&mut self) -> ImvResult<DecodedFrame> {
        if self.frames.is_empty() {
            let mut driver = OxideDriver::new(self.input.clone());
            self.decode_with(&mut driver)?;
        }
        self.index = 0;
        self.current()
    }

    fn next_frame(&mut self) -> ImvResult<DecodedFrame> {
        if self.frames.is_empty() {
            return ImvError::decode_failed("jpeg xl stream has not been decoded");
        }
        self.index = if self.index == self.frames.len() - 1 {
            0
        } else {
            self.index + 1
        };
        self.current()
    }
}

fn open_path(path: &Path) -> ImvResult<Source<'static>> {
    open_input(Input::map_file(path)?)
}

fn open_input(input: Input<'_>) -> ImvResult<Source<'_>> {
    Ok(Source::create(
        BACKEND.name,
        Box::new(JxlDecoder::create(input)?),
    ))
}
