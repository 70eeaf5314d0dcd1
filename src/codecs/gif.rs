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

use std::io::Cursor;
use std::path::Path;

pub static BACKEND: Backend = Backend {
    name: "gif",
    description: "GIF decoder with frame disposal, backed by the gif and gif-dispose crates.",
    website: "https://github.com/image-rs/image-gif",
    license: "MIT",
    open_path,
    open_input,
};

type GifStream<'a> = gif::Decoder<Cursor<Input<'a>>>;

fn decode_options() -> gif::DecodeOptions {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    options
}

// Composites frames in stream order. Frames can only be reached by going through all the frames
// before them, so seeking backwards means starting over.
struct Player<'a> {
    decoder: GifStream<'a>,
    screen: gif_dispose::Screen,
    next_index: usize,
}

impl<'a> Player<'a> {
    fn create(input: Input<'a>) -> ImvResult<Self> {
        let decoder = decode_options()
            .read_info(Cursor::new(input))
            .map_err(ImvError::map_decode_failed)?;
        let screen = gif_dispose::Screen::new_decoder(&decoder);
        Ok(Self {
            decoder,
            screen,
            next_index: 0,
        })
    }

    fn advance_to(&mut self, index: usize) -> ImvResult<()> {
        while self.next_index <= index {
            let frame = match self.decoder.read_next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    return ImvError::decode_failed(format!("gif ended before frame {index}"))
                }
                Err(err) => return ImvError::decode_failed(err),
            };
            self.screen
                .blit_frame(frame)
                .map_err(ImvError::map_decode_failed)?;
            self.next_index += 1;
        }
        Ok(())
    }

    fn to_bitmap(&mut self) -> ImvResult<Bitmap> {
        let (pixels, width, height) = self.screen.pixels_rgba().to_contiguous_buf();
        if width != self.decoder.width() as usize || height != self.decoder.height() as usize {
            return ImvError::decode_failed("width/height mismatch between gif decoder and screen");
        }
        // The canvas is reused for the following frames, so it is copied out.
        let mut bitmap =
            Bitmap::allocate(self.decoder.width().into(), self.decoder.height().into())?;
        for (dst, rgba) in bitmap.data_mut().chunks_exact_mut(4).zip(pixels.iter()) {
            dst.copy_from_slice(&[rgba.r, rgba.g, rgba.b, rgba.a]);
        }
        Ok(bitmap)
    }
}

pub(crate) struct GifDecoder<'a> {
    input: Input<'a>,
    // GIF delays are in hundredths of a second.
    delays: Vec<u16>,
    index: usize,
    player: Option<Player<'a>>,
}

impl<'a> GifDecoder<'a> {
    /// Walks the whole stream once without decompressing any frame, to count the frames and
    /// record their delays.
    pub(crate) fn create(input: Input<'a>) -> ImvResult<Self> {
        let mut options = decode_options();
        options.skip_frame_decoding(true);
        let mut scanner = match options.read_info(Cursor::new(input.clone())) {
            Ok(scanner) => scanner,
            Err(err) => {
                log::debug!("gif: not a gif stream: {err}");
                return ImvError::unsupported();
            }
        };
        let mut delays = Vec::new();
        loop {
            match scanner.next_frame_info() {
                Ok(Some(frame)) => delays.push(frame.delay),
                Ok(None) => break,
                Err(err) => {
                    log::debug!("gif: scan stopped after {} frames: {err}", delays.len());
                    break;
                }
            }
        }
        if delays.is_empty() {
            log::debug!("gif: stream has no frames");
            return ImvError::unsupported();
        }
        log::debug!(
            "gif: {}x{} with {} frames",
            scanner.width(),
            scanner.height(),
            delays.len()
        );
        Ok(Self {
            input,
            delays,
            index: 0,
            player: None,
        })
    }

    pub(crate) fn frame_count(&self) -> usize {
        self.delays.len()
    }

    fn decode_frame(&mut self, index: usize) -> ImvResult<Bitmap> {
        if self.player.as_ref().is_some_and(|player| player.next_index > index) {
            self.player = None;
        }
        if self.player.is_none() {
            self.player = Some(Player::create(self.input.clone())?);
        }
        let Some(player) = self.player.as_mut() else {
            return ImvError::decode_failed("gif player is missing");
        };
        player.advance_to(index)?;
        player.to_bitmap()
    }

    fn load(&mut self) -> ImvResult<DecodedFrame> {
        let index = self.index;
        match self.decode_frame(index) {
            Ok(bitmap) => Ok((bitmap, u32::from(self.delays[index]) * 10)),
            Err(err) => {
                log::debug!("gif: frame {index} failed: {err}");
                // Start over cleanly on the next request.
                self.player = None;
                Err(err)
            }
        }
    }
}

impl FrameDecoder for GifDecoder<'_> {
    fn first_frame(&mut self) -> ImvResult<DecodedFrame> {
        self.index = 0;
        self.load()
    }

    fn next_frame(&mut self) -> ImvResult<DecodedFrame> {
        self.index = (self.index + 1) % self.frame_count();
        self.load()
    }
}

fn open_path(path: &Path) -> ImvResult<Source<'static>> {
    open_input(Input::map_file(path)?)
}

fn open_input(input: Input<'_>) -> ImvResult<Source<'_>> {
    Ok(Source::create(
        BACKEND.name,
        Box::new(GifDecoder::create(input)?),
    ))
}
