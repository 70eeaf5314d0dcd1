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

use clap::value_parser;
use clap::Parser;

use imv_backends::*;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Decode(#[from] ImvError),
    #[error("unknown backend {0} (see --list-backends)")]
    UnknownBackend(String),
    #[error("could not write {}: {message}", .path.display())]
    Write { path: PathBuf, message: String },
    #[error("input_file is required")]
    MissingInput,
}

type CliResult<T> = Result<T, CliError>;

fn write_error<E: std::fmt::Display>(path: &Path) -> impl FnOnce(E) -> CliError + '_ {
    move |err| CliError::Write {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[derive(Parser)]
struct CommandLineArgs {
    /// Read the whole input into memory and decode it from there instead of from its path
    #[arg(long, default_value = "false")]
    memory: bool,

    /// Only try this backend (see --list-backends). By default every backend is tried in order.
    #[arg(long, short = 'b')]
    backend: Option<String>,

    /// Number of frames to decode. Animations wrap around after their last frame.
    #[arg(long, short = 'n', default_value_t = 1, value_parser = value_parser!(u32).range(1..))]
    frames: u32,

    /// Directory in which each decoded frame is written as a PNG file
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Print the available backends and exit
    #[arg(long, default_value = "false")]
    list_backends: bool,

    /// Log probing and decoding details unless RUST_LOG says otherwise
    #[arg(long, short = 'v', default_value = "false")]
    verbose: bool,

    /// Input image file
    #[arg(allow_hyphen_values = false, required_unless_present = "list_backends")]
    input_file: Option<PathBuf>,
}

fn list_backends() {
    let backends = default_backends();
    let width = backends.iter().map(|x| x.name.len()).max().unwrap_or(0);
    for backend in backends {
        println!(
            "{:<width$} : {} ({}, {})",
            backend.name, backend.description, backend.license, backend.website
        );
    }
}

fn candidates(args: &CommandLineArgs) -> CliResult<Vec<&'static Backend>> {
    match &args.backend {
        Some(name) => match find_backend(name) {
            Some(backend) => Ok(vec![backend]),
            None => Err(CliError::UnknownBackend(name.clone())),
        },
        None => Ok(default_backends()),
    }
}

fn write_png(path: &Path, image: &Image) -> CliResult<()> {
    let file = File::create(path).map_err(write_error(path))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().map_err(write_error(path))?;
    writer
        .write_image_data(image.bitmap().data())
        .map_err(write_error(path))?;
    writer.finish().map_err(write_error(path))
}

fn play(args: &CommandLineArgs, source: &mut Source<'_>) -> CliResult<()> {
    println!("Opened with backend: {}", source.backend_name());
    let mut total_ms: u64 = 0;
    for index in 0..args.frames {
        let frame = if index == 0 {
            source.load_first_frame()
        } else {
            source.load_next_frame()
        };
        let Some(image) = frame.image else {
            println!(" * Frame [{index}]: decode failed");
            continue;
        };
        total_ms += u64::from(frame.frametime);
        println!(
            " * Frame [{index}]: {}x{}, {} ms",
            image.width(),
            image.height(),
            frame.frametime
        );
        if let Some(output) = &args.output {
            let path = output.join(format!("frame_{index:04}.png"));
            write_png(&path, &image)?;
            println!("   Wrote {}", path.display());
        }
    }
    println!("Total display time: {total_ms} ms");
    source.release();
    Ok(())
}

fn decode(args: &CommandLineArgs, input_file: &Path) -> CliResult<()> {
    let backends = candidates(args)?;
    if let Some(output) = &args.output {
        std::fs::create_dir_all(output).map_err(write_error(output))?;
    }
    if args.memory {
        let data = std::fs::read(input_file).map_err(|err| ImvError::BadPath(err.to_string()))?;
        let mut source = open_memory_with(&backends, &data)?;
        play(args, &mut source)
    } else {
        let mut source = open_path_with(&backends, input_file)?;
        play(args, &mut source)
    }
}

fn main() {
    let args = CommandLineArgs::parse();
    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if args.list_backends {
        list_backends();
        std::process::exit(0);
    }
    let res = match &args.input_file {
        Some(input_file) => decode(&args, input_file),
        None => Err(CliError::MissingInput),
    };
    match res {
        Ok(_) => std::process::exit(0),
        Err(err) => {
            eprintln!("ERROR: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CommandLineArgs {
        CommandLineArgs::try_parse_from(std::iter::once("imv-decode").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn backend_selection() {
        let args = parse(&["--backend", "png", "input.png"]);
        let backends = candidates(&args).unwrap();
        assert_eq!(backends.len(), 1);
        assert_eq!(backends[0].name, "png");
        let args = parse(&["input.png"]);
        assert_eq!(candidates(&args).unwrap().len(), default_backends().len());
    }

    #[test]
    fn unknown_backend() {
        let args = parse(&["-b", "webp", "input.webp"]);
        let err = candidates(&args).unwrap_err();
        assert!(matches!(&err, CliError::UnknownBackend(name) if name == "webp"));
        assert_eq!(
            err.to_string(),
            "unknown backend webp (see --list-backends)"
        );
    }

    #[test]
    fn unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frame.png");
        let bitmap = Bitmap::copy_from_slice(1, 1, &[1, 2, 3, 4]).unwrap();
        let err = write_png(&path, &Image::from_bitmap(bitmap)).unwrap_err();
        assert!(matches!(&err, CliError::Write { path: written, .. } if *written == path));
    }

    #[test]
    fn decode_errors_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse(&["--backend", "png", "missing.png"]);
        let err = decode(&args, &dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, CliError::Decode(ImvError::BadPath(_))));
    }
}
