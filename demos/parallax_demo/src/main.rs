// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Loads a layer stack, drags it, and writes the result.
//!
//! Images come from the command line, or are generated when none are given.
//! Decoding runs on worker threads while the main thread pumps completions
//! until the stack is interactive. A drag is then simulated as a series of
//! touch events, the stack is painted into a
//! [`PixmapSurface`](parallax_render::PixmapSurface) and saved as a PNG.
//!
//! Every event is recorded with a
//! [`RecorderSink`](parallax_debug::recorder::RecorderSink). With `--pretty`
//! the recording is replayed as text; with `--trace` it is exported as a
//! Chrome trace JSON file.

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use image::{ImageFormat, Rgba, RgbaImage};
use log::{info, warn};

use parallax_core::host::Host;
use parallax_core::measure::MeasureSpec;
use parallax_core::source::{ImageId, ImageSource};
use parallax_core::stack::LayerStack;
use parallax_core::touch::TouchEvent;
use parallax_debug::pretty::PrettyPrintSink;
use parallax_debug::recorder::{RecorderSink, decode};
use parallax_render::{FileImageSource, MemoryImageSource, PixmapSurface};

/// Width and height of generated layers.
const GENERATED_SIZE: (u32, u32) = (320, 240);

#[derive(Parser, Debug)]
#[command(name = "parallax_demo", version)]
struct Args {
    /// Layer images, back to front. Layers are generated when empty.
    images: Vec<PathBuf>,

    /// Number of layers to generate when no images are given.
    #[arg(long, default_value_t = 4)]
    layers: u32,

    /// Width constraint: `exact:N`, `at-most:N` or `any`.
    #[arg(long, default_value = "any", value_parser = parse_spec)]
    width: MeasureSpec,

    /// Height constraint: `exact:N`, `at-most:N` or `any`.
    #[arg(long, default_value = "any", value_parser = parse_spec)]
    height: MeasureSpec,

    /// Total horizontal finger travel in pixels.
    #[arg(long, default_value_t = -60.0, allow_negative_numbers = true)]
    drag_x: f64,

    /// Total vertical finger travel in pixels.
    #[arg(long, default_value_t = -30.0, allow_negative_numbers = true)]
    drag_y: f64,

    /// Number of move events the drag is split into.
    #[arg(long, default_value_t = 5)]
    steps: u32,

    /// Where to write the painted frame.
    #[arg(long, default_value = "parallax.png")]
    output: PathBuf,

    /// Write a Chrome trace JSON file.
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Print the recorded events to stdout.
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Give up if loading takes longer than this many seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

fn parse_spec(s: &str) -> Result<MeasureSpec, String> {
    if s == "any" {
        return Ok(MeasureSpec::unspecified());
    }
    let (mode, size) = s
        .split_once(':')
        .ok_or_else(|| format!("expected `exact:N`, `at-most:N` or `any`, got `{s}`"))?;
    let size: u32 = size
        .parse()
        .map_err(|err| format!("bad size `{size}`: {err}"))?;
    match mode {
        "exact" => Ok(MeasureSpec::exact(size)),
        "at-most" => Ok(MeasureSpec::at_most(size)),
        other => Err(format!("unknown measure mode `{other}`")),
    }
}

/// Logs lifecycle callbacks and counts repaint requests.
#[derive(Debug, Default)]
struct DemoHost {
    invalidations: u32,
    layouts: u32,
}

impl Host for DemoHost {
    fn on_started_loading(&mut self) {
        info!("loading started");
    }

    fn on_done_loading(&mut self) {
        info!("loading finished; gestures enabled");
    }

    fn request_layout(&mut self) {
        self.layouts += 1;
    }

    fn invalidate(&mut self) {
        self.invalidations += 1;
    }
}

/// Layer `index` of `count`: an opaque gradient at the back, then
/// progressively smaller translucent discs.
fn generated_layer(index: u32, count: u32) -> Result<Vec<u8>, image::ImageError> {
    let (width, height) = GENERATED_SIZE;
    let image = if index == 0 {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([channel(x, width), channel(y, height), 96, 255])
        })
    } else {
        let cx = f64::from(width) * f64::from(index) / f64::from(count);
        let cy = f64::from(height) / 2.0;
        let radius = f64::from(height) / f64::from(index + 2);
        let tint = channel(index, count);
        RgbaImage::from_fn(width, height, |x, y| {
            let d = (f64::from(x) - cx).hypot(f64::from(y) - cy);
            if d <= radius {
                Rgba([255, tint, 255 - tint, 200])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    };
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// `value / extent` scaled to a color channel.
fn channel(value: u32, extent: u32) -> u8 {
    u8::try_from(value.saturating_mul(255) / extent.max(1)).unwrap_or(u8::MAX)
}

fn images(args: &Args) -> Result<(Arc<dyn ImageSource>, Vec<ImageId>), Box<dyn Error>> {
    if !args.images.is_empty() {
        let (source, ids) = FileImageSource::from_paths(args.images.iter().cloned());
        return Ok((Arc::new(source), ids));
    }
    let mut source = MemoryImageSource::new();
    let mut ids = Vec::new();
    for index in 0..args.layers {
        let id = ImageId(index);
        source.insert(id, generated_layer(index, args.layers)?);
        ids.push(id);
    }
    Ok((Arc::new(source), ids))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // -- stack -------------------------------------------------------------
    let (source, ids) = images(&args)?;
    let mut stack =
        LayerStack::new(source, DemoHost::default()).with_trace_sink(RecorderSink::new());

    let wakeups = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&wakeups);
    stack.set_wake_callback(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    stack.set_drawables(&ids)?;
    let size = stack.measure(args.width, args.height);
    info!("measured {}x{} with {} layers", size.width, size.height, ids.len());

    // -- load --------------------------------------------------------------
    let deadline = Instant::now() + Duration::from_secs(args.timeout_secs);
    while !stack.is_interactive() {
        if Instant::now() >= deadline {
            return Err(format!(
                "loading timed out with {} of {} layers ready",
                stack.ready_count(),
                ids.len()
            )
            .into());
        }
        stack.pump_timeout(Duration::from_millis(50));
    }
    info!(
        "{} decodes woke the loop; {} failed",
        wakeups.load(Ordering::Relaxed),
        stack.failed_count()
    );
    for (slot, layer) in stack.layers().iter().enumerate() {
        if let Some(err) = layer.decode_error() {
            warn!("layer {slot} left blank: {err}");
        }
    }

    // -- drag --------------------------------------------------------------
    let start = (f64::from(size.width) / 2.0, f64::from(size.height) / 2.0);
    let steps = args.steps.max(1);
    stack.on_touch_event(TouchEvent::down(start.0, start.1));
    for step in 1..=steps {
        let t = f64::from(step) / f64::from(steps);
        stack.on_touch_event(TouchEvent::moved(
            start.0 + args.drag_x * t,
            start.1 + args.drag_y * t,
        ));
    }
    let changes = stack.drain_changes();
    info!("{} layer transforms changed", changes.transforms.len());

    // -- paint -------------------------------------------------------------
    let mut surface = PixmapSurface::for_size(size)?;
    let failures = stack.try_paint(&mut surface);
    for (slot, err) in &failures {
        warn!("layer {slot} not painted: {err}");
    }
    surface.save_png(&args.output)?;
    info!("wrote {}", args.output.display());

    let end = (start.0 + args.drag_x, start.1 + args.drag_y);
    stack.on_touch_event(TouchEvent::up(end.0, end.1));
    info!(
        "host saw {} layout requests and {} repaint requests",
        stack.host().layouts,
        stack.host().invalidations
    );

    // -- traces ------------------------------------------------------------
    let recording = stack.into_trace_sink().into_bytes();
    if args.pretty {
        let mut pretty = PrettyPrintSink::with_writer(std::io::stdout().lock());
        for event in decode(&recording) {
            event.replay(&mut pretty);
        }
    }
    if let Some(path) = &args.trace {
        let mut writer = BufWriter::new(File::create(path)?);
        parallax_debug::chrome::export(&recording, &mut writer)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
