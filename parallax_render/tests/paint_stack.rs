// Copyright 2026 the Parallax Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end: PNG files on disk through a layer stack into a pixmap.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use parallax_core::host::Host;
use parallax_core::measure::MeasureSpec;
use parallax_core::source::PixelSize;
use parallax_core::stack::LayerStack;
use parallax_core::touch::TouchEvent;
use parallax_render::{FileImageSource, PixmapSurface};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

#[derive(Debug, Default)]
struct TestHost {
    done: u32,
}

impl Host for TestHost {
    fn on_done_loading(&mut self) {
        self.done += 1;
    }
}

/// A 40x40 image filled with `fill`, plus an optional 2x2 mark `(color, x, y)`.
fn write_png(dir: &Path, name: &str, fill: [u8; 4], mark: Option<([u8; 4], u32, u32)>) -> PathBuf {
    let mut image = RgbaImage::from_pixel(40, 40, Rgba(fill));
    if let Some((color, x, y)) = mark {
        for dy in 0..2 {
            for dx in 0..2 {
                image.put_pixel(x + dx, y + dy, Rgba(color));
            }
        }
    }
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

fn load(paths: Vec<PathBuf>) -> LayerStack<TestHost> {
    let (source, ids) = FileImageSource::from_paths(paths);
    let mut stack = LayerStack::new(Arc::new(source), TestHost::default());
    stack.set_drawables(&ids).unwrap();
    let size = stack.measure(MeasureSpec::unspecified(), MeasureSpec::unspecified());
    assert_eq!(size, PixelSize::new(40, 40));

    let deadline = Instant::now() + Duration::from_secs(10);
    while !stack.is_interactive() && Instant::now() < deadline {
        stack.pump_timeout(Duration::from_millis(20));
    }
    assert!(stack.is_interactive());
    assert_eq!(stack.host().done, 1);
    stack
}

fn render(stack: &LayerStack<TestHost>) -> PixmapSurface {
    let mut surface = PixmapSurface::for_size(stack.measured_size()).unwrap();
    stack.paint(&mut surface);
    surface
}

#[test]
fn drag_moves_deeper_layers_further() {
    let dir = tempfile::tempdir().unwrap();
    let clear = [0, 0, 0, 0];
    let paths = vec![
        write_png(dir.path(), "back.png", RED, None),
        write_png(dir.path(), "mid.png", clear, Some((BLUE, 10, 10))),
        write_png(dir.path(), "front.png", clear, Some((GREEN, 20, 20))),
    ];
    let mut stack = load(paths);

    let surface = render(&stack);
    assert_eq!(surface.pixel(0, 0), Some(RED));
    assert_eq!(surface.pixel(10, 10), Some(BLUE));
    assert_eq!(surface.pixel(20, 20), Some(GREEN));

    // Raw delta (6, 12): position 2 moves (3, 6), position 3 moves (4, 8).
    assert!(stack.on_touch_event(TouchEvent::down(100.0, 100.0)));
    assert!(stack.on_touch_event(TouchEvent::moved(94.0, 88.0)));
    let surface = render(&stack);
    assert_eq!(surface.pixel(10, 10), Some(RED));
    assert_eq!(surface.pixel(13, 16), Some(BLUE));
    assert_eq!(surface.pixel(24, 28), Some(GREEN));
    surface.save_png(dir.path().join("dragged.png")).unwrap();

    assert!(stack.on_touch_event(TouchEvent::up(94.0, 88.0)));
    let surface = render(&stack);
    assert_eq!(surface.pixel(10, 10), Some(BLUE));
    assert_eq!(surface.pixel(20, 20), Some(GREEN));
}

#[test]
fn unreadable_layer_does_not_block_loading() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_png(dir.path(), "good.png", RED, None);
    let bad = dir.path().join("bad.png");
    std::fs::write(&bad, b"not a png").unwrap();

    let stack = load(vec![good, bad]);
    assert_eq!(stack.failed_count(), 1);
    assert!(stack.layers()[1].pixels().is_none());
    assert!(stack.layers()[1].decode_error().is_some());

    let surface = render(&stack);
    assert_eq!(surface.pixel(39, 39), Some(RED));
}

#[test]
fn large_image_is_decoded_downsampled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.png");
    RgbaImage::from_pixel(400, 400, Rgba(GREEN))
        .save(&path)
        .unwrap();

    let (source, ids) = FileImageSource::from_paths([path]);
    let mut stack = LayerStack::new(Arc::new(source), TestHost::default());
    stack.set_drawables(&ids).unwrap();
    stack.measure(MeasureSpec::exact(50), MeasureSpec::exact(50));

    let deadline = Instant::now() + Duration::from_secs(10);
    while !stack.is_interactive() && Instant::now() < deadline {
        stack.pump_timeout(Duration::from_millis(20));
    }

    // Required 60x60: (400/2)/4 = 50 would undershoot, so the factor stops at 4.
    let layer = &stack.layers()[0];
    assert_eq!(layer.downsample(), 4);
    assert_eq!(
        layer.pixels().map(|p| p.size()),
        Some(PixelSize::new(100, 100))
    );

    let surface = render(&stack);
    assert_eq!(surface.pixel(49, 49), Some(GREEN));
}
