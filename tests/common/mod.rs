//! Instrumented rendering backend used by the HTTP tests

#![allow(dead_code)]

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbImage};
use pageshot::{Backend, Engine, EngineConfig, Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the fake page behaves for a given URL
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Loads and renders a PNG of the configured viewport
    Render,
    /// Navigation fails immediately (unreachable host)
    Unreachable,
    /// Navigation blocks for the given time
    Hang(Duration),
    /// Rendering returns bytes that are not a PNG
    Garbage,
    /// Rendering returns a PNG of the wrong size
    WrongSize,
    /// Rendering returns a PNG cut off inside its pixel data
    Truncated,
    /// Rendering returns a PNG whose IDAT chunk holds garbage
    CorruptPixels,
    /// Rendering returns a PNG whose IDAT declares more bytes than it holds
    ShortIdat,
    /// The browser cannot be launched at all
    LaunchFails,
    /// Launching the browser takes the given time
    SlowLaunch(Duration),
}

#[derive(Default)]
pub struct Events {
    pub launched: AtomicUsize,
    pub released: AtomicUsize,
    pub visited: Mutex<Vec<String>>,
}

impl Events {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    /// Wait for detached sessions to finish releasing
    pub async fn wait_released(&self, n: usize) {
        for _ in 0..200 {
            if self.released() == n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} released sessions, saw {}", n, self.released());
    }
}

pub struct FakeBackend {
    pub behavior: Behavior,
    pub events: Arc<Events>,
}

impl FakeBackend {
    pub fn new(behavior: Behavior) -> (Self, Arc<Events>) {
        let events = Arc::new(Events::default());
        (
            Self {
                behavior,
                events: events.clone(),
            },
            events,
        )
    }
}

pub struct FakeEngine {
    behavior: Behavior,
    size: (u32, u32),
    events: Arc<Events>,
}

impl Backend for FakeBackend {
    type Engine = FakeEngine;

    fn launch(&self, config: &EngineConfig) -> Result<FakeEngine> {
        if self.behavior == Behavior::LaunchFails {
            return Err(Error::InitializationError("Failed to launch browser: no chrome".into()));
        }
        if let Behavior::SlowLaunch(d) = self.behavior {
            std::thread::sleep(d);
        }
        self.events.launched.fetch_add(1, Ordering::SeqCst);
        Ok(FakeEngine {
            behavior: self.behavior,
            size: config.viewport.pixel_size(),
            events: self.events.clone(),
        })
    }
}

impl Engine for FakeEngine {
    fn load_url(&mut self, url: &str) -> Result<()> {
        self.events.visited.lock().unwrap().push(url.to_string());
        match self.behavior {
            Behavior::Unreachable => Err(Error::LoadError(format!(
                "Navigation failed: net::ERR_NAME_NOT_RESOLVED {}",
                url
            ))),
            Behavior::Hang(d) => {
                std::thread::sleep(d);
                Err(Error::Timeout(d.as_millis() as u64))
            }
            _ => Ok(()),
        }
    }

    fn render_png(&self) -> Result<Vec<u8>> {
        match self.behavior {
            Behavior::Garbage => Ok(b"<html>not an image</html>".to_vec()),
            Behavior::WrongSize => Ok(png_bytes(self.size.0 * 2, self.size.1)),
            Behavior::Truncated => {
                let png = png_bytes(self.size.0, self.size.1);
                let idat = idat_offset(&png);
                Ok(png[..idat + 16].to_vec())
            }
            Behavior::CorruptPixels => Ok(corrupt_idat(png_bytes(self.size.0, self.size.1))),
            Behavior::ShortIdat => Ok(short_idat(png_bytes(self.size.0, self.size.1))),
            _ => Ok(png_bytes(self.size.0, self.size.1)),
        }
    }

    fn close(self) -> Result<()> {
        self.events.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// An encoded PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(img.as_raw(), width, height, ColorType::Rgb8)
        .unwrap();
    out
}

/// Byte offset of the first IDAT chunk's type field
pub fn idat_offset(png: &[u8]) -> usize {
    png.windows(4).position(|w| w == b"IDAT").expect("encoded PNG has an IDAT chunk")
}

/// Replace the start of the first IDAT payload with bytes that are not zlib data
pub fn corrupt_idat(mut png: Vec<u8>) -> Vec<u8> {
    let data = idat_offset(&png) + 4;
    png[data..data + 7].copy_from_slice(b"garbage");
    png
}

/// Keep the header chunks, then an IDAT claiming 1000 bytes that holds only
/// `garbage`, then a well-formed IEND
pub fn short_idat(png: Vec<u8>) -> Vec<u8> {
    let length_field = idat_offset(&png) - 4;
    let mut out = png[..length_field].to_vec();
    out.extend_from_slice(&1000u32.to_be_bytes());
    out.extend_from_slice(b"IDAT");
    out.extend_from_slice(b"garbage");
    out.extend_from_slice(&[0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]);
    out
}
