//! Test Utilities Module
//!
//! Fixture images and orchestrator helpers shared by unit tests.
//! This module is only compiled when running tests.

#![cfg(test)]

use std::path::Path;

use image::{ImageFormat, RgbImage};
use tokio::sync::mpsc;

use crate::pipeline::UiEvent;

/// Smooth RGB gradient so JPEG fixtures compress predictably
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            96,
        ])
    })
}

/// Write a gradient JPEG of the given size
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    gradient_rgb(width, height)
        .save_with_format(path, ImageFormat::Jpeg)
        .expect("Failed to write JPEG fixture");
}

/// Write an RGB image as PNG regardless of the path's extension
pub fn write_png(path: &Path, image: &RgbImage) {
    image
        .save_with_format(path, ImageFormat::Png)
        .expect("Failed to write PNG fixture");
}

/// Drain every UI event currently queued, as short tags
pub fn drain_ui(receiver: &mut mpsc::UnboundedReceiver<UiEvent>) -> Vec<String> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(match event {
            UiEvent::Busy(busy) => format!("busy:{busy}"),
            UiEvent::ControlsEnabled(enabled) => format!("controls:{enabled}"),
            UiEvent::DisplayImage(_) => "image".to_string(),
            UiEvent::DisplayError(_) => "error".to_string(),
        });
    }
    events
}
