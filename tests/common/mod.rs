// SPDX-License-Identifier: MPL-2.0

//! Shared QR fixtures for integration tests

#![allow(dead_code)]

use image::imageops;
use image::{GrayImage, ImageFormat, Luma, RgbaImage};
use std::io::Cursor;

/// Text encoded by [`MODULES`]
pub const TEXT: &str = "4376471154038";

/// Version 1-M symbol, `#` is a dark module
const MODULES: [&str; 21] = [
    "#######.....#.#######",
    "#.....#..#....#.....#",
    "#.###.#...##..#.###.#",
    "#.###.#...#...#.###.#",
    "#.###.#..####.#.###.#",
    "#.....#.#.#...#.....#",
    "#######.#.#.#.#######",
    ".........#...........",
    "#..#.##.######.#.....",
    "###.#..##..#.#.#.##..",
    "#..#.####.##..###...#",
    "..#.#..#....#####....",
    "..#...##.#.#.###.##..",
    "........#.#..####.##.",
    "#######...###.#.####.",
    "#.....#.#.....##....#",
    "#.###.#..##.###..#.##",
    "#.###.#.#.#..####..##",
    "#.###.#..###.###.#..#",
    "#.....#..####..##..#.",
    "#######.###..#.###...",
];

/// Width of the light border around the symbol, in modules
const QUIET_ZONE: u32 = 4;

/// Render the fixture symbol with its quiet zone
pub fn qr_image(module_px: u32) -> GrayImage {
    let side = (MODULES.len() as u32 + 2 * QUIET_ZONE) * module_px;
    GrayImage::from_fn(side, side, |x, y| {
        let col = (x / module_px).checked_sub(QUIET_ZONE);
        let row = (y / module_px).checked_sub(QUIET_ZONE);
        let dark = match (row, col) {
            (Some(row), Some(col)) => MODULES
                .get(row as usize)
                .and_then(|line| line.as_bytes().get(col as usize))
                .is_some_and(|&module| module == b'#'),
            _ => false,
        };
        Luma([if dark { 0 } else { 255 }])
    })
}

/// Paste a symbol onto a white canvas at `(x, y)`
pub fn on_canvas(code: &GrayImage, width: u32, height: u32, x: u32, y: u32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
    imageops::replace(&mut canvas, code, i64::from(x), i64::from(y));
    canvas
}

pub fn to_rgba(image: &GrayImage) -> RgbaImage {
    image::DynamicImage::ImageLuma8(image.clone()).to_rgba8()
}

pub fn png_bytes(image: &GrayImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
