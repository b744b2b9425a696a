//! Canvas geometry and color model
//!
//! The canvas is a fixed raster, stored sparsely: only painted cells exist.
//! A coordinate is a value type in here; the `"row,col"` string form exists
//! only at the wire/store boundary.

use serde_json::Value;

use crate::types::{GraffitiError, Result};

/// Canvas width in columns
pub const CANVAS_WIDTH: u32 = 900;

/// Canvas height in rows
pub const CANVAS_HEIGHT: u32 = 1600;

/// Hard cap on coordinate pairs per paint request
pub const MAX_PIXELS_PER_PAINT: usize = 20;

/// One cell of the raster
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Coord {
    pub row: u32,
    pub col: u32,
}

impl Coord {
    /// The store/wire key for this cell.
    pub fn wire_key(&self) -> String {
        format!("{},{}", self.row, self.col)
    }

    /// The `[row, col]` pair form used in log entries and responses.
    pub fn pair(&self) -> [u32; 2] {
        [self.row, self.col]
    }
}

/// A 24-bit color
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Lower-case 6-hex-digit wire form, no leading marker.
    pub fn to_hex(self) -> String {
        hex::encode([self.r, self.g, self.b])
    }

    pub fn components(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Validate a request color: exactly three integers in [0, 255].
pub fn parse_color(value: &Value) -> Result<Color> {
    let items = value
        .as_array()
        .filter(|a| a.len() == 3)
        .ok_or_else(|| GraffitiError::InvalidInput("color must be [r, g, b] array".to_string()))?;

    let mut channels = [0u8; 3];
    for (i, item) in items.iter().enumerate() {
        let n = item
            .as_i64()
            .filter(|n| (0..=255).contains(n))
            .ok_or_else(|| {
                GraffitiError::InvalidInput("color values must be integers 0-255".to_string())
            })?;
        channels[i] = n as u8;
    }

    Ok(Color {
        r: channels[0],
        g: channels[1],
        b: channels[2],
    })
}

/// Validate a request batch: non-empty, bounded, every pair two in-bounds
/// integers. All-or-nothing; the first bad pair fails the whole batch.
pub fn parse_batch(value: &Value) -> Result<Vec<Coord>> {
    let items = value.as_array().filter(|a| !a.is_empty()).ok_or_else(|| {
        GraffitiError::InvalidInput(
            "pixels must be a non-empty array of [row, col] pairs".to_string(),
        )
    })?;

    if items.len() > MAX_PIXELS_PER_PAINT {
        return Err(GraffitiError::InvalidInput(format!(
            "max {} pixels per request",
            MAX_PIXELS_PER_PAINT
        )));
    }

    let mut coords = Vec::with_capacity(items.len());
    for item in items {
        let pair = item.as_array().filter(|p| p.len() == 2).ok_or_else(|| {
            GraffitiError::InvalidInput("each pixel must be [row, col]".to_string())
        })?;

        let row = pair[0].as_i64();
        let col = pair[1].as_i64();
        let coord = match (row, col) {
            (Some(r), Some(c))
                if (0..CANVAS_HEIGHT as i64).contains(&r)
                    && (0..CANVAS_WIDTH as i64).contains(&c) =>
            {
                Coord {
                    row: r as u32,
                    col: c as u32,
                }
            }
            _ => {
                return Err(GraffitiError::InvalidInput(format!(
                    "pixel [{}, {}] out of bounds. Canvas is {} rows x {} cols",
                    pair[0], pair[1], CANVAS_HEIGHT, CANVAS_WIDTH
                )))
            }
        };
        coords.push(coord);
    }

    Ok(coords)
}
