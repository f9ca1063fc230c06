use serde::{Deserialize, Serialize};

/// A single LED value as it travels on the wire: one byte per channel.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Produces a color with given RGB values. The values range from 0 to 255.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Produces a gray of the given brightness, where 0 is black and 255 is white.
    pub fn gray(brightness: u8) -> Self {
        Self::rgb(brightness, brightness, brightness)
    }

    pub fn black() -> Self {
        Self::gray(0)
    }

    pub fn white() -> Self {
        Self::gray(255)
    }

    /// Produces a color for a given hue, saturation and value.
    ///
    /// Full hue circle extends from 0.0 to 1.0; hues outside this range wrap
    /// around, so 0.1, 2.1 and -0.9 are the same hue. Saturation and value
    /// are clamped to the 0.0 to 1.0 range.
    pub fn hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let h = hue.rem_euclid(1.0);
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);

        let chroma = v * s;
        let sector = h * 6.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let m = v - chroma;
        let (r, g, b) = match sector.trunc() as i32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };

        let to_byte = |c: f64| ((c + m) * 255.0) as u8;
        Self::rgb(to_byte(r), to_byte(g), to_byte(b))
    }

    /// Parses a `#rrggbb` or `#rgb` code; the hash is optional.
    pub fn from_hex_str(code: &str) -> Option<Self> {
        let code = code.trim_start_matches('#');
        let value = u32::from_str_radix(code, 16).ok()?;
        match code.len() {
            6 => Some(Self::rgb(
                (value >> 16) as u8,
                (value >> 8) as u8,
                value as u8,
            )),
            3 => Some(Self::rgb(
                ((value >> 8) & 0xF) as u8 * 0x11,
                ((value >> 4) & 0xF) as u8 * 0x11,
                (value & 0xF) as u8 * 0x11,
            )),
            _ => None,
        }
    }

    pub fn to_hex_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Channel bytes in the order the bridge firmware expects them.
    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}
