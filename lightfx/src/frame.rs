use serde::{Deserialize, Serialize};

use crate::Color;

/// Host-side copy of an LED strip, indexed by physical position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pixels: Vec<Color>,
}

impl Frame {
    pub fn new(number_of_lights: usize, color: Color) -> Self {
        Self {
            pixels: vec![color; number_of_lights],
        }
    }

    pub fn new_black(number_of_lights: usize) -> Self {
        Self::new(number_of_lights, Color::black())
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Moves every pixel `shift` positions towards index 0, wrapping the
    /// head of the strip around to its tail.
    pub fn rotate(&mut self, shift: usize) {
        if !self.pixels.is_empty() {
            let shift = shift % self.pixels.len();
            self.pixels.rotate_left(shift);
        }
    }
}

impl From<Vec<Color>> for Frame {
    fn from(pixels: Vec<Color>) -> Self {
        Self { pixels }
    }
}

impl FromIterator<Color> for Frame {
    fn from_iter<T: IntoIterator<Item = Color>>(iter: T) -> Self {
        Self {
            pixels: iter.into_iter().collect(),
        }
    }
}
