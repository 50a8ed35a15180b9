use serde::{Deserialize, Serialize};

/// Named colors understood by the surface's stock palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    #[default]
    Black,
    Orange,
    Yellow,
    Turquoise,
    Purple,
    Pink,
    White,
    LightGray,
    DarkGray,
    Blue,
    Green,
    Red,
}

impl Color {
    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::Orange => "orange",
            Color::Yellow => "yellow",
            Color::Turquoise => "turquoise",
            Color::Purple => "purple",
            Color::Pink => "pink",
            Color::White => "white",
            Color::LightGray => "light_gray",
            Color::DarkGray => "dark_gray",
            Color::Blue => "blue",
            Color::Green => "green",
            Color::Red => "red",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Track color as reported by the DAW.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Decode a packed `0xRRGGBB` integer.
    pub fn from_packed(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_color_splits_into_channels() {
        assert_eq!(Rgb::from_packed(0x12AB7F), Rgb::new(0x12, 0xAB, 0x7F));
        assert_eq!(Rgb::from_packed(0x01FF0000), Rgb::new(0xFF, 0, 0));
    }
}
