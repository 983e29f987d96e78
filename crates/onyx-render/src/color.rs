/// An RGBA color with `f32` components in the `0.0..=1.0` range.
///
/// ```
/// use onyx_render::Color;
///
/// let red = Color::rgb(1.0, 0.0, 0.0);
/// let from_hex = Color::from_hex(0xFF8800);
/// let from_bytes = Color::from_rgba_u8(128, 64, 32, 255);
///
/// assert_eq!(Color::unpack(red.pack()), red);
/// ```
///
/// Instance records carry colors packed into a single `u32` (see [`Color::pack`]).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);
    pub const ORANGE: Color = Color::rgb(1.0, 165.0 / 255.0, 0.0);
    pub const PINK: Color = Color::rgb(1.0, 192.0 / 255.0, 203.0 / 255.0);
    pub const PURPLE: Color = Color::rgb(191.0 / 255.0, 64.0 / 255.0, 191.0 / 255.0);
    pub const TRANSPARENT: Color = Color::rgba(1.0, 1.0, 1.0, 0.0);

    /// Create a color from RGB components with full opacity (alpha = 1.0).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from 8-bit RGBA values (0–255 mapped to 0.0–1.0).
    pub fn from_rgba_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    pub fn from_rgb_u8(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgba_u8(r, g, b, 255)
    }

    /// Create a color from a 24-bit RGB hex value (e.g. `0xFF8800`).
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as u8;
        let g = ((hex >> 8) & 0xFF) as u8;
        let b = (hex & 0xFF) as u8;
        Self::from_rgb_u8(r, g, b)
    }

    /// Create a color from a 32-bit RGBA hex value (e.g. `0xFF880080`).
    pub fn from_hex_alpha(hex: u32) -> Self {
        let r = ((hex >> 24) & 0xFF) as u8;
        let g = ((hex >> 16) & 0xFF) as u8;
        let b = ((hex >> 8) & 0xFF) as u8;
        let a = (hex & 0xFF) as u8;
        Self::from_rgba_u8(r, g, b, a)
    }

    /// Pack into `R | G << 8 | B << 16 | A << 24`, truncating each channel to 8 bits.
    pub fn pack(self) -> u32 {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8 as u32;
        channel(self.r) | channel(self.g) << 8 | channel(self.b) << 16 | channel(self.a) << 24
    }

    /// Inverse of [`Color::pack`].
    pub fn unpack(packed: u32) -> Self {
        Self::from_rgba_u8(
            (packed & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 24) & 0xFF) as u8,
        )
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Convert to the equivalent `wgpu::Color` (f64 components).
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Color {
    fn from(arr: [f32; 4]) -> Self {
        Self::rgba(arr[0], arr[1], arr[2], arr[3])
    }
}

impl From<[f32; 3]> for Color {
    fn from(arr: [f32; 3]) -> Self {
        Self::rgb(arr[0], arr[1], arr[2])
    }
}

impl From<Color> for [f32; 4] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        assert_eq!(Color::WHITE.pack(), 0xFFFF_FFFF);
        assert_eq!(Color::RED.pack(), 0xFF00_00FF);
        assert_eq!(Color::rgba(0.0, 0.0, 1.0, 0.0).pack(), 0x00FF_0000);
    }

    #[test]
    fn test_unpack_within_channel_precision() {
        let color = Color::rgba(0.2, 0.4, 0.6, 0.8);
        let unpacked = Color::unpack(color.pack());
        for (a, b) in color.to_array().iter().zip(unpacked.to_array()) {
            assert!((a - b).abs() < 1.5 / 255.0, "{a} vs {b}");
        }
    }

    #[test]
    fn test_orange_from_bytes() {
        assert_eq!(Color::ORANGE.pack(), Color::from_rgb_u8(255, 165, 0).pack());
    }

    #[test]
    fn test_from_hex() {
        let color = Color::from_hex(0xFF8800);
        assert_eq!(color.r, 1.0);
        assert_eq!(color.b, 0.0);
        assert!((color.g - 136.0 / 255.0).abs() < 1e-6);
        assert_eq!(Color::from_hex_alpha(0x000000FF), Color::BLACK);
    }
}
