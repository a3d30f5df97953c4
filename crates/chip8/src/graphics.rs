pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
pub const PIXEL_COUNT: usize = WIDTH * HEIGHT;

/// Handles the graphics state of the `Chip8`.
///
/// Every pixel is stored as one byte that is either `0` (off) or `1` (on),
/// row-major, so the pixel at `(x, y)` lives at `x + WIDTH * y`.
#[derive(Clone, Copy)]
pub struct FrameBuffer {
    vram: [u8; PIXEL_COUNT],
    needs_redraw: bool,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self {
            vram: [0; PIXEL_COUNT],
            needs_redraw: true,
        }
    }
}

impl FrameBuffer {
    /// Create a new empty `FrameBuffer`.
    pub fn new() -> Self {
        Self::default()
    }

    /// XOR a single sprite row onto the buffer at the given coordinates.
    /// Pixels that run past the right edge wrap around to column `0`.
    ///
    /// Returns whether or not there was a collision
    fn draw_byte(&mut self, x: usize, y: usize, data: u8) -> bool {
        let mut collision = false;
        // iterate bits, msb is the leftmost pixel
        for b in 0..8 {
            if data & (0x80 >> b) == 0 {
                continue;
            }
            let pos = (x + b) % WIDTH + WIDTH * y;
            if self.vram[pos] == 1 {
                collision = true;
            }
            self.vram[pos] ^= 1;
        }
        collision
    }

    /// Draws `rows` as a sprite with its top left corner at `(x, y)`.
    /// Rows and columns that fall off the buffer wrap around to the opposite edge.
    ///
    /// Returns whether any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: u8, y: u8, rows: &[u8]) -> bool {
        let x = usize::from(x) % WIDTH;
        let y = usize::from(y);

        let mut collision = false;
        for (i, &row) in rows.iter().enumerate() {
            collision |= self.draw_byte(x, (y + i) % HEIGHT, row);
        }
        self.needs_redraw = true;
        collision
    }

    /// Whether the pixel at `(x, y)` is lit.
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.vram[(x % WIDTH) + WIDTH * (y % HEIGHT)] == 1
    }

    /// All pixels, row-major, each `0` or `1`.
    pub fn pixels(&self) -> &[u8; PIXEL_COUNT] {
        &self.vram
    }

    /// Whether the buffer changed since the last [`FrameBuffer::clear_redraw`].
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Acknowledge that the current contents have been presented.
    pub fn clear_redraw(&mut self) {
        self.needs_redraw = false;
    }

    /// Turn every pixel off.
    #[inline]
    pub fn clear(&mut self) {
        self.vram = [0; PIXEL_COUNT];
        self.needs_redraw = true;
    }

    /// Restore the power-on state.
    pub fn reset(&mut self) {
        self.clear();
    }
}
