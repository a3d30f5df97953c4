use std::io::{self, Write};

use chip8::graphics::{PIXEL_COUNT, WIDTH};

/// Moves the cursor to the top left corner of the terminal.
const CURSOR_HOME: &str = "\x1b[H";
/// Clears the whole terminal.
const CLEAR_SCREEN: &str = "\x1b[2J";

/// A renderer for displaying the graphics
/// buffer of the `Chip8` as rows of text.
pub struct Renderer {
    on: char,
    off: char,
    ansi: bool,
    first_frame: bool,
}

impl Renderer {
    /// Create a new renderer. With `ansi` set, every frame is painted over
    /// the previous one instead of being appended below it.
    pub fn new(ansi: bool) -> Self {
        Self {
            on: '#',
            off: ' ',
            ansi,
            first_frame: true,
        }
    }

    /// Write one frame to `out`, one line per pixel row.
    pub fn draw(&mut self, pixels: &[u8; PIXEL_COUNT], out: &mut impl Write) -> io::Result<()> {
        if self.ansi {
            if self.first_frame {
                out.write_all(CLEAR_SCREEN.as_bytes())?;
            }
            out.write_all(CURSOR_HOME.as_bytes())?;
        }
        self.first_frame = false;

        let mut line = String::with_capacity(WIDTH + 1);
        for row in pixels.chunks(WIDTH) {
            line.clear();
            line.extend(row.iter().map(|&p| if p == 1 { self.on } else { self.off }));
            line.push('\n');
            out.write_all(line.as_bytes())?;
        }
        out.flush()
    }
}
