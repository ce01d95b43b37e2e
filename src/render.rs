use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{ImageResult, Rgb, RgbImage};
use std::path::Path;

use crate::assignment::Assignment;
use crate::grid_config::GridConfig;

/// Character shown for blocked cells.
pub const BLOCK: char = '█';

/// Side of one grid cell in an exported image, in pixels.
pub const CELL_SIZE: u32 = 100;

/// Dark margin left around each open cell.
pub const CELL_BORDER: u32 = 2;

/// Each 8x8 font bitmap pixel becomes a square this wide.
const GLYPH_SCALE: u32 = 8;

const DARK: Rgb<u8> = Rgb([0, 0, 0]);
const LIGHT: Rgb<u8> = Rgb([255, 255, 255]);

/// Lay the assigned words out on the grid. Unassigned and blocked cells are `None`.
pub fn letter_grid(config: &GridConfig, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
    let mut letters: Vec<Vec<Option<char>>> = vec![vec![None; config.width]; config.height];

    for (variable, word) in assignment.entries(config) {
        for ((row, col), glyph) in variable.cells().zip(word.chars()) {
            letters[row][col] = Some(glyph);
        }
    }

    letters
}

/// Turn the given grid config and assignment into a rendered string, one line per row.
pub fn render_grid(config: &GridConfig, assignment: &Assignment) -> String {
    let letters = letter_grid(config, assignment);

    letters
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(|(col, letter)| {
                    if config.is_open(row, col) {
                        letter.unwrap_or(' ')
                    } else {
                        BLOCK
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Draw the grid as an image: a dark canvas with a light bordered square for every open cell and
/// its letter, if any, drawn on top. Blocked cells stay dark. The format follows the extension of
/// `path`.
pub fn save_image(config: &GridConfig, assignment: &Assignment, path: &Path) -> ImageResult<()> {
    let letters = letter_grid(config, assignment);
    let mut image = RgbImage::from_pixel(config.width as u32 * CELL_SIZE, config.height as u32 * CELL_SIZE, DARK);

    for (row, cells) in letters.iter().enumerate() {
        for (col, letter) in cells.iter().enumerate() {
            if !config.is_open(row, col) {
                continue;
            }

            let left = col as u32 * CELL_SIZE;
            let top = row as u32 * CELL_SIZE;

            for y in top + CELL_BORDER..top + CELL_SIZE - CELL_BORDER {
                for x in left + CELL_BORDER..left + CELL_SIZE - CELL_BORDER {
                    image.put_pixel(x, y, LIGHT);
                }
            }

            if let Some(glyph) = letter {
                draw_glyph(&mut image, *glyph, left, top);
            }
        }
    }

    image.save(path)
}

/// Stamp a scaled-up bitmap of `glyph` centered in the cell whose top-left corner is given.
/// Glyphs missing from the font are skipped.
fn draw_glyph(image: &mut RgbImage, glyph: char, left: u32, top: u32) {
    let Some(bitmap) = BASIC_FONTS.get(glyph) else {
        return;
    };

    let margin = (CELL_SIZE - 8 * GLYPH_SCALE) / 2;

    for (bitmap_y, &bits) in bitmap.iter().enumerate() {
        for bitmap_x in 0..8 {
            // The lowest bit is the leftmost pixel.
            if bits & (1u8 << bitmap_x) == 0 {
                continue;
            }

            let x0 = left + margin + bitmap_x * GLYPH_SCALE;
            let y0 = top + margin + bitmap_y as u32 * GLYPH_SCALE;
            for y in y0..y0 + GLYPH_SCALE {
                for x in x0..x0 + GLYPH_SCALE {
                    image.put_pixel(x, y, DARK);
                }
            }
        }
    }
}
