//! Window layout and the coloured geometry of the board and side panel.

use crate::renderer::Vertex;
use chess_core::{Board, File, Rank, Square};

const LIGHT: [f32; 4] = [0.93, 0.93, 0.82, 1.0];
const DARK: [f32; 4] = [0.54, 0.27, 0.07, 1.0];
const LAST_MOVE: [f32; 4] = [0.80, 0.82, 0.25, 0.55];
const CHECK: [f32; 4] = [0.90, 0.15, 0.15, 0.60];
const PANEL: [f32; 4] = [0.12, 0.12, 0.14, 1.0];

/// Share of the window width reserved for the board.
const BOARD_SHARE: f32 = 0.62;

/// Pixel geometry of one frame: the board on the left, the panel on the right.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub board_px: f32,
}

impl Layout {
    pub fn new(width: f32, height: f32) -> Self {
        let margin = 16.0;
        let board_px = ((width * BOARD_SHARE).min(height) - 2.0 * margin).max(8.0);
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            margin,
            board_px,
        }
    }

    pub fn square_px(&self) -> f32 {
        self.board_px / 8.0
    }

    /// Top-left pixel of a square, White at the bottom.
    pub fn square_origin(&self, square: Square) -> (f32, f32) {
        let size = self.square_px();
        let col = square.file().index() as f32;
        let row = 7.0 - square.rank().index() as f32;
        (self.margin + col * size, self.margin + row * size)
    }

    pub fn panel_left(&self) -> f32 {
        self.board_px + 2.0 * self.margin
    }

    pub fn panel_width(&self) -> f32 {
        (self.width - self.panel_left() - self.margin).max(0.0)
    }

    pub fn to_ndc(&self, x: f32, y: f32) -> [f32; 2] {
        [x / self.width * 2.0 - 1.0, 1.0 - y / self.height * 2.0]
    }
}

/// What to tint on top of the plain squares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Highlights {
    pub last_move: Option<(Square, Square)>,
    pub check: Option<Square>,
}

impl Highlights {
    /// Derives the tints from a UCI move string and the board it produced.
    pub fn new(last_move: Option<&str>, board: &Board, checked: Option<chess_core::Color>) -> Self {
        let last_move = last_move.and_then(|uci| {
            let from = uci.get(0..2)?.parse().ok()?;
            let to = uci.get(2..4)?.parse().ok()?;
            Some((from, to))
        });
        Self {
            last_move,
            check: checked.and_then(|color| board.king_square(color)),
        }
    }
}

#[derive(Default)]
pub struct BoardRenderer {
    vertices: Vec<Vertex>,
}

impl BoardRenderer {
    pub fn new() -> Self {
        Self {
            vertices: Vec::with_capacity(8 * 8 * 6 + 4 * 6),
        }
    }

    pub fn generate_vertices(&mut self, layout: &Layout, highlights: Highlights) -> &[Vertex] {
        self.vertices.clear();

        for rank in (0..8).filter_map(Rank::new) {
            for file in (0..8).filter_map(File::new) {
                let square = Square::new(file, rank);
                let color = if square.is_light() { LIGHT } else { DARK };
                self.push_square(layout, square, color);
            }
        }

        if let Some((from, to)) = highlights.last_move {
            self.push_square(layout, from, LAST_MOVE);
            self.push_square(layout, to, LAST_MOVE);
        }
        if let Some(king) = highlights.check {
            self.push_square(layout, king, CHECK);
        }

        let left = layout.panel_left();
        self.push_rect(layout, left, 0.0, layout.width - left, layout.height, PANEL);

        &self.vertices
    }

    fn push_square(&mut self, layout: &Layout, square: Square, color: [f32; 4]) {
        let (x, y) = layout.square_origin(square);
        let size = layout.square_px();
        self.push_rect(layout, x, y, size, size, color);
    }

    /// Two triangles covering a pixel rectangle.
    fn push_rect(&mut self, layout: &Layout, x: f32, y: f32, w: f32, h: f32, color: [f32; 4]) {
        let [x1, y1] = layout.to_ndc(x, y);
        let [x2, y2] = layout.to_ndc(x + w, y + h);
        for position in [[x1, y1], [x2, y1], [x1, y2], [x2, y1], [x2, y2], [x1, y2]] {
            self.vertices.push(Vertex { position, color });
        }
    }
}
