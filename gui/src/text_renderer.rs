use crate::board::Layout;
use crate::panel::PanelState;
use chess_core::{Color, PieceType, Square};
use glyphon::{
    Attrs, Buffer, Family, FontSystem, Metrics, Resolution, Shaping, SwashCache, TextArea,
    TextAtlas, TextBounds, TextRenderer as GlyphonRenderer,
};
use tracing::warn;
use wgpu::{Device, MultisampleState, Queue, TextureFormat};

const PANEL_FONT: f32 = 16.0;
const PANEL_LINE: f32 = 22.0;
const PANEL_COLOR: glyphon::Color = glyphon::Color::rgb(230, 230, 230);

/// Draws piece glyphs on the board and the side panel text, using system fonts.
pub struct TextRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    atlas: TextAtlas,
    renderer: GlyphonRenderer,
    pieces: Vec<(Buffer, Square, Color)>,
    panel: Buffer,
}

impl TextRenderer {
    pub fn new(device: &Device, queue: &Queue, format: TextureFormat) -> Self {
        let mut font_system = FontSystem::new();
        let swash_cache = SwashCache::new();
        let mut atlas = TextAtlas::new(device, queue, format);
        let renderer = GlyphonRenderer::new(&mut atlas, device, MultisampleState::default(), None);
        let panel = Buffer::new(&mut font_system, Metrics::new(PANEL_FONT, PANEL_LINE));

        Self {
            font_system,
            swash_cache,
            atlas,
            renderer,
            pieces: Vec::with_capacity(32),
            panel,
        }
    }

    pub fn piece_symbol(piece_type: PieceType, color: Color) -> &'static str {
        match (piece_type, color) {
            (PieceType::King, Color::White) => "♔",
            (PieceType::Queen, Color::White) => "♕",
            (PieceType::Rook, Color::White) => "♖",
            (PieceType::Bishop, Color::White) => "♗",
            (PieceType::Knight, Color::White) => "♘",
            (PieceType::Pawn, Color::White) => "♙",
            (PieceType::King, Color::Black) => "♚",
            (PieceType::Queen, Color::Black) => "♛",
            (PieceType::Rook, Color::Black) => "♜",
            (PieceType::Bishop, Color::Black) => "♝",
            (PieceType::Knight, Color::Black) => "♞",
            (PieceType::Pawn, Color::Black) => "♟",
        }
    }

    /// Shapes the pieces of the panel's position and the panel text.
    pub fn prepare(&mut self, device: &Device, queue: &Queue, layout: &Layout, panel: &PanelState) {
        let square = layout.square_px();
        let attrs = Attrs::new().family(Family::SansSerif);

        self.pieces.clear();
        if let Some(position) = panel.position() {
            for square_id in Square::all() {
                let Some(piece) = position.board.piece_at(square_id) else {
                    continue;
                };
                let mut buffer =
                    Buffer::new(&mut self.font_system, Metrics::new(square * 0.8, square));
                buffer.set_size(&mut self.font_system, square, square);
                buffer.set_text(
                    &mut self.font_system,
                    Self::piece_symbol(piece.piece_type, piece.color),
                    attrs,
                    Shaping::Advanced,
                );
                buffer.shape_until_scroll(&mut self.font_system);
                self.pieces.push((buffer, square_id, piece.color));
            }
        }

        let panel_width = layout.panel_width() - 2.0 * layout.margin;
        self.panel.set_size(
            &mut self.font_system,
            panel_width.max(1.0),
            layout.height - 2.0 * layout.margin,
        );
        self.panel
            .set_text(&mut self.font_system, &panel.text(), attrs, Shaping::Advanced);
        self.panel.shape_until_scroll(&mut self.font_system);

        let mut text_areas = Vec::with_capacity(self.pieces.len() * 2 + 1);
        for (buffer, square_id, color) in &self.pieces {
            let (x, y) = layout.square_origin(*square_id);
            let left = x + square * 0.12;
            let top = y;
            let bounds = TextBounds {
                left: x as i32 - 2,
                top: y as i32 - 2,
                right: (x + square) as i32 + 2,
                bottom: (y + square) as i32 + 2,
            };

            // Dark outline under the fill so white pieces read on light squares.
            text_areas.push(TextArea {
                buffer,
                left: left - 1.5,
                top: top - 1.5,
                scale: 1.02,
                bounds,
                default_color: glyphon::Color::rgb(0, 0, 0),
            });
            text_areas.push(TextArea {
                buffer,
                left,
                top,
                scale: 1.0,
                bounds,
                default_color: match color {
                    Color::White => glyphon::Color::rgb(255, 255, 255),
                    Color::Black => glyphon::Color::rgb(0, 0, 0),
                },
            });
        }

        let panel_left = layout.panel_left() + layout.margin;
        text_areas.push(TextArea {
            buffer: &self.panel,
            left: panel_left,
            top: layout.margin,
            scale: 1.0,
            bounds: TextBounds {
                left: panel_left as i32,
                top: 0,
                right: layout.width as i32,
                bottom: layout.height as i32,
            },
            default_color: PANEL_COLOR,
        });

        if let Err(err) = self.renderer.prepare(
            device,
            queue,
            &mut self.font_system,
            &mut self.atlas,
            Resolution {
                width: layout.width as u32,
                height: layout.height as u32,
            },
            text_areas,
            &mut self.swash_cache,
        ) {
            warn!("failed to prepare text: {err:?}");
        }
    }

    pub fn render<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        if let Err(err) = self.renderer.render(&self.atlas, render_pass) {
            warn!("failed to render text: {err:?}");
        }
    }

    /// Drops glyphs that were not used in the last frame.
    pub fn trim(&mut self) {
        self.atlas.trim();
    }
}
