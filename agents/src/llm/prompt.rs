//! Prompt text sent to the chat backend.

use crate::DecisionRequest;
use chess_core::Color;

const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Standing instructions for the agent playing `color`.
pub fn system_prompt(color: Color) -> String {
    let (side, example, openings) = match color {
        Color::White => (
            "WHITE",
            ("e2e4", "e2", "e4"),
            "e2e4 (King's Pawn), d2d4 (Queen's Pawn), c2c4 (English Opening) or g1f3 (Reti Opening)",
        ),
        Color::Black => (
            "BLACK",
            ("e7e5", "e7", "e5"),
            "e7e5 (King's Pawn), e7e6 (French Defense), c7c5 (Sicilian Defense) or d7d5 (Queen's Pawn)",
        ),
    };
    let (uci, from, to) = example;

    format!(
        "You are an intelligent chess player controlling the {side} pieces. \
         Your goal is to analyze the current board position and choose the best move.\n\n\
         You will be given the current position in FEN notation, the list of legal moves \
         and information about the game state. A FEN string describes a chess position; \
         the starting position is '{STARTING_FEN}'.\n\n\
         Each legal move is given in UCI (Universal Chess Interface) format, like '{uci}', \
         which means move the piece from square {from} to square {to}. \
         Promotions append the piece letter, like 'e7e8q'.\n\n\
         For the initial position, good opening moves for {side} include: {openings}.\n\n\
         YOU MUST select a move from the list of legal moves provided. \
         Think step by step about strategic implications, piece safety and tactical \
         opportunities, and explain your choice.\n\n\
         Reply with a single JSON object and nothing else: \
         {{\"move\": \"<uci move>\", \"reasoning\": \"<your explanation>\"}}. \
         If you truly cannot move, reply {{\"no_move\": \"<reason>\"}}."
    )
}

/// The per-turn message describing the position.
pub fn turn_prompt(request: &DecisionRequest<'_>) -> String {
    let position = request.position;
    let context = request.context;
    let side = context.color.name().to_uppercase();

    let last_move = match &context.opponent_last_move {
        Some(mv) => format!("{}'s last move was {mv}. ", context.color.opponent()),
        None => String::new(),
    };
    let legal = request.legal_moves.to_uci_strings().join(", ");

    let mut prompt = format!(
        "It's your turn to play as {side}. {last_move}\n\
         Current board (FEN): {fen}\n\
         Position summary: {placement}\n\
         Legal moves: {legal}\n\
         Check: {check}, Move number: {number}\n\
         Analyze this position and choose the best move from the legal moves.",
        fen = position.fen,
        placement = position.placement(),
        check = if position.is_check { "Yes" } else { "No" },
        number = context.move_number,
    );

    if let Some(feedback) = &context.feedback {
        prompt.push_str("\n\n");
        prompt.push_str(feedback);
    }
    prompt
}
