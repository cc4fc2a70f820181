//! Parser for replay scripts.
//!
//! One step per line; `#` followed by whitespace (or at the start of a line)
//! begins a comment, while `#RRGGBB` is a color literal. A `#` inside a
//! quoted name is part of the name:
//!
//! ```text
//! canvas "Ideas"        # create and activate
//! zoom 1.5
//! pan 10 -20
//! note 100 200 #FFEB3B
//! move 1 150 220
//! wait 600
//! undo
//! history
//! ```

use nc_core::Color;
use winnow::ascii::{dec_uint, space0, space1};
use winnow::combinator::{delimited, opt, preceded, separated_pair};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

/// A single scripted user action.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Create a canvas and make it active.
    Canvas(String),
    Switch(String),
    DeleteCanvas(String),
    /// Zoom the active canvas to an absolute scale.
    Zoom(f64),
    /// Pan the active canvas to an absolute offset.
    Pan(f64, f64),
    /// Place a note on the active canvas.
    Note {
        x: f64,
        y: f64,
        color: Option<Color>,
    },
    /// Move the n-th note created by the script (1-based).
    Move { index: usize, x: f64, y: f64 },
    DeleteNote(usize),
    /// Advance the virtual clock by this many milliseconds.
    Wait(u64),
    Undo,
    Redo,
    Clear,
    History,
}

/// A parsed step with its 1-based source line.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLine {
    pub line: usize,
    pub step: Step,
}

/// Parse a whole script. Blank and comment-only lines are skipped.
pub fn parse_script(input: &str) -> Result<Vec<ScriptLine>, String> {
    let mut steps = Vec::new();
    for (i, raw) in input.lines().enumerate() {
        let text = strip_comment(raw).trim();
        if text.is_empty() {
            continue;
        }
        let step = parse_step
            .parse(text)
            .map_err(|e| format!("line {}: cannot parse {text:?}\n{e}", i + 1))?;
        steps.push(ScriptLine { line: i + 1, step });
    }
    Ok(steps)
}

fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut quoted = false;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'"' {
            quoted = !quoted;
        }
        if quoted || b != b'#' {
            continue;
        }
        let at_start = line[..i].trim().is_empty();
        let followed_by_space = bytes.get(i + 1).is_none_or(|c| c.is_ascii_whitespace());
        if at_start || followed_by_space {
            return &line[..i];
        }
    }
    line
}

fn parse_step(input: &mut &str) -> ModalResult<Step> {
    let keyword = parse_keyword.parse_next(input)?;
    let step = match keyword {
        "canvas" => preceded(space1, parse_quoted_string)
            .map(|s| Step::Canvas(s.to_string()))
            .parse_next(input)?,
        "switch" => preceded(space1, parse_quoted_string)
            .map(|s| Step::Switch(s.to_string()))
            .parse_next(input)?,
        "delete-canvas" => preceded(space1, parse_quoted_string)
            .map(|s| Step::DeleteCanvas(s.to_string()))
            .parse_next(input)?,
        "zoom" => preceded(space1, parse_number)
            .map(Step::Zoom)
            .parse_next(input)?,
        "pan" => preceded(space1, parse_pair)
            .map(|(x, y)| Step::Pan(x, y))
            .parse_next(input)?,
        "note" => {
            let (x, y) = preceded(space1, parse_pair).parse_next(input)?;
            let color = opt(preceded(space1, parse_hex_color)).parse_next(input)?;
            Step::Note { x, y, color }
        }
        "move" => {
            let index = preceded(space1, parse_index).parse_next(input)?;
            let (x, y) = preceded(space1, parse_pair).parse_next(input)?;
            Step::Move { index, x, y }
        }
        "delete-note" => preceded(space1, parse_index)
            .map(Step::DeleteNote)
            .parse_next(input)?,
        "wait" => preceded(space1, parse_millis)
            .map(Step::Wait)
            .parse_next(input)?,
        "undo" => Step::Undo,
        "redo" => Step::Redo,
        "clear" => Step::Clear,
        "history" => Step::History,
        _ => return Err(ErrMode::Cut(ContextError::new())),
    };
    skip_space(input);
    Ok(step)
}

// ─── Low-level parsers ──────────────────────────────────────────────────

/// Consume optional whitespace (concrete error type avoids inference issues).
fn skip_space(input: &mut &str) {
    let _: Result<&str, ErrMode<ContextError>> = space0.parse_next(input);
}

fn parse_keyword<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '-').parse_next(input)
}

fn parse_quoted_string<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

fn parse_pair(input: &mut &str) -> ModalResult<(f64, f64)> {
    separated_pair(parse_number, space1, parse_number).parse_next(input)
}

fn parse_millis(input: &mut &str) -> ModalResult<u64> {
    dec_uint.parse_next(input)
}

/// 1-based index; zero is rejected.
fn parse_index(input: &mut &str) -> ModalResult<usize> {
    dec_uint
        .verify(|n: &usize| *n > 0)
        .parse_next(input)
}

fn parse_number(input: &mut &str) -> ModalResult<f64> {
    let start = *input;
    if input.starts_with('-') {
        *input = &input[1..];
    }
    let _ = take_while::<_, _, ErrMode<ContextError>>(1.., |c: char| c.is_ascii_digit())
        .parse_next(input)?;
    if input.starts_with('.') {
        *input = &input[1..];
        let _ =
            take_while::<_, _, ContextError>(0.., |c: char| c.is_ascii_digit()).parse_next(input);
    }
    let matched = &start[..start.len() - input.len()];
    matched
        .parse::<f64>()
        .map_err(|_| ErrMode::Backtrack(ContextError::new()))
}

fn parse_hex_digits<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded('#', take_while(3..=8, |c: char| c.is_ascii_hexdigit())).parse_next(input)
}

fn parse_hex_color(input: &mut &str) -> ModalResult<Color> {
    parse_hex_digits.verify_map(Color::from_hex).parse_next(input)
}
