//! Smart Game Format (FF[4]) export of a finished or running game.
//!
//! Only writing is supported. Points use the SGF letter pairs `aa`..`ss`,
//! column first, with `a` on the top row; a pass is the empty value `[]`.

use std::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::board::{BoardCoordinate, Color, Stones};

/// One entry of the move record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedMove {
    Play(Color, BoardCoordinate),
    Pass(Color),
    Resign(Color),
}

/// Metadata written into the root node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordInfo {
    pub black: String,
    pub white: String,
    pub game_name: String,
    /// `YYYY-MM-DD`; left out of the record when empty.
    pub date: String,
}

impl RecordInfo {
    /// Metadata dated today (UTC).
    pub fn new(black: &str, white: &str, game_name: &str) -> Self {
        Self {
            black: black.to_string(),
            white: white.to_string(),
            game_name: game_name.to_string(),
            date: today(),
        }
    }
}

/// Everything the writer needs from the rules engine.
#[derive(Clone, Copy, Debug)]
pub struct GameRecord<'a> {
    pub size: usize,
    pub komi: f32,
    pub handicap: &'a Stones,
    pub setup_black: &'a Stones,
    pub setup_white: &'a Stones,
    pub moves: &'a [RecordedMove],
    pub result: &'a str,
}

/// Current UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let (y, m, d) = civil_from_days((secs / 86_400) as i64);
    format!("{y:04}-{m:02}-{d:02}")
}

/// Proleptic Gregorian date of a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = yoe + era * 400 + i64::from(m <= 2);
    (y, m, d)
}

fn point(c: BoardCoordinate, size: usize) -> String {
    let letter = |i: usize| (b'a' + i as u8) as char;
    format!("{}{}", letter(c.col - 1), letter(size - c.row))
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch == ']' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn write_points(out: &mut String, tag: &str, stones: &Stones, size: usize) {
    if stones.is_empty() {
        return;
    }
    out.push_str(tag);
    for &c in stones {
        let _ = write!(out, "[{}]", point(c, size));
    }
}

/// Serialize a game to SGF text.
pub fn write_record(record: &GameRecord<'_>, info: &RecordInfo) -> String {
    let mut out = String::from("(;FF[4]GM[1]CA[UTF-8]AP[augmented-go]");
    let _ = write!(out, "SZ[{}]KM[{}]", record.size, record.komi);
    if !record.handicap.is_empty() {
        let _ = write!(out, "HA[{}]", record.handicap.len());
    }
    for (tag, value) in [
        ("PB", &info.black),
        ("PW", &info.white),
        ("GN", &info.game_name),
        ("DT", &info.date),
    ] {
        if !value.is_empty() {
            let _ = write!(out, "{tag}[{}]", escape(value));
        }
    }
    if !record.result.is_empty() {
        let _ = write!(out, "RE[{}]", escape(record.result));
    }

    let blacks: Stones = record.handicap.union(record.setup_black).copied().collect();
    write_points(&mut out, "AB", &blacks, record.size);
    write_points(&mut out, "AW", record.setup_white, record.size);

    for mv in record.moves {
        match *mv {
            RecordedMove::Play(color, c) => {
                let _ = write!(out, "\n;{}[{}]", color.letter(), point(c, record.size));
            }
            RecordedMove::Pass(color) => {
                let _ = write!(out, "\n;{}[]", color.letter());
            }
            RecordedMove::Resign(color) => {
                let name = match color {
                    Color::Black => "Black",
                    Color::White => "White",
                };
                let _ = write!(out, "\n;C[{name} resigned]");
            }
        }
    }
    out.push_str(")\n");
    out
}
