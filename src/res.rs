//! Parser for the time-series `.QGIS_res` files written by the SPH executable.
//!
//! A file is a sequence of blocks. Each block starts with a line beginning
//! with `time` whose last token is the simulation time, followed by
//! whitespace-separated rows `x y height vx vy vavg`.

use std::io::BufRead;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::ResultRecord;

const TIME_MARKER: &str = "time";
const RECORD_FIELDS: usize = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultBlock {
    pub time: f64,
    pub records: Vec<ResultRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitingTime,
    Accumulating,
    /// 直前の行でブロックを返した。次の行で Accumulating に戻る
    Flushing,
}

/// What to do with the block still open when the input ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfFile {
    /// 最後のブロックも出力する
    #[default]
    Flush,
    /// 最後のブロックを捨てる（旧実装の挙動）
    Drop,
}

#[derive(Debug)]
pub struct ResParser {
    state: ParserState,
    current: Option<ResultBlock>,
    line: usize,
}

impl Default for ResParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::AwaitingTime,
            current: None,
            line: 0,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Feeds one line. Returns the previous block when a new time marker
    /// closes it; the parser then stays in `Flushing` until the next line.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<ResultBlock>> {
        self.line += 1;
        if self.state == ParserState::Flushing {
            self.state = ParserState::Accumulating;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if is_time_marker(trimmed) {
            let time = self.parse_time(trimmed)?;
            let next = ResultBlock {
                time,
                records: Vec::new(),
            };

            return Ok(match self.state {
                ParserState::AwaitingTime => {
                    self.current = Some(next);
                    self.state = ParserState::Accumulating;
                    None
                }
                ParserState::Accumulating | ParserState::Flushing => {
                    self.state = ParserState::Flushing;
                    self.current.replace(next)
                }
            });
        }

        match self.current.as_mut() {
            Some(block) => {
                let record = parse_record(trimmed, self.line)?;
                block.records.push(record);
            }
            None => debug!("Skipping line {} before the first time marker", self.line),
        }
        Ok(None)
    }

    /// Ends the input, returning the open block when `eof` is `Flush`.
    pub fn finish(mut self, eof: EndOfFile) -> Option<ResultBlock> {
        let last = self.current.take();
        match eof {
            EndOfFile::Flush => last,
            EndOfFile::Drop => {
                if let Some(block) = &last {
                    debug!(
                        "Dropping last time step {} ({} records)",
                        block.time,
                        block.records.len()
                    );
                }
                None
            }
        }
    }

    fn parse_time(&self, line: &str) -> Result<f64> {
        let token = line
            .split_whitespace()
            .last()
            .ok_or_else(|| self.malformed("empty time marker"))?;
        token
            .parse::<f64>()
            .map_err(|e| self.malformed(&format!("invalid time value '{}': {}", token, e)))
    }

    fn malformed(&self, reason: &str) -> Error {
        Error::MalformedRecord {
            line: self.line,
            reason: reason.to_string(),
        }
    }
}

fn is_time_marker(line: &str) -> bool {
    line.get(..TIME_MARKER.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(TIME_MARKER))
}

fn parse_record(line: &str, line_no: usize) -> Result<ResultRecord> {
    let mut values = [0.0f64; RECORD_FIELDS];
    let mut fields = line.split_whitespace();

    for (i, slot) in values.iter_mut().enumerate() {
        let token = fields.next().ok_or_else(|| Error::MalformedRecord {
            line: line_no,
            reason: format!("expected {} fields, found {}", RECORD_FIELDS, i),
        })?;
        *slot = token.parse::<f64>().map_err(|e| Error::MalformedRecord {
            line: line_no,
            reason: format!("invalid number '{}': {}", token, e),
        })?;
    }

    let [x, y, height, vx, vy, vavg] = values;
    Ok(ResultRecord {
        x,
        y,
        height,
        vx,
        vy,
        vavg,
    })
}

/// Parses a whole result file into its time blocks.
pub fn parse_res<R: BufRead>(reader: R, eof: EndOfFile) -> Result<Vec<ResultBlock>> {
    let mut parser = ResParser::new();
    let mut blocks = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if let Some(block) = parser.feed_line(&line)? {
            blocks.push(block);
        }
    }
    if let Some(block) = parser.finish(eof) {
        blocks.push(block);
    }

    debug!("Parsed {} time steps", blocks.len());
    Ok(blocks)
}
