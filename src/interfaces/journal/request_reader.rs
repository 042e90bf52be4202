use crate::domain::order::PaymentRequest;
use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;
use std::io::{BufRead, BufReader, Read};

/// One line of a request journal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalRequest {
    CreateOrder(PaymentRequest),
    Webhook {
        payload: Value,
        /// 1-based index of an earlier `create_order` line whose generated
        /// order id is placed into the payload before it is handled.
        #[serde(default)]
        order_ref: Option<usize>,
    },
}

/// Reads requests from a JSON Lines source.
///
/// Blank lines are skipped. Each remaining line is decoded on its own, so a
/// malformed line yields an error item without ending the stream.
pub struct RequestReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> RequestReader<R> {
    /// Creates a new `RequestReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
        }
    }

    /// Returns an iterator that lazily reads and decodes requests.
    pub fn requests(self) -> impl Iterator<Item = Result<JournalRequest>> {
        self.reader
            .lines()
            .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
            .map(|line| Ok(serde_json::from_str(line?.trim())?))
    }
}
