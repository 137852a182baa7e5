// Incremental parser for `text/event-stream` bodies.
//
// <https://html.spec.whatwg.org/multipage/server-sent-events.html#event-stream-interpretation>
// Only the `event` and `data` fields are interpreted. `id` and `retry` are ignored, as are comments.

use anyhow::Result;
use thiserror::Error;

use crate::containers::HeadEvent;

const HEAD_TOPIC: &str = "head";

#[derive(PartialEq, Eq, Debug)]
pub struct ServerSentEvent {
    pub event: String,
    pub data: String,
}

impl ServerSentEvent {
    pub fn into_head_event(self) -> Result<Option<HeadEvent>> {
        if self.event != HEAD_TOPIC {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&self.data)?))
    }
}

/// Accumulates chunks of an event stream and yields complete events.
///
/// Chunk boundaries may fall anywhere, including inside a line or a UTF-8 sequence.
#[derive(Default)]
pub struct EventBuffer {
    pending: Vec<u8>,
}

impl EventBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<ServerSentEvent>> {
        self.pending.extend_from_slice(chunk);

        let mut events = vec![];

        while let Some((block_end, separator_length)) = find_block_end(&self.pending) {
            let block = self.pending.drain(..block_end + separator_length).collect::<Vec<_>>();

            match parse_block(&block[..block_end]) {
                Ok(Some(event)) => events.push(Ok(event)),
                Ok(None) => {}
                Err(error) => events.push(Err(error)),
            }
        }

        events
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("server-sent event is not valid UTF-8")]
    NotUtf8,
}

fn find_block_end(bytes: &[u8]) -> Option<(usize, usize)> {
    let lf = bytes.windows(2).position(|window| window == b"\n\n");
    let crlf = bytes.windows(4).position(|window| window == b"\r\n\r\n");

    match (lf, crlf) {
        (Some(lf), Some(crlf)) if crlf < lf => Some((crlf, 4)),
        (Some(lf), _) => Some((lf, 2)),
        (None, Some(crlf)) => Some((crlf, 4)),
        (None, None) => None,
    }
}

fn parse_block(block: &[u8]) -> Result<Option<ServerSentEvent>> {
    let text = core::str::from_utf8(block).map_err(|_| Error::NotUtf8)?;

    let mut event = None;
    let mut data_lines = vec![];

    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);

        match field {
            "event" => event = Some(value),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return Ok(None);
    }

    Ok(Some(ServerSentEvent {
        event: event.unwrap_or("message").to_owned(),
        data: data_lines.join("\n"),
    }))
}
