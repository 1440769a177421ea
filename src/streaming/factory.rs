//! Stream factory
//!
//! Turns an HTTP response body into a stream of decoded records. The body is
//! read through `tokio-util`'s `StreamReader` and framed into lines with
//! `LinesCodec`, which holds back partial lines (and the characters in them)
//! until the rest arrives. Each complete line is decoded on its own.

use futures::{Stream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use std::io::Cursor;
use std::pin::Pin;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

use super::decoder::{ChunkReport, decode_candidate};
use crate::error::ChatError;

/// A boxed stream of decoded records.
pub type RecordStream<T> = Pin<Box<dyn Stream<Item = Result<T, ChatError>> + Send>>;

/// Builds record streams from transport bodies.
pub struct StreamFactory;

impl StreamFactory {
    /// Create a record stream from a newline-delimited JSON response body.
    pub fn create_json_stream<T>(response: reqwest::Response) -> RecordStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let byte_stream = response
            .bytes_stream()
            .map_err(|e| ChatError::StreamError(e.to_string()));

        Self::from_byte_stream(byte_stream)
    }

    /// Create a record stream from any fallible byte-chunk stream.
    ///
    /// A transport error is yielded once and ends the stream. Malformed
    /// records are skipped and never yielded. A final line without a
    /// trailing newline is decoded at a clean end of stream.
    pub fn from_byte_stream<S, B, T>(bytes: S) -> RecordStream<T>
    where
        S: Stream<Item = Result<B, ChatError>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        T: DeserializeOwned + Send + 'static,
    {
        let reader = StreamReader::new(Box::pin(
            bytes.map_ok(Cursor::new).map_err(std::io::Error::other),
        ));
        let mut lines = Box::pin(FramedRead::new(reader, LinesCodec::new()));

        let stream = async_stream::stream! {
            let mut report = ChunkReport::default();

            while let Some(line) = lines.next().await {
                match line {
                    Ok(line) => {
                        if let Some(record) = decode_candidate::<T>(&line, &mut report) {
                            yield Ok(record);
                        }
                    }
                    Err(e) => {
                        let error = line_error(e);
                        tracing::debug!(error = %error, "Transport failed mid-stream");
                        yield Err(error);
                        break;
                    }
                }
            }

            if report.is_total_failure() {
                tracing::warn!(skipped = report.skipped, "No record in stream could be decoded");
            }
            tracing::debug!(
                decoded = report.decoded,
                skipped = report.skipped,
                "JSON line stream finished"
            );
        };

        Box::pin(stream)
    }
}

/// Recover the transport error carried through the reader, if there is one.
fn line_error(error: LinesCodecError) -> ChatError {
    match error {
        LinesCodecError::Io(io) => match io
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<ChatError>())
        {
            Some(transport) => transport.clone(),
            None => ChatError::StreamError(io.to_string()),
        },
        LinesCodecError::MaxLineLengthExceeded => {
            ChatError::StreamError("JSON line exceeded the maximum length".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatRecord, CompletionRecord, StreamRecord};

    fn chunks(parts: Vec<&'static str>) -> impl Stream<Item = Result<&'static str, ChatError>> {
        futures::stream::iter(parts.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn test_records_split_across_chunks() {
        let body = vec![
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hel\"},\"done\":false}\n{\"message\":{\"role\":\"ass",
            "istant\",\"content\":\"lo\"},\"done\":false}\n",
            "garbage\n",
            "{\"done\":true}",
        ];

        let records: Vec<ChatRecord> = StreamFactory::from_byte_stream(chunks(body))
            .map(|r| r.unwrap())
            .collect()
            .await;

        let text: String = records.iter().map(|r| r.content()).collect();
        assert_eq!(text, "Hello");
        assert_eq!(records.len(), 3);
        assert!(records.last().unwrap().is_done());
    }

    #[tokio::test]
    async fn test_multibyte_character_split_across_chunks() {
        let line = "{\"response\":\"h\u{e9}llo \u{1f30d}\",\"done\":false}\n".as_bytes();
        let split = line.iter().position(|b| *b == 0xf0).unwrap() + 2;
        let body = futures::stream::iter(vec![
            Ok::<_, ChatError>(line[..5].to_vec()),
            Ok(line[5..split].to_vec()),
            Ok(line[split..].to_vec()),
        ]);

        let records: Vec<CompletionRecord> = StreamFactory::from_byte_stream(body)
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].response, "h\u{e9}llo \u{1f30d}");
    }

    #[tokio::test]
    async fn test_blank_and_falsy_lines_are_skipped() {
        let body = chunks(vec!["\n\r\nnull\n0\n", "{\"response\":\"x\",\"done\":true}\r\n"]);

        let records: Vec<CompletionRecord> = StreamFactory::from_byte_stream(body)
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].response, "x");
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let body = futures::stream::iter(vec![
            Ok("{\"response\":\"a\",\"done\":false}\n"),
            Err(ChatError::StreamError("connection reset".into())),
            Ok("{\"response\":\"b\",\"done\":true}\n"),
        ]);

        let items: Vec<Result<serde_json::Value, ChatError>> =
            StreamFactory::from_byte_stream(body).collect().await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert_eq!(
            items[1],
            Err(ChatError::StreamError("connection reset".into()))
        );
    }
}
