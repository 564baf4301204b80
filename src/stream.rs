use futures_util::StreamExt;
use tracing::{debug, info};

use crate::backend::ChatBackend;
use crate::conversation::Turn;
use crate::decode::Utf8StreamDecoder;
use crate::session::StreamUpdate;

/// Post `history` and relay the streamed reply through `emit`.
///
/// Chunks are decoded with one decoder for the whole body and emitted as
/// soon as they arrive. Always ends with exactly one `Finished` or
/// `Failed`.
pub async fn stream_reply<B, F>(backend: &B, history: Vec<Turn>, mut emit: F)
where
    B: ChatBackend + ?Sized,
    F: FnMut(StreamUpdate),
{
    let mut body = match backend.open(&history).await {
        Ok(body) => body,
        Err(err) => {
            emit(StreamUpdate::Failed(err));
            return;
        }
    };

    let mut decoder = Utf8StreamDecoder::new();
    let mut chunks = 0usize;
    while let Some(item) = body.next().await {
        let bytes = match item {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(chunks, "stream interrupted");
                emit(StreamUpdate::Failed(err));
                return;
            }
        };
        chunks += 1;

        let text = decoder.decode(&bytes);
        if !text.is_empty() {
            emit(StreamUpdate::Chunk(text));
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        emit(StreamUpdate::Chunk(tail));
    }
    info!(chunks, "stream drained");
    emit(StreamUpdate::Finished);
}
