/// Longest message the chat transport accepts, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Chunk size used when a message has to be split.
pub const CHUNK_CHARS: usize = 4000;

/// True when `text` does not fit in a single outbound message
pub fn is_too_long(text: &str, max_chars: usize) -> bool {
    text.chars().count() >= max_chars
}

/// Split `text` into `chunk_chars`-sized pieces suffixed with ` [i/n]`.
/// Splits on character boundaries, never inside a UTF-8 sequence.
pub fn split_text(text: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let chunk_chars = chunk_chars.max(1);
    let total = chars.len().div_ceil(chunk_chars);

    chars
        .chunks(chunk_chars)
        .enumerate()
        .map(|(i, chunk)| format!("{} [{}/{}]", chunk.iter().collect::<String>(), i + 1, total))
        .collect()
}

/// Messages to send for `text`: itself, or its chunks when too long.
pub fn outbound_messages(text: String) -> Vec<String> {
    if is_too_long(&text, MAX_MESSAGE_CHARS) {
        split_text(&text, CHUNK_CHARS)
    } else {
        vec![text]
    }
}
