/// Splits `input` into consecutive chunks of `len` characters; the final
/// chunk carries whatever remains and may be shorter. Length is counted in
/// Unicode scalar values, not bytes, so multi-byte text never splits in the
/// middle of a character.
///
/// Deliberately naive: no token awareness, no overlap, no respect for
/// sentence or word boundaries. Good enough for a demo corpus, a known
/// retrieval-quality limitation for anything bigger.
pub fn split_by_chars(input: &str, len: usize) -> Vec<&str> {
    assert!(len > 0, "chunk length must be positive");

    let mut chunks = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        let end = rest
            .char_indices()
            .nth(len)
            .map_or(rest.len(), |(pos, _)| pos);
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}
