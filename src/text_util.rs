/// Largest message body a chat transport accepts in one piece.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Number of characters kept for the short form of a summary.
pub const SHORT_SUMMARY_CHARS: usize = 500;

/// Lowercase `text`, collapse runs of whitespace and underscores into a
/// single space and trim the result.
///
/// This is the form both queries and folder names are reduced to before
/// they are compared.
pub fn collapse_words(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uppercase the first character and lowercase the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Keep the first `max_chars` characters of `text`.
///
/// Returns the kept prefix and whether anything was cut off.
pub fn take_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

/// Split a long text into chunks of at most `max_chars` characters.
///
/// Paragraphs (separated by blank lines) are packed greedily; a single
/// paragraph longer than the limit is cut into fixed-size pieces.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in text.split("\n\n") {
        let mut paragraph = paragraph;
        if current_len + paragraph.chars().count() + 2 > max_chars
            && !current.is_empty()
        {
            push_trimmed(&mut chunks, &current);
            current.clear();
            current_len = 0;
        }

        loop {
            let (head, cut) = take_chars(paragraph, max_chars);
            if !cut {
                break;
            }
            chunks.push(head.to_string());
            paragraph = &paragraph[head.len()..];
        }

        current.push_str(paragraph);
        current.push_str("\n\n");
        current_len += paragraph.chars().count() + 2;
    }

    push_trimmed(&mut chunks, &current);
    chunks
}

fn push_trimmed(chunks: &mut Vec<String>, chunk: &str) {
    let trimmed = chunk.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_words_normalizes_separators() {
        assert_eq!(collapse_words("  Ivanov__Petr \t 01.01 "), "ivanov petr 01.01");
    }

    #[test]
    fn collapse_words_empty() {
        assert_eq!(collapse_words("   _ "), "");
    }

    #[test]
    fn capitalize_basic() {
        assert_eq!(capitalize("iVANOV"), "Ivanov");
        assert_eq!(capitalize("петров"), "Петров");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn take_chars_counts_characters_not_bytes() {
        let (head, cut) = take_chars("абвгд", 3);
        assert_eq!(head, "абв");
        assert!(cut);

        let (head, cut) = take_chars("abc", 3);
        assert_eq!(head, "abc");
        assert!(!cut);
    }

    #[test]
    fn split_short_text_is_single_chunk() {
        let chunks = split_into_chunks("hello\n\nworld", 4000);
        assert_eq!(chunks, vec!["hello\n\nworld".to_string()]);
    }

    #[test]
    fn split_packs_paragraphs() {
        let text = "aaaa\n\nbbbb\n\ncccc";
        let chunks = split_into_chunks(text, 12);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc"]);

        let chunks = split_into_chunks(text, 10);
        assert_eq!(chunks, vec!["aaaa", "bbbb", "cccc"]);
    }

    #[test]
    fn split_cuts_oversized_paragraph() {
        let text = "x".repeat(25);
        let chunks = split_into_chunks(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_empty_text() {
        assert!(split_into_chunks("", 10).is_empty());
    }
}
