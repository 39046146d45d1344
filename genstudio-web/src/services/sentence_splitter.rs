//! Sentence splitting for story text

/// Split text into sentences at `.`, `!` or `?` followed by whitespace
///
/// Terminators stay with their sentence; the whitespace is dropped.
/// Empty fragments are discarded.
pub fn split_sentences(text: &str) -> Vec<String> {
    let text = text.trim();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = i + c.len_utf8();
        let Some(&(_, next)) = chars.peek() else {
            break;
        };
        if !next.is_whitespace() {
            continue;
        }

        push_trimmed(&mut sentences, &text[start..end]);
        start = end;
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            chars.next();
            start = j + w.len_utf8();
        }
    }

    if start < text.len() {
        push_trimmed(&mut sentences, &text[start..]);
    }
    sentences
}

fn push_trimmed(out: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        out.push(fragment.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_split() {
        assert_eq!(
            split_sentences("The cat sat. It was happy! Was it?  Yes."),
            vec!["The cat sat.", "It was happy!", "Was it?", "Yes."]
        );
    }

    #[test]
    fn test_terminator_without_whitespace_does_not_split() {
        assert_eq!(
            split_sentences("Version 1.5 shipped.Then nothing"),
            vec!["Version 1.5 shipped.Then nothing"]
        );
    }

    #[test]
    fn test_newlines_count_as_whitespace() {
        assert_eq!(
            split_sentences("  First line.\n\nSecond line?\tThird  "),
            vec!["First line.", "Second line?", "Third"]
        );
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n ").is_empty());
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(
            split_sentences("Café ouvert. Très bien!"),
            vec!["Café ouvert.", "Très bien!"]
        );
    }
}
