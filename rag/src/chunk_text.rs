/// Splits `text` into overlapping, trimmed chunks of at most `max_chars`
/// characters.
///
/// A cut that lands inside the text is pulled back to the last space after
/// the cursor, so words are not split at a chunk's end. Each following chunk
/// starts `overlap_chars` before the previous cut.
pub fn chunk_text(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len_chars = chars.len();

    if max_chars == 0 {
        let trimmed = text.trim();
        return if trimmed.is_empty() { vec![] } else { vec![trimmed.to_string()] };
    }
    // Config validation rejects this; clamp so the cursor always moves forward.
    let overlap = if overlap_chars >= max_chars { max_chars / 4 } else { overlap_chars };

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len_chars {
        let raw_end = start + max_chars;
        let end = if raw_end < len_chars {
            last_space(&chars, start, raw_end).unwrap_or(raw_end)
        } else {
            len_chars
        };

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == len_chars {
            break;
        }
        start = next_start(start, end, overlap);
    }

    chunks
}

/// Position of the last `' '` in `(start, end)`. A space at `start` itself is
/// ignored, since cutting there would yield an empty chunk.
fn last_space(chars: &[char], start: usize, end: usize) -> Option<usize> {
    (start + 1..end).rev().find(|&i| chars[i] == ' ')
}

fn next_start(start: usize, end: usize, overlap: usize) -> usize {
    let next = end.saturating_sub(overlap);
    if next <= start { end } else { next }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_always_advances() {
        assert_eq!(next_start(10, 12, 5), 12);
        assert_eq!(next_start(10, 20, 5), 15);
        assert_eq!(next_start(0, 3, 3), 3);
    }

    #[test]
    fn space_at_cursor_is_not_a_cut_point() {
        let chars: Vec<char> = " abc def".chars().collect();
        assert_eq!(last_space(&chars, 0, 4), None);
        assert_eq!(last_space(&chars, 0, 6), Some(4));
    }

    #[test]
    fn oversized_overlap_is_clamped() {
        let text = "a b c d e f g h i j k l m n o p";
        let chunks = chunk_text(text, 4, 9);
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }
}
