//! Splitting summaries into posts of bounded length.
//!
//! Lengths are counted in Unicode scalar values.

pub const MAX_POST_CHARS: usize = 280;

const ELLIPSIS: &str = "...";

/// Greedily pack whitespace-delimited words into segments of at most `limit`
/// characters. Words longer than `limit` are split into `limit`-sized pieces.
pub fn wrap_words(text: &str, limit: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > limit {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            let mut pieces = chars.chunks(limit).map(|c| c.iter().collect::<String>());
            let mut last = pieces.next().unwrap_or_default();
            for piece in pieces {
                segments.push(std::mem::replace(&mut last, piece));
            }
            current_len = last.chars().count();
            current = last;
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= limit {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            segments.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }

    segments
}

/// A statement followed by its source link, cut with an ellipsis when the
/// pair does not fit in `limit` characters. The link is never cut unless it
/// cannot fit on its own.
pub fn format_entry(text: &str, url: &str, limit: usize) -> String {
    let text = text.trim();
    let url = url.trim();

    if url.is_empty() {
        return truncate_with_ellipsis(text, limit);
    }

    let full = format!("{} {}", text, url);
    if full.chars().count() <= limit {
        return full;
    }

    let reserve = url.chars().count() + ELLIPSIS.len() + 1;
    if reserve >= limit {
        return url.chars().take(limit).collect();
    }

    let head: String = text.chars().take(limit - reserve).collect();
    format!("{}{} {}", head.trim_end(), ELLIPSIS, url)
}

fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text
        .chars()
        .take(limit.saturating_sub(ELLIPSIS.len()))
        .collect();
    format!("{}{}", head.trim_end(), ELLIPSIS)
}
