//! Bounding text before it reaches the owner-visible `error_detail` field.

/// Trims `detail` and caps it at `max_chars` characters, marking the cut
/// with an ellipsis. Counts characters, never splits a code point.
pub fn bound_detail(detail: &str, max_chars: usize) -> String {
    let detail = detail.trim();
    if detail.chars().count() <= max_chars {
        return detail.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let mut bounded: String = detail.chars().take(max_chars - 1).collect();
    bounded.push('…');
    bounded
}
