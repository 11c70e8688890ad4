//! Refusal-block classification.

/// Minimum count of `X` characters, exclusive, for a refusal block.
pub const REFUSAL_BLOCK_THRESHOLD: usize = 100;

/// Returns true when `text`, with spaces and newlines removed, is more than
/// [`REFUSAL_BLOCK_THRESHOLD`] characters long and consists solely of `X`.
pub fn is_refusal_block(text: &str) -> bool {
    let mut count = 0usize;
    for ch in text.chars().filter(|ch| *ch != '\n' && *ch != ' ') {
        if ch != 'X' {
            return false;
        }
        count += 1;
    }

    count > REFUSAL_BLOCK_THRESHOLD
}

/// Renders a full screen of `X` rows used as the lockout screen.
pub fn x_block(columns: usize, rows: usize) -> String {
    let row = "X".repeat(columns);
    vec![row; rows].join("\n")
}
