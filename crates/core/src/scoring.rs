//! Scoring module - fixed points per committed piece
//!
//! Points depend only on how many lines a single commit cleared. The table is
//! a lookup, not a formula: clears beyond four lines (not reachable with one
//! standard piece) are worth nothing.

use tetris_rooms_types::LINE_SCORES;

/// Points for clearing `lines` rows in one commit
///
/// # Examples
///
/// ```
/// use tetris_rooms_core::calculate_score;
///
/// assert_eq!(calculate_score(1), 100);
/// assert_eq!(calculate_score(4), 800);
/// assert_eq!(calculate_score(5), 0);
/// ```
pub fn calculate_score(lines: u32) -> u32 {
    LINE_SCORES.get(lines as usize).copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_values() {
        assert_eq!(calculate_score(1), 100);
        assert_eq!(calculate_score(2), 300);
        assert_eq!(calculate_score(3), 500);
        assert_eq!(calculate_score(4), 800);
    }

    #[test]
    fn everything_else_scores_zero() {
        assert_eq!(calculate_score(0), 0);
        assert_eq!(calculate_score(5), 0);
        assert_eq!(calculate_score(20), 0);
        assert_eq!(calculate_score(u32::MAX), 0);
    }
}
