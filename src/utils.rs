//! # Formatting and Console Helpers
//!
//! Small helpers for presenting analysis results on a terminal:
//!
//! - **Formatting**: latency, percentages and overhead values
//! - **Display Helpers**: ASCII table rows and separators
//!
//! ## Usage Examples
//!
//! ```rust
//! use loadrun_analyzer::utils::*;
//!
//! assert_eq!(format_latency_ms(12.5), "12.50ms");
//! assert_eq!(format_overhead(Some(0.92)), "+92.0%");
//! assert_eq!(format_overhead(None), "n/a");
//! ```

/// Format a latency in milliseconds
///
/// Sub-millisecond values are shown in microseconds and values of a second
/// or more in seconds, both with two decimals.
///
/// ## Examples
///
/// ```rust
/// # use loadrun_analyzer::utils::format_latency_ms;
/// assert_eq!(format_latency_ms(0.25), "250.00μs");
/// assert_eq!(format_latency_ms(19.2), "19.20ms");
/// assert_eq!(format_latency_ms(1500.0), "1.50s");
/// ```
pub fn format_latency_ms(ms: f64) -> String {
    if ms < 1.0 {
        format!("{:.2}μs", ms * 1_000.0)
    } else if ms < 1_000.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.2}s", ms / 1_000.0)
    }
}

/// Format a fraction in [0, 1] as a percentage with two decimals
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Format an overhead fraction as a signed percentage; `n/a` when undefined
pub fn format_overhead(overhead: Option<f64>) -> String {
    match overhead {
        Some(value) => format!("{:+.1}%", value * 100.0),
        None => "n/a".to_string(),
    }
}

/// Print a table row with consistent column widths
///
/// Each column is left-aligned and padded to its width. Columns without a
/// matching width fall back to 10 characters.
///
/// ```rust
/// # use loadrun_analyzer::utils::{print_table_row, print_table_separator};
/// let widths = [6, 8];
/// print_table_separator(&widths);
/// print_table_row(&["rps", "p50"], &widths);
/// print_table_separator(&widths);
/// ```
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    println!("{}", format_table_row(columns, widths));
}

/// Print a table separator matching `print_table_row`
pub fn print_table_separator(widths: &[usize]) {
    println!("{}", format_table_separator(widths));
}

pub fn format_table_row(columns: &[&str], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (i, column) in columns.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(10);
        line.push_str(&format!(" {:width$} |", column, width = width));
    }
    line
}

pub fn format_table_separator(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for &width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_latency_ms() {
        assert_eq!(format_latency_ms(0.5), "500.00μs");
        assert_eq!(format_latency_ms(12.0), "12.00ms");
        assert_eq!(format_latency_ms(2500.0), "2.50s");
    }

    #[test]
    fn test_format_percent_and_overhead() {
        assert_eq!(format_percent(0.125), "12.50%");
        assert_eq!(format_overhead(Some(0.92)), "+92.0%");
        assert_eq!(format_overhead(Some(-0.05)), "-5.0%");
        assert_eq!(format_overhead(None), "n/a");
    }

    #[test]
    fn test_table_formatting() {
        assert_eq!(format_table_separator(&[3, 1]), "+-----+---+");
        assert_eq!(format_table_row(&["ab", "c"], &[3, 1]), "| ab  | c |");
        assert_eq!(format_table_row(&["x"], &[]), "| x          |");
    }
}
