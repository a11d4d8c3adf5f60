use unicode_width::UnicodeWidthStr;

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    format!("{}..", out)
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Right-align within `width` columns (numbers).
pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - sw), s)
    }
}

/// Two decimal places; amounts are shown, never re-parsed.
pub(crate) fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

/// Widest column a table cell may take before it is truncated.
const MAX_COLUMN_WIDTH: usize = 40;

/// Plain-text table. Columns listed in `numeric` are right-aligned.
pub(crate) fn render_table(headers: &[&str], rows: &[Vec<String>], numeric: &[usize]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(display_width(cell)).min(MAX_COLUMN_WIDTH);
            }
        }
    }

    let render_row = |cells: Vec<String>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                if numeric.contains(&i) {
                    pad_left(cell, width)
                } else {
                    pad_right(cell, width)
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render_row(headers.iter().map(|h| h.to_string()).collect())];
    lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    lines.extend(rows.iter().map(|r| render_row(r.clone())));
    lines.join("\n")
}
