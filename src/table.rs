//! Plain-text table rendering for terminal output.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Renders `rows` under `headers` with two-space gutters. Columns whose
/// non-empty cells are all numbers are right-aligned. Cells beyond the
/// header count are dropped and missing cells render empty.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            (0..headers.len())
                .map(|idx| row.get(idx).map(|cell| flatten(cell)).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            cells
                .iter()
                .map(|row| width(&row[idx]))
                .chain([width(header), 3])
                .max()
                .unwrap_or(3)
        })
        .collect();
    let aligns: Vec<Align> = (0..headers.len())
        .map(|idx| column_alignment(cells.iter().map(|row| row[idx].as_str())))
        .collect();

    let mut output = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| flatten(h)).collect();
    push_line(&mut output, &header_cells, &widths, &aligns);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut output, &rule, &widths, &vec![Align::Left; widths.len()]);
    for row in &cells {
        push_line(&mut output, row, &widths, &aligns);
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize], aligns: &[Align]) {
    let mut line = String::new();
    for (idx, ((cell, column_width), align)) in cells.iter().zip(widths).zip(aligns).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let pad = column_width.saturating_sub(width(cell));
        match align {
            Align::Left => {
                line.push_str(cell);
                line.extend(std::iter::repeat_n(' ', pad));
            }
            Align::Right => {
                line.extend(std::iter::repeat_n(' ', pad));
                line.push_str(cell);
            }
        }
    }
    let _ = writeln!(output, "{}", line.trim_end());
}

fn column_alignment<'a>(mut cells: impl Iterator<Item = &'a str>) -> Align {
    let mut saw_number = false;
    let all_numeric = cells.all(|cell| {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return true;
        }
        saw_number = true;
        trimmed.parse::<f64>().is_ok()
    });
    if all_numeric && saw_number {
        Align::Right
    } else {
        Align::Left
    }
}

fn width(value: &str) -> usize {
    value.chars().count()
}

// Control whitespace would break the grid.
fn flatten(value: &str) -> String {
    value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect()
}
