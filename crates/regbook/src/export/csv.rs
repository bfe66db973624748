//! Minimal CSV writer for the export fallback path.
//!
//! Quotes a cell only when it contains a comma, quote, or line break;
//! embedded quotes are doubled. No parser lives here — rows are encoded
//! once and never read back from CSV.

use std::io::{self, Write};

use crate::form::Row;

fn needs_quotes(cell: &str) -> bool {
    cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r')
}

/// Write a single row.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn write_row<W: Write>(w: &mut W, row: &[String]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, ",")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Write a full row sequence, header first.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn write_rows<W: Write>(w: &mut W, rows: &[Row]) -> io::Result<()> {
    for row in rows {
        write_row(w, row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_of(cells: &[&str]) -> Vec<String> {
        cells.iter().map(ToString::to_string).collect()
    }

    fn render(rows: &[Vec<String>]) -> String {
        let mut out = Vec::new();
        write_rows(&mut out, rows).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_plain_row() {
        assert_eq!(render(&[row_of(&["a", "b", "c"])]), "a,b,c\n");
    }

    #[test]
    fn test_cell_with_comma_is_quoted() {
        assert_eq!(
            render(&[row_of(&["Math, English", "x"])]),
            "\"Math, English\",x\n"
        );
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        assert_eq!(render(&[row_of(&["say \"hi\""])]), "\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_newline_is_quoted() {
        assert_eq!(render(&[row_of(&["line1\nline2"])]), "\"line1\nline2\"\n");
    }

    #[test]
    fn test_empty_cells_stay_positional() {
        assert_eq!(render(&[row_of(&["a", "", "c"])]), "a,,c\n");
    }

    #[test]
    fn test_multiple_rows() {
        let out = render(&[row_of(&["h1", "h2"]), row_of(&["v1", "v2"])]);
        assert_eq!(out, "h1,h2\nv1,v2\n");
    }
}
