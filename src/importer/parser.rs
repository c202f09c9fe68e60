use crate::ingestion::types::NewStory;

use thiserror::Error;

pub const DEFAULT_ID_WIDTH: usize = 4;

const ID_COLUMN: &str = "id";
const TEXT_COLUMN: &str = "text";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImportError {
    #[error("CSV input is empty")]
    Empty,

    #[error("CSV header must contain \"id\" and \"text\" columns")]
    MissingColumns,

    #[error("Line {line}: expected at least {expected} fields, found {found}")]
    ShortRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
}

/// Left-pads `id` with zeros up to `width` characters. Longer ids are returned unchanged.
pub fn pad_id(id: &str, width: usize) -> String {
    format!("{:0>width$}", id.trim(), width = width)
}

/// Parses CSV text into candidate stories.
pub fn parse_csv(text: &str) -> Result<Vec<NewStory>, ImportError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = lines.next().ok_or(ImportError::Empty)?;
    let header = split_fields(header, header_line)?;
    let column = |name: &str| header.iter().position(|h| h.trim() == name);

    let (id_idx, text_idx) = match (column(ID_COLUMN), column(TEXT_COLUMN)) {
        (Some(id), Some(text)) => (id, text),
        _ => return Err(ImportError::MissingColumns),
    };
    let needed = id_idx.max(text_idx) + 1;

    lines
        .map(|(line_no, line)| {
            let fields = split_fields(line, line_no)?;
            if fields.len() < needed {
                return Err(ImportError::ShortRow {
                    line: line_no,
                    expected: needed,
                    found: fields.len(),
                });
            }

            Ok(NewStory::new(
                fields[text_idx].clone(),
                pad_id(&fields[id_idx], DEFAULT_ID_WIDTH),
            ))
        })
        .collect()
}

/// Splits one CSV line on commas, honouring double-quoted fields and `""` escapes.
fn split_fields(line: &str, line_no: usize) -> Result<Vec<String>, ImportError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }

    if in_quotes {
        return Err(ImportError::UnterminatedQuote { line: line_no });
    }

    fields.push(field);
    Ok(fields)
}
