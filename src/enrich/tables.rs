//! Table reconstruction from line spacing and word column clusters.
//!
//! A paragraph is a table candidate when its lines are evenly spaced; the
//! column structure then comes from clustering word x-starts. No ruling-line
//! information is available from the engine, so this is purely geometric.

use crate::models::{Block, DetectedTable, Paragraph};

/// Spacing regularity: mean absolute deviation below this fraction of the
/// mean line spacing.
const MAX_SPACING_MAD_RATIO: f64 = 0.30;

/// Word x-starts are clustered by rounding to this grid.
const CLUSTER_GRID: f64 = 10.0;

/// A word belongs to a column when its x-start is within this distance of
/// the column centroid.
const CELL_CAPTURE: f64 = 20.0;

/// Header heuristic: a first-row cell may be this long and still read as a
/// header if it is not all-caps.
const MAX_HEADER_CELL_LEN: usize = 20;

/// Detect tables across all paragraphs of the final block list.
pub fn detect_tables(blocks: &[Block]) -> Vec<DetectedTable> {
    blocks
        .iter()
        .flat_map(|b| &b.paragraphs)
        .filter_map(detect_in_paragraph)
        .collect()
}

fn detect_in_paragraph(paragraph: &Paragraph) -> Option<DetectedTable> {
    if paragraph.lines.len() < 2 {
        return None;
    }

    // Even vertical rhythm is the first requirement.
    let spacings: Vec<f64> = paragraph
        .lines
        .windows(2)
        .map(|pair| pair[1].bbox.y0 - pair[0].bbox.y0)
        .collect();
    let mean_spacing = spacings.iter().sum::<f64>() / spacings.len() as f64;
    if mean_spacing <= 0.0 {
        return None;
    }
    let mad = spacings
        .iter()
        .map(|s| (s - mean_spacing).abs())
        .sum::<f64>()
        / spacings.len() as f64;
    if mad >= MAX_SPACING_MAD_RATIO * mean_spacing {
        return None;
    }

    // Column clusters from word x-starts rounded to the grid.
    let mut clusters: Vec<(f64, Vec<f64>)> = Vec::new();
    for word in paragraph.lines.iter().flat_map(|l| &l.words) {
        let key = (word.bbox.x0 / CLUSTER_GRID).round() * CLUSTER_GRID;
        match clusters.iter_mut().find(|(k, _)| *k == key) {
            Some((_, xs)) => xs.push(word.bbox.x0),
            None => clusters.push((key, vec![word.bbox.x0])),
        }
    }
    if clusters.len() < 2 {
        return None;
    }
    clusters.sort_by(|a, b| a.0.total_cmp(&b.0));

    let centroids: Vec<f64> = clusters
        .iter()
        .map(|(_, xs)| xs.iter().sum::<f64>() / xs.len() as f64)
        .collect();

    // One row per line, one cell per column centroid.
    let cells: Vec<Vec<String>> = paragraph
        .lines
        .iter()
        .map(|line| {
            centroids
                .iter()
                .map(|centroid| {
                    line.words
                        .iter()
                        .filter(|w| (w.bbox.x0 - centroid).abs() <= CELL_CAPTURE)
                        .map(|w| w.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect()
        })
        .collect();

    let has_header = cells
        .first()
        .map(|row| row.iter().all(|cell| is_header_cell(cell)))
        .unwrap_or(false);

    Some(DetectedTable {
        rows: paragraph.lines.len(),
        cols: centroids.len(),
        has_header,
        cells,
        bbox: paragraph.bbox,
    })
}

/// A header cell is all-caps or short.
fn is_header_cell(cell: &str) -> bool {
    cell.len() < MAX_HEADER_CELL_LEN
        || cell
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BlockType, BoundingBox, Line, LineAlignment, TextType, Word, WordContentType,
    };

    fn word(text: &str, x0: f64, y0: f64) -> Word {
        Word {
            text: text.to_string(),
            bbox: BoundingBox::from_origin_size(x0, y0, 40.0, 12.0),
            confidence: 90.0,
            font_size: 9,
            content_type: WordContentType::Text,
        }
    }

    fn line(words: Vec<Word>, y0: f64) -> Line {
        let bbox = words
            .iter()
            .skip(1)
            .fold(words[0].bbox, |acc, w| acc.union(&w.bbox));
        Line {
            text: words
                .iter()
                .map(|w| w.text.clone())
                .collect::<Vec<_>>()
                .join(" "),
            bbox: BoundingBox::new(bbox.x0, y0, bbox.x1, y0 + 12.0),
            confidence: 90.0,
            alignment: LineAlignment::Left,
            words,
        }
    }

    fn paragraph(lines: Vec<Line>) -> Paragraph {
        let bbox = lines
            .iter()
            .skip(1)
            .fold(lines[0].bbox, |acc, l| acc.union(&l.bbox));
        Paragraph {
            text: String::new(),
            bbox,
            confidence: 90.0,
            text_type: TextType::Body,
            level: None,
            lines,
        }
    }

    fn block(paragraphs: Vec<Paragraph>) -> Block {
        Block {
            text: String::new(),
            bbox: paragraphs[0].bbox,
            confidence: 90.0,
            block_type: BlockType::Text,
            reading_order: 1,
            paragraphs,
        }
    }

    fn grid_paragraph() -> Paragraph {
        // Three evenly spaced rows, two columns at x=50 and x=300.
        paragraph(vec![
            line(vec![word("ITEM", 50.0, 100.0), word("PRICE", 300.0, 100.0)], 100.0),
            line(vec![word("Widget", 50.0, 120.0), word("9.99", 300.0, 120.0)], 120.0),
            line(vec![word("Gadget", 50.0, 140.0), word("19.99", 300.0, 140.0)], 140.0),
        ])
    }

    #[test]
    fn test_detects_two_column_grid() {
        let tables = detect_tables(&[block(vec![grid_paragraph()])]);
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert_eq!(table.rows, 3);
        assert_eq!(table.cols, 2);
        assert!(table.has_header);
        assert_eq!(table.cells[0], vec!["ITEM", "PRICE"]);
        assert_eq!(table.cells[1], vec!["Widget", "9.99"]);
        assert_eq!(table.cells[2], vec!["Gadget", "19.99"]);
    }

    #[test]
    fn test_irregular_spacing_is_not_a_table() {
        let p = paragraph(vec![
            line(vec![word("a", 50.0, 100.0), word("b", 300.0, 100.0)], 100.0),
            line(vec![word("c", 50.0, 112.0), word("d", 300.0, 112.0)], 112.0),
            line(vec![word("e", 50.0, 200.0), word("f", 300.0, 200.0)], 200.0),
        ]);
        assert!(detect_tables(&[block(vec![p])]).is_empty());
    }

    #[test]
    fn test_single_column_is_not_a_table() {
        let p = paragraph(vec![
            line(vec![word("only", 50.0, 100.0)], 100.0),
            line(vec![word("one", 50.0, 120.0)], 120.0),
            line(vec![word("column", 50.0, 140.0)], 140.0),
        ]);
        assert!(detect_tables(&[block(vec![p])]).is_empty());
    }

    #[test]
    fn test_single_line_is_not_a_table() {
        let p = paragraph(vec![line(
            vec![word("a", 50.0, 100.0), word("b", 300.0, 100.0)],
            100.0,
        )]);
        assert!(detect_tables(&[block(vec![p])]).is_empty());
    }

    #[test]
    fn test_long_mixed_case_first_row_is_not_header() {
        let p = paragraph(vec![
            line(
                vec![
                    word("This is quite a long first cell", 50.0, 100.0),
                    word("Another long mixed cell", 300.0, 100.0),
                ],
                100.0,
            ),
            line(vec![word("a", 50.0, 120.0), word("b", 300.0, 120.0)], 120.0),
            line(vec![word("c", 50.0, 140.0), word("d", 300.0, 140.0)], 140.0),
        ]);
        let tables = detect_tables(&[block(vec![p])]);
        assert_eq!(tables.len(), 1);
        assert!(!tables[0].has_header);
    }

    #[test]
    fn test_header_cell_rules() {
        assert!(is_header_cell("TOTAL"));
        assert!(is_header_cell("Qty"));
        assert!(is_header_cell(""));
        assert!(is_header_cell("A VERY LONG ALL CAPS HEADER CELL"));
        assert!(!is_header_cell("a very long lowercase cell text"));
    }
}
