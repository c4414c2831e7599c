//! Tesseract OCR backend.
//!
//! Runs the tesseract binary in TSV mode, which reports one row per layout
//! node (page, block, paragraph, line, word) with pixel coordinates and a
//! confidence for each recognized word. The rows arrive parents-first, so the
//! tree can be rebuilt in a single pass.

use std::path::Path;
use std::process::Command;

use crate::models::BoundingBox;

use super::{round2, OcrEngine, OcrError, RawBlock, RawLine, RawPage, RawParagraph, RawWord};

/// TSV level codes emitted by tesseract.
const LEVEL_PAGE: u32 = 1;
const LEVEL_BLOCK: u32 = 2;
const LEVEL_PARAGRAPH: u32 = 3;
const LEVEL_LINE: u32 = 4;
const LEVEL_WORD: u32 = 5;

/// Command-line Tesseract backend.
pub struct TesseractEngine {
    binary: String,
}

impl TesseractEngine {
    pub fn new() -> Self {
        Self {
            binary: "tesseract".to_string(),
        }
    }

    /// Whether the tesseract binary can be executed.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .is_ok()
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image_path: &Path, language: &str) -> Result<RawPage, OcrError> {
        let output = Command::new(&self.binary)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", language, "tsv"])
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::BackendNotAvailable(
                    "tesseract not found (install tesseract-ocr)".to_string(),
                ));
            }
            Err(e) => return Err(OcrError::Io(e)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)));
        }

        parse_tsv(&String::from_utf8_lossy(&output.stdout))
    }
}

/// One parsed TSV row.
struct TsvRow<'a> {
    level: u32,
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    conf: f64,
    text: &'a str,
}

fn parse_row(line: &str) -> Option<TsvRow<'_>> {
    // level page block par line word left top width height conf text
    let mut cols = line.split('\t');
    let level = cols.next()?.parse().ok()?;
    // page/block/par/line/word numbers are implied by row order.
    for _ in 0..4 {
        cols.next()?;
    }
    let left: f64 = cols.next()?.parse().ok()?;
    let top: f64 = cols.next()?.parse().ok()?;
    let width: f64 = cols.next()?.parse().ok()?;
    let height: f64 = cols.next()?.parse().ok()?;
    let conf: f64 = cols.next()?.parse().ok()?;
    let text = cols.next().unwrap_or("");

    Some(TsvRow {
        level,
        left,
        top,
        width,
        height,
        conf,
        text,
    })
}

/// Rebuild the page tree from tesseract's TSV output.
///
/// Container rows carry no confidence (-1); confidences are recomputed as the
/// mean of contained words in a finishing pass. Containers that end up with
/// no recognized words are dropped, so an empty page yields zero blocks.
pub(crate) fn parse_tsv(tsv: &str) -> Result<RawPage, OcrError> {
    let mut page = RawPage {
        width: 0.0,
        height: 0.0,
        blocks: Vec::new(),
    };

    for line in tsv.lines().skip(1) {
        let Some(row) = parse_row(line) else {
            continue;
        };

        let bbox = BoundingBox::from_origin_size(
            round2(row.left),
            round2(row.top),
            round2(row.width),
            round2(row.height),
        );

        match row.level {
            LEVEL_PAGE => {
                page.width = row.width;
                page.height = row.height;
            }
            LEVEL_BLOCK => page.blocks.push(RawBlock {
                bbox,
                confidence: 0.0,
                paragraphs: Vec::new(),
            }),
            LEVEL_PARAGRAPH => {
                if let Some(block) = page.blocks.last_mut() {
                    block.paragraphs.push(RawParagraph {
                        bbox,
                        confidence: 0.0,
                        lines: Vec::new(),
                    });
                }
            }
            LEVEL_LINE => {
                if let Some(paragraph) = page
                    .blocks
                    .last_mut()
                    .and_then(|b| b.paragraphs.last_mut())
                {
                    paragraph.lines.push(RawLine {
                        bbox,
                        confidence: 0.0,
                        words: Vec::new(),
                    });
                }
            }
            LEVEL_WORD => {
                let text = row.text.trim();
                if text.is_empty() || row.conf < 0.0 {
                    continue;
                }
                if let Some(line) = page
                    .blocks
                    .last_mut()
                    .and_then(|b| b.paragraphs.last_mut())
                    .and_then(|p| p.lines.last_mut())
                {
                    line.words.push(RawWord {
                        text: text.to_string(),
                        bbox,
                        confidence: row.conf,
                    });
                }
            }
            _ => {}
        }
    }

    if page.width <= 0.0 || page.height <= 0.0 {
        return Err(OcrError::InvalidOutput(
            "TSV output contained no page row".to_string(),
        ));
    }

    prune_and_score(&mut page);
    Ok(page)
}

/// Drop empty containers and fill in mean-of-words confidences.
fn prune_and_score(page: &mut RawPage) {
    for block in &mut page.blocks {
        for paragraph in &mut block.paragraphs {
            paragraph.lines.retain(|l| !l.words.is_empty());
            for line in &mut paragraph.lines {
                line.confidence = mean(line.words.iter().map(|w| w.confidence));
            }
        }
        block.paragraphs.retain(|p| !p.lines.is_empty());
        for paragraph in &mut block.paragraphs {
            paragraph.confidence = mean(
                paragraph
                    .lines
                    .iter()
                    .flat_map(|l| &l.words)
                    .map(|w| w.confidence),
            );
        }
    }
    page.blocks.retain(|b| !b.paragraphs.is_empty());
    for block in &mut page.blocks {
        block.confidence = mean(
            block
                .paragraphs
                .iter()
                .flat_map(|p| &p.lines)
                .flat_map(|l| &l.words)
                .map(|w| w.confidence),
        );
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        round2(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn tsv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn test_parses_word_hierarchy() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t",
            "2\t1\t1\t0\t0\t0\t50\t40\t300\t60\t-1\t",
            "3\t1\t1\t1\t0\t0\t50\t40\t300\t60\t-1\t",
            "4\t1\t1\t1\t1\t0\t50\t40\t300\t24\t-1\t",
            "5\t1\t1\t1\t1\t1\t50\t40\t80\t24\t91.5\tTest",
            "5\t1\t1\t1\t1\t2\t140\t40\t110\t24\t88.5\tInvoice",
        ]);

        let page = parse_tsv(&input).unwrap();
        assert_eq!(page.width, 800.0);
        assert_eq!(page.height, 600.0);
        assert_eq!(page.blocks.len(), 1);

        let line = &page.blocks[0].paragraphs[0].lines[0];
        assert_eq!(line.words.len(), 2);
        assert_eq!(line.words[0].text, "Test");
        assert_eq!(line.words[1].bbox.x0, 140.0);
        assert_eq!(line.words[1].bbox.x1, 250.0);
        assert_eq!(line.confidence, 90.0);
        assert_eq!(page.blocks[0].confidence, 90.0);
    }

    #[test]
    fn test_empty_page_yields_no_blocks() {
        // Containers without any recognized word are pruned.
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t",
            "2\t1\t1\t0\t0\t0\t0\t0\t800\t600\t-1\t",
            "3\t1\t1\t1\t0\t0\t0\t0\t800\t600\t-1\t",
            "4\t1\t1\t1\t1\t0\t0\t0\t800\t20\t-1\t",
        ]);

        let page = parse_tsv(&input).unwrap();
        assert!(page.blocks.is_empty());
    }

    #[test]
    fn test_skips_low_confidence_and_blank_words() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t",
            "2\t1\t1\t0\t0\t0\t0\t0\t400\t60\t-1\t",
            "3\t1\t1\t1\t0\t0\t0\t0\t400\t60\t-1\t",
            "4\t1\t1\t1\t1\t0\t0\t0\t400\t24\t-1\t",
            "5\t1\t1\t1\t1\t1\t0\t0\t40\t24\t-1\t ",
            "5\t1\t1\t1\t1\t2\t50\t0\t40\t24\t95\tkeep",
        ]);

        let page = parse_tsv(&input).unwrap();
        let words: Vec<_> = page.words().map(|w| w.text.as_str()).collect();
        assert_eq!(words, vec!["keep"]);
    }

    #[test]
    fn test_missing_page_row_is_an_error() {
        let input = tsv(&["2\t1\t1\t0\t0\t0\t0\t0\t400\t60\t-1\t"]);
        assert!(matches!(
            parse_tsv(&input),
            Err(OcrError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let input = tsv(&[
            "1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t",
            "not\ta\tvalid\trow",
            "2\t1\t1\t0\t0\t0\t0\t0\t400\t60\t-1\t",
            "3\t1\t1\t1\t0\t0\t0\t0\t400\t60\t-1\t",
            "4\t1\t1\t1\t1\t0\t0\t0\t400\t24\t-1\t",
            "5\t1\t1\t1\t1\t1\t0\t0\t40\t24\t80\tok",
        ]);

        let page = parse_tsv(&input).unwrap();
        assert_eq!(page.words().count(), 1);
    }
}
