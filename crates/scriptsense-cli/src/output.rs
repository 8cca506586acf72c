use std::fmt::Display;

use owo_colors::OwoColorize;

use scriptsense_core::histogram::ConfidenceHistogram;
use scriptsense_core::job::JobResult;
use scriptsense_core::languages;
use scriptsense_core::results::review_hint;

/// Width of the longest histogram bar, in cells.
const BAR_WIDTH: usize = 40;

/// Terminal printer that can switch colors off.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    color: bool,
}

impl Output {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, s: impl Display, f: impl Fn(&str) -> String) -> String {
        let s = s.to_string();
        if self.color { f(&s) } else { s }
    }

    pub fn green(&self, s: impl Display) -> String {
        self.paint(s, |s| s.green().to_string())
    }

    pub fn yellow(&self, s: impl Display) -> String {
        self.paint(s, |s| s.yellow().to_string())
    }

    pub fn red(&self, s: impl Display) -> String {
        self.paint(s, |s| s.red().to_string())
    }

    pub fn cyan(&self, s: impl Display) -> String {
        self.paint(s, |s| s.cyan().to_string())
    }

    pub fn bold(&self, s: impl Display) -> String {
        self.paint(s, |s| s.bold().to_string())
    }

    pub fn dim(&self, s: impl Display) -> String {
        self.paint(s, |s| s.dimmed().to_string())
    }

    pub fn success(&self, msg: impl Display) {
        println!("{} {}", self.green("✓"), msg);
    }

    pub fn warn(&self, msg: impl Display) {
        eprintln!("{} {}", self.yellow("!"), msg);
    }

    pub fn heading(&self, title: &str) {
        println!();
        println!("{}", self.bold(title));
    }

    pub fn histogram(&self, histogram: &ConfidenceHistogram) {
        for line in histogram_lines(histogram) {
            println!("  {}", self.cyan(line));
        }
    }

    /// Print the result view for a finished job.
    pub fn job_result(&self, result: &JobResult) {
        let stats = &result.stats;
        self.heading("Document");
        println!(
            "  Language:   {}",
            languages::display_name(result.source_language())
        );
        if let Some(c) = result.confidence {
            println!("  Confidence: {}", percent(c));
        }
        println!(
            "  Words: {}  Characters: {}  Lines: {}  Pages: {}",
            stats.word_count,
            stats.char_count(true),
            stats.line_count,
            stats.page_count
        );

        let metrics = &result.confidence_metrics;
        let quality = [
            ("Document quality", metrics.document_quality),
            ("Handwriting clarity", metrics.handwriting_clarity),
            ("Text recognition", metrics.text_recognition),
        ];
        if quality.iter().any(|(_, v)| v.is_some()) {
            self.heading("Confidence");
            for (label, value) in quality {
                if let Some(v) = value {
                    println!("  {label:<20} {}", percent(v));
                }
            }
        }

        if !result.word_confidence_scores.is_empty() {
            self.heading("Word confidence");
            self.histogram(&ConfidenceHistogram::from_scores(
                &result.word_confidence_scores,
            ));
        }
        if let Some(hint) = review_hint(result.low_conf_count) {
            println!();
            self.warn(hint);
        }

        self.heading("Extracted text");
        println!("{}", result.extracted_text);
        self.heading("Translated text");
        println!("{}", result.translated_text);

        let links = [
            ("extracted pdf", &result.download_extracted_pdf),
            ("extracted docx", &result.download_extracted_docx),
            ("translated pdf", &result.download_translated_pdf),
            ("translated docx", &result.download_translated_docx),
        ];
        if links.iter().any(|(_, l)| l.is_some()) {
            self.heading("Downloads");
            for (label, link) in links {
                if let Some(link) = link {
                    println!("  {label:<16} {}", self.dim(link));
                }
            }
        }
    }
}

/// Scores are fractions; render 0.873 as `87.3%`.
pub fn percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// One `label count bar` row per bucket, bars scaled to the largest bucket.
pub fn histogram_lines(histogram: &ConfidenceHistogram) -> Vec<String> {
    let max = histogram.max_count();
    histogram
        .buckets()
        .map(|(label, count)| {
            let width = if max == 0 {
                0
            } else {
                (count * BAR_WIDTH).div_ceil(max)
            };
            format!("{label:>8} {count:>5} {}", "█".repeat(width))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_scale_to_largest_bucket() {
        let h = ConfidenceHistogram::from_scores(&[0.1, 0.3, 0.7, 0.9, 0.95]);
        let lines = histogram_lines(&h);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("   0-20%     1 "));
        assert_eq!(lines[2].matches('█').count(), 0);
        assert_eq!(lines[4].matches('█').count(), BAR_WIDTH);
        assert_eq!(lines[0].matches('█').count(), BAR_WIDTH / 2);
    }

    #[test]
    fn empty_histogram_has_no_bars() {
        let lines = histogram_lines(&ConfidenceHistogram::from_scores(&[]));
        assert!(lines.iter().all(|l| !l.contains('█')));
    }

    #[test]
    fn plain_output_has_no_escapes() {
        let out = Output::new(false);
        assert_eq!(out.green("ok"), "ok");
        assert!(Output::new(true).green("ok").contains("\x1b["));
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(percent(0.873), "87.3%");
        assert_eq!(percent(1.0), "100.0%");
    }
}
