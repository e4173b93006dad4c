//! Literature review parsing
//!
//! Splits a model-written review into its labelled sections. Labels are
//! matched loosely (`**Methodology:**`, `- **Dataset**:`, `## Results`) so
//! small formatting drift between models still parses. Only labels at the
//! outermost indentation start a section; nested bullets stay part of the
//! section they sit in.

use paperlens_common::models::LiteratureReview;
use regex_lite::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Year,
    Methodology,
    Dataset,
    Results,
    FutureWork,
    Insights,
    MissingSections,
}

impl Section {
    fn from_label(label: &str) -> Option<Self> {
        let label = label.to_ascii_lowercase();
        if label.contains("missing") {
            Some(Section::MissingSections)
        } else if label.contains("title") {
            Some(Section::Title)
        } else if label.contains("year") {
            Some(Section::Year)
        } else if label.contains("methodolog") {
            Some(Section::Methodology)
        } else if label.contains("dataset") || label.contains("data set") {
            Some(Section::Dataset)
        } else if label.contains("result") {
            Some(Section::Results)
        } else if label.contains("future") || label.contains("gap") {
            Some(Section::FutureWork)
        } else if label.contains("insight") {
            Some(Section::Insights)
        } else {
            None
        }
    }
}

fn header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^([ \t]*)(?:[-*+][ \t]+)?(?:\*\*([^*\n]{2,60}?)\*\*|#{1,6}[ \t]+([^\n#]{2,60}?)[ \t]*$)[ \t]*:?")
            .expect("section header pattern is valid")
    })
}

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(1[89]\d{2}|20\d{2})\b").expect("year pattern is valid"))
}

/// Parse a review into its sections
pub fn parse_review(text: &str) -> LiteratureReview {
    // (section, content start, header start) for each recognised header
    let mut headers: Vec<(Section, usize, usize)> = Vec::new();
    let mut outer_indent: Option<usize> = None;
    for caps in header_pattern().captures_iter(text) {
        let label = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        let Some(section) = label.and_then(|l| Section::from_label(l.trim().trim_end_matches(':')))
        else {
            continue;
        };

        let indent = caps.get(1).map_or(0, |m| indent_width(m.as_str()));
        let outer = *outer_indent.get_or_insert(indent);
        if indent > outer {
            continue;
        }
        headers.push((section, whole.end(), whole.start()));
    }

    let mut review = LiteratureReview::default();
    for (i, (section, start, _)) in headers.iter().enumerate() {
        let end = headers.get(i + 1).map_or(text.len(), |(_, _, next)| *next);
        let content = clean_section(&text[*start..end]);
        if content.is_empty() {
            continue;
        }

        let slot = match section {
            Section::Title => &mut review.title,
            Section::Year => {
                if review.year.is_none() {
                    review.year = parse_year(&content);
                }
                continue;
            }
            Section::Methodology => &mut review.methodology,
            Section::Dataset => &mut review.dataset,
            Section::Results => &mut review.results,
            Section::FutureWork => &mut review.future_work,
            Section::Insights => &mut review.insights,
            Section::MissingSections => &mut review.missing_sections,
        };
        if slot.is_none() {
            *slot = Some(content);
        }
    }

    if let Some(title) = review.title.take() {
        let title = title
            .lines()
            .next()
            .unwrap_or_default()
            .trim_matches(|c: char| c == '"' || c == '*' || c == '_' || c.is_whitespace())
            .to_string();
        review.title = Some(title).filter(|t| !t.is_empty());
    }

    review.missing_fields = missing_fields(&review);
    review
}

fn indent_width(whitespace: &str) -> usize {
    whitespace.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum()
}

fn parse_year(content: &str) -> Option<i32> {
    year_pattern()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn clean_section(raw: &str) -> String {
    raw.trim()
        .trim_start_matches(':')
        .trim()
        .to_string()
}

fn missing_fields(review: &LiteratureReview) -> Vec<String> {
    let fields = [
        ("title", review.title.is_some()),
        ("year", review.year.is_some()),
        ("methodology", review.methodology.is_some()),
        ("dataset", review.dataset.is_some()),
        ("results", review.results.is_some()),
        ("future_work", review.future_work.is_some()),
        ("insights", review.insights.is_some()),
    ];
    fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REVIEW: &str = "**Literature Review Structure**\n\
- **Title of the Paper:** \"Attention Is All You Need\"\n\
- **Year of the Paper:** Published at NeurIPS 2017.\n\
- **Methodology:** A transformer built solely on attention.\n\
- **Dataset:** WMT 2014 English-German, about 4.5M sentence pairs.\n\
- **Results:** 28.4 BLEU.\n\
  - **BLEU** beats prior ensembles.\n\
- **Future Work/Research Gaps:** Apply attention to images and audio.\n\
- **Insights:** Parallelism shortens training.\n\
- **Missing Sections:** None.\n";

    #[test]
    fn test_parses_all_sections() {
        let review = parse_review(FULL_REVIEW);

        assert_eq!(review.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(review.year, Some(2017));
        assert_eq!(
            review.methodology.as_deref(),
            Some("A transformer built solely on attention.")
        );
        assert!(review.dataset.as_deref().unwrap().contains("WMT 2014"));
        assert!(review.results.as_deref().unwrap().contains("beats prior ensembles"));
        assert!(review.future_work.as_deref().unwrap().starts_with("Apply attention"));
        assert_eq!(review.missing_sections.as_deref(), Some("None."));
        assert!(review.is_complete());
    }

    #[test]
    fn test_reports_missing_fields() {
        let review = parse_review("**Title:** Graph Nets\n\n**Results:** Strong.\n");
        assert_eq!(review.title.as_deref(), Some("Graph Nets"));
        assert_eq!(
            review.missing_fields,
            vec!["year", "methodology", "dataset", "future_work", "insights"]
        );
    }

    #[test]
    fn test_markdown_headings() {
        let review = parse_review("## Methodology\nSurvey of methods.\n\n## Year\nc. 1998\n");
        assert_eq!(review.methodology.as_deref(), Some("Survey of methods."));
        assert_eq!(review.year, Some(1998));
    }

    #[test]
    fn test_nested_labels_stay_in_their_section() {
        let review = parse_review(concat!(
            "- **Methodology:** Residual networks.\n",
            "  - **Results on CIFAR:** ablation only.\n",
            "- **Dataset:** ImageNet.\n",
            "- **Results:** 3.6% top-5 error.\n",
        ));
        let methodology = review.methodology.as_deref().unwrap();
        assert!(methodology.starts_with("Residual networks."));
        assert!(methodology.contains("Results on CIFAR"));
        assert_eq!(review.dataset.as_deref(), Some("ImageNet."));
        assert_eq!(review.results.as_deref(), Some("3.6% top-5 error."));
    }

    #[test]
    fn test_unstructured_text() {
        let review = parse_review("The paper is about cats.");
        assert!(review.title.is_none());
        assert_eq!(review.missing_fields.len(), 7);
    }
}
