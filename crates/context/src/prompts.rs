//! Prompt templates

/// Review sections in the order the model is asked to produce them
pub const REVIEW_SECTIONS: &[(&str, &str)] = &[
    ("Title of the Paper", "Extract the title"),
    ("Year of the Paper", "Extract the publication year"),
    ("Methodology", "Summarize the methodology used"),
    ("Dataset", "Describe dataset details including size and source"),
    ("Results", "Highlight key results"),
    ("Future Work/Research Gaps", "Identify proposed future work"),
    ("Insights", "Provide additional observations"),
    ("Missing Sections", "If any sections are missing, state them clearly"),
];

fn review_structure() -> String {
    let mut out = String::from("**Literature Review Structure**\n");
    for (label, instruction) in REVIEW_SECTIONS {
        out.push_str(&format!("- **{}:** ({})\n", label, instruction));
    }
    out
}

/// Literature review over (possibly truncated) paper text
pub fn review_prompt(text: &str, truncated: bool) -> String {
    let source = if truncated {
        "Paper text (truncated for analysis)"
    } else {
        "Paper text"
    };
    format!(
        "You are an expert in summarizing and analyzing research papers. \
        Based on the text extracted from a research paper, generate a detailed and structured \
        literature review. Follow this format exactly, using the bold labels shown:\n\n\
        {}\n\
        **{}:**\n{}\n",
        review_structure(),
        source,
        text
    )
}

/// Map step: notes for one section of a long paper
pub fn section_notes_prompt(chunk: &str, index: usize, total: usize) -> String {
    format!(
        "You are reading part {} of {} of a research paper. \
        Write concise notes on anything this part reveals about the paper's title, \
        publication year, methodology, dataset, results and future work. \
        Quote exact numbers where present and skip anything not covered.\n\n\
        **Paper excerpt:**\n{}\n",
        index, total, chunk
    )
}

/// Reduce step: literature review over combined section notes
pub fn review_from_notes_prompt(notes: &str, truncated: bool) -> String {
    let coverage = if truncated {
        " The notes cover only the first sections of the paper."
    } else {
        ""
    };
    format!(
        "You are an expert in summarizing and analyzing research papers. \
        Below are notes taken section by section from a single research paper.{} \
        Generate a detailed and structured literature review from them. \
        Follow this format exactly, using the bold labels shown:\n\n\
        {}\n\
        **Section notes:**\n{}\n",
        coverage,
        review_structure(),
        notes
    )
}

pub const QA_DIRECTIVE: &str = "You are a knowledgeable research assistant with expertise in academic papers. \
Answer the question using the paper and its literature review below as context. \
You may draw on broader expertise to give a comprehensive answer, \
but say so when the paper itself does not cover something.";

pub const COMPARISON_DIRECTIVE: &str = "You are an expert in comparing and analyzing research papers. \
Given the following texts extracted from research papers, provide a comprehensive comparative analysis.";

pub const COMPARISON_INSTRUCTIONS: &str = "Focus on similarities and differences in their methodology, \
dataset, results, and future research directions. Refer to each paper by its label. \
Provide your analysis in a structured, detailed, and easy-to-understand format.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_prompt_lists_every_section() {
        let prompt = review_prompt("body text", true);
        for (label, _) in REVIEW_SECTIONS {
            assert!(prompt.contains(&format!("**{}:**", label)));
        }
        assert!(prompt.contains("truncated for analysis"));
        assert!(prompt.ends_with("body text\n"));
    }

    #[test]
    fn test_notes_prompt_numbers_parts() {
        let prompt = section_notes_prompt("excerpt", 2, 5);
        assert!(prompt.contains("part 2 of 5"));
    }
}
