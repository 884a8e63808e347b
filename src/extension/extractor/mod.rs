//! Problem-page extraction.
//!
//! Each scalar field is read through an ordered chain of strategies; the first
//! strategy that yields a non-empty value wins and the field default applies
//! otherwise. Extraction never fails: a page with nothing recognisable still
//! produces a snapshot, and the defaulted fields are only logged.

pub mod strategy;

pub use crate::api::DEFAULT_DIFFICULTY;
use serde::{Deserialize, Serialize};
use strategy::{
    DocumentTitle, EditorLines, ExtractionStrategy, Field, KnownLanguageText, LanguageClass,
    ParsedPage, SelectorAttr, SelectorText, UrlSlug, collapse_whitespace, element_text,
};

pub const DEFAULT_TITLE: &str = "Unknown Problem";

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"div[data-track-load="description_content"]"#,
    r#"div[data-cy="description"]"#,
    ".question-content__1YGF",
    ".question-content__JfgR",
];

const SCOPED_CONSTRAINT_SELECTORS: &[&str] = &[
    r#"div[data-track-load="description_content"] ul li"#,
    r#"div[data-cy="description"] ul li"#,
    ".question-content__1YGF ul li",
];

/// What the page context was handed: a URL and the page's HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    pub output: String,
}

/// Everything the panel needs to describe the problem being solved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemSnapshot {
    pub title: String,
    pub difficulty: String,
    pub description: String,
    pub examples: Vec<Example>,
    pub constraints: Vec<String>,
    pub code: String,
    pub language: String,
    pub source_url: String,
}

/// Reply to `getCodeAndExamples`: the editor state without the prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeAndExamples {
    pub code: String,
    pub language: String,
    pub examples: Vec<Example>,
}

impl From<ProblemSnapshot> for CodeAndExamples {
    fn from(snapshot: ProblemSnapshot) -> Self {
        Self {
            code: snapshot.code,
            language: snapshot.language,
            examples: snapshot.examples,
        }
    }
}

type Chain = Vec<Box<dyn ExtractionStrategy>>;

/// Ordered strategy chains for every scalar field.
pub struct PageExtractor {
    title: Chain,
    difficulty: Chain,
    description: Chain,
    code: Chain,
    language: Chain,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self {
            title: vec![
                Box::new(SelectorText(&[
                    r#"div[data-cy="question-title"]"#,
                    ".text-title-large a",
                    ".text-title-large",
                ])),
                Box::new(DocumentTitle),
                Box::new(UrlSlug),
            ],
            difficulty: vec![
                Box::new(SelectorText(&["div[diff]"])),
                Box::new(SelectorAttr {
                    selector: "div[data-difficulty]",
                    attr: "data-difficulty",
                }),
                Box::new(SelectorText(&[
                    ".text-difficulty-easy",
                    ".text-difficulty-medium",
                    ".text-difficulty-hard",
                ])),
            ],
            description: vec![Box::new(SelectorText(DESCRIPTION_SELECTORS))],
            code: vec![
                Box::new(EditorLines(&[
                    ".monaco-editor .view-lines .view-line",
                    ".CodeMirror-code .CodeMirror-line",
                ])),
                Box::new(SelectorText(&["textarea"])),
                Box::new(SelectorText(&["pre"])),
            ],
            language: vec![
                Box::new(SelectorAttr {
                    selector: ".monaco-editor[data-language]",
                    attr: "data-language",
                }),
                Box::new(KnownLanguageText(&[
                    ".ant-select-selection-item",
                    ".lang-select .selected",
                    r#"button[id^="headlessui-popover-button"]"#,
                ])),
                Box::new(LanguageClass),
            ],
        }
    }
}

impl PageExtractor {
    pub fn extract(&self, page: &PageSnapshot) -> ProblemSnapshot {
        let parsed = ParsedPage::parse(&page.url, &page.html);
        let mut defaulted = Vec::new();

        let mut resolve = |field: Field, chain: &Chain, default: &str| {
            run_chain(&parsed, field, chain).unwrap_or_else(|| {
                defaulted.push(field.name());
                default.to_string()
            })
        };

        let title = resolve(Field::Title, &self.title, DEFAULT_TITLE);
        let difficulty = resolve(Field::Difficulty, &self.difficulty, DEFAULT_DIFFICULTY);
        let description = resolve(Field::Description, &self.description, "");
        let code = resolve(Field::Code, &self.code, "");
        let language = resolve(Field::Language, &self.language, "");

        let examples = collect_examples(&parsed);
        let constraints = collect_constraints(&parsed);

        if !defaulted.is_empty() {
            tracing::debug!(url = %page.url, ?defaulted, "problem extraction degraded");
        }

        ProblemSnapshot {
            title,
            difficulty,
            description,
            examples,
            constraints,
            code,
            language,
            source_url: page.url.clone(),
        }
    }
}

fn run_chain(page: &ParsedPage, field: Field, chain: &Chain) -> Option<String> {
    chain.iter().find_map(|strategy| {
        let value = strategy.try_extract(page, field);
        if value.is_some() {
            tracing::trace!(field = field.name(), strategy = strategy.name(), "field extracted");
        }
        value
    })
}

/// Extract a snapshot with the default strategy chains.
pub fn extract_problem_data(page: &PageSnapshot) -> ProblemSnapshot {
    PageExtractor::default().extract(page)
}

/// Extract only the editor code, language and examples.
pub fn extract_code_and_examples(page: &PageSnapshot) -> CodeAndExamples {
    extract_problem_data(page).into()
}

fn collect_examples(page: &ParsedPage) -> Vec<Example> {
    let blocks = page
        .select_all("pre")
        .iter()
        .map(|el| element_text(el).trim().to_string())
        .collect::<Vec<_>>();

    let mut examples = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        let Some(rest) = block.strip_prefix("Input:") else {
            continue;
        };
        let example = match rest.split_once("Output:") {
            Some((input, output)) => Example {
                input: input.trim().to_string(),
                output: strip_explanation(output).to_string(),
            },
            None => Example {
                input: rest.trim().to_string(),
                output: blocks.get(index + 1).cloned().unwrap_or_default(),
            },
        };
        examples.push(example);
    }
    examples
}

fn strip_explanation(output: &str) -> &str {
    output
        .split_once("Explanation:")
        .map_or(output, |(head, _)| head)
        .trim()
}

fn collect_constraints(page: &ParsedPage) -> Vec<String> {
    SCOPED_CONSTRAINT_SELECTORS
        .iter()
        .chain(std::iter::once(&"ul li"))
        .map(|selector| {
            page.select_all(selector)
                .iter()
                .map(|li| collapse_whitespace(&element_text(li)))
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
        })
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}
