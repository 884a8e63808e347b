use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Scalar fields of a problem snapshot that have a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Difficulty,
    Description,
    Code,
    Language,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Difficulty => "difficulty",
            Self::Description => "description",
            Self::Code => "code",
            Self::Language => "language",
        }
    }

    /// Clean up a raw value for this field; `None` when nothing is left.
    pub fn normalize(self, raw: &str) -> Option<String> {
        let value = match self {
            Self::Code => raw.trim_end().trim_start_matches('\n').to_string(),
            Self::Difficulty => collapse_whitespace(raw).to_lowercase(),
            Self::Title | Self::Description | Self::Language => collapse_whitespace(raw),
        };
        (!value.trim().is_empty()).then_some(value)
    }
}

/// A parsed page: the document plus the address it was loaded from.
pub struct ParsedPage {
    pub document: Html,
    pub url: Option<Url>,
}

impl ParsedPage {
    pub fn parse(url: &str, html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            url: Url::parse(url).ok(),
        }
    }

    /// Elements matching `selector`, in document order. Bad selectors match nothing.
    pub fn select_all(&self, selector: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(selector) {
            Ok(sel) => self.document.select(&sel).collect(),
            Err(_) => {
                tracing::debug!(selector, "ignoring unparsable selector");
                Vec::new()
            }
        }
    }

    pub fn select_first(&self, selector: &str) -> Option<ElementRef<'_>> {
        let sel = Selector::parse(selector).ok()?;
        self.document.select(&sel).next()
    }
}

pub fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One way of reading a field off a page.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn try_extract(&self, page: &ParsedPage, field: Field) -> Option<String>;
}

/// Text of the first non-empty match among several selectors.
pub struct SelectorText(pub &'static [&'static str]);

impl ExtractionStrategy for SelectorText {
    fn name(&self) -> &'static str {
        "selector_text"
    }

    fn try_extract(&self, page: &ParsedPage, field: Field) -> Option<String> {
        self.0.iter().find_map(|selector| {
            page.select_all(selector)
                .iter()
                .find_map(|el| field.normalize(&element_text(el)))
        })
    }
}

/// Attribute value of the first element matching a selector.
pub struct SelectorAttr {
    pub selector: &'static str,
    pub attr: &'static str,
}

impl ExtractionStrategy for SelectorAttr {
    fn name(&self) -> &'static str {
        "selector_attr"
    }

    fn try_extract(&self, page: &ParsedPage, field: Field) -> Option<String> {
        page.select_all(self.selector)
            .iter()
            .filter_map(|el| el.value().attr(self.attr))
            .find_map(|value| field.normalize(value))
    }
}

/// Editor contents rendered one element per line.
pub struct EditorLines(pub &'static [&'static str]);

impl ExtractionStrategy for EditorLines {
    fn name(&self) -> &'static str {
        "editor_lines"
    }

    fn try_extract(&self, page: &ParsedPage, field: Field) -> Option<String> {
        self.0.iter().find_map(|selector| {
            let lines = page
                .select_all(selector)
                .iter()
                .map(|line| element_text(line).replace('\u{a0}', " "))
                .collect::<Vec<_>>();
            field.normalize(&lines.join("\n"))
        })
    }
}

/// `<title>` with the site suffix removed.
pub struct DocumentTitle;

impl ExtractionStrategy for DocumentTitle {
    fn name(&self) -> &'static str {
        "document_title"
    }

    fn try_extract(&self, page: &ParsedPage, field: Field) -> Option<String> {
        let title = element_text(&page.select_first("title")?);
        let title = title.trim();
        let stripped = title
            .strip_suffix("- LeetCode")
            .or_else(|| title.strip_suffix("- leetcode"))
            .unwrap_or(title);
        field.normalize(stripped)
    }
}

/// Title derived from the `/problems/<slug>/` path segment.
pub struct UrlSlug;

impl ExtractionStrategy for UrlSlug {
    fn name(&self) -> &'static str {
        "url_slug"
    }

    fn try_extract(&self, page: &ParsedPage, field: Field) -> Option<String> {
        let url = page.url.as_ref()?;
        let mut segments = url.path_segments()?;
        segments.find(|s| *s == "problems")?;
        let slug = segments.next().filter(|s| !s.is_empty())?;
        field.normalize(&slug_to_title(slug))
    }
}

/// `two-sum` → `Two Sum`.
pub fn slug_to_title(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const KNOWN_LANGUAGES: &[&str] = &[
    "python",
    "java",
    "c++",
    "javascript",
    "typescript",
    "go",
    "golang",
    "ruby",
    "c#",
    "rust",
    "kotlin",
    "swift",
];

pub fn looks_like_language(text: &str) -> bool {
    text.split_whitespace().any(|word| {
        let word = word.to_lowercase();
        KNOWN_LANGUAGES
            .iter()
            .any(|lang| word == *lang || (lang.len() > 2 && word.starts_with(lang)))
    })
}

/// First selector text that names a known programming language.
pub struct KnownLanguageText(pub &'static [&'static str]);

impl ExtractionStrategy for KnownLanguageText {
    fn name(&self) -> &'static str {
        "known_language_text"
    }

    fn try_extract(&self, page: &ParsedPage, field: Field) -> Option<String> {
        self.0.iter().find_map(|selector| {
            page.select_all(selector)
                .iter()
                .map(element_text)
                .find(|text| looks_like_language(text))
                .and_then(|text| field.normalize(&text))
        })
    }
}

/// `language-xxx` class on highlighted code blocks.
pub struct LanguageClass;

impl ExtractionStrategy for LanguageClass {
    fn name(&self) -> &'static str {
        "language_class"
    }

    fn try_extract(&self, page: &ParsedPage, field: Field) -> Option<String> {
        page.select_all("pre code")
            .iter()
            .flat_map(|el| el.value().classes())
            .find_map(|class| class.strip_prefix("language-"))
            .and_then(|lang| field.normalize(&lang.to_uppercase()))
    }
}
