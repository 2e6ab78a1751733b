//! Markdown / MDX to plain-text document parsing

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

use crate::search::{Document, SearchError, SearchResult};

/// Turns raw document content into a [`Document`]
pub trait DocumentParser: Send + Sync {
    fn parse(&self, raw: &str, id: &str) -> SearchResult<Document>;
}

static MDX_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{/\*.*?\*/\}").expect("valid MDX comment pattern"));
static BLANK_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*(\n[ \t]*)+").expect("valid blank line pattern"));

/// Markdown parser with MDX awareness.
///
/// Front matter supplies `title` and `description`; without a front matter
/// title the first heading is used. HTML / JSX, MDX comments and top-level
/// `import` / `export` statements are dropped. Everything else, headings
/// and code included, ends up in the body as plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentParser for MarkdownParser {
    fn parse(&self, raw: &str, id: &str) -> SearchResult<Document> {
        let source = strip_mdx_statements(&MDX_COMMENT.replace_all(raw, ""));

        let mut options = Options::empty();
        options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let mut front_matter = String::new();
        let mut in_front_matter = false;
        let mut first_heading: Option<String> = None;
        let mut heading_text = String::new();
        let mut in_heading = false;
        let mut body = String::new();

        for event in Parser::new_ext(&source, options) {
            match event {
                Event::Start(Tag::MetadataBlock(_)) => in_front_matter = true,
                Event::End(TagEnd::MetadataBlock(_)) => in_front_matter = false,
                Event::Start(Tag::Heading { .. }) => {
                    in_heading = true;
                    heading_text.clear();
                }
                Event::End(TagEnd::Heading(_)) => {
                    in_heading = false;
                    let heading = heading_text.trim();
                    if first_heading.is_none() && !heading.is_empty() {
                        first_heading = Some(heading.to_string());
                    }
                    body.push_str(heading);
                    body.push_str("\n\n");
                }
                Event::Text(text) | Event::Code(text) => {
                    if in_front_matter {
                        front_matter.push_str(&text);
                    } else if in_heading {
                        heading_text.push_str(&text);
                    } else {
                        body.push_str(&text);
                    }
                }
                Event::SoftBreak | Event::HardBreak => {
                    if in_heading {
                        heading_text.push(' ');
                    } else {
                        body.push('\n');
                    }
                }
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::CodeBlock)
                | Event::End(TagEnd::Table) => body.push_str("\n\n"),
                Event::End(TagEnd::Item)
                | Event::End(TagEnd::TableHead)
                | Event::End(TagEnd::TableRow) => body.push('\n'),
                Event::End(TagEnd::TableCell) => body.push(' '),
                _ => {}
            }
        }

        let (fm_title, description) = parse_front_matter(&front_matter);
        let title = fm_title.or(first_heading);
        let body = BLANK_RUNS.replace_all(body.trim(), "\n\n").into_owned();

        if title.is_none() && body.is_empty() {
            return Err(SearchError::Parse {
                path: id.to_string(),
                message: "document has no title and no text".to_string(),
            });
        }

        Ok(Document::new(id, title, description, body))
    }
}

/// Remove MDX `import` / `export` lines outside fenced code
fn strip_mdx_statements(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_fence = false;

    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        let is_statement = !in_fence
            && !line.starts_with(char::is_whitespace)
            && (trimmed.starts_with("import ") || trimmed.starts_with("export "));
        if !is_statement {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Pull `title` and `description` out of YAML-style `key: value` lines
fn parse_front_matter(front_matter: &str) -> (Option<String>, Option<String>) {
    let mut title = None;
    let mut description = None;

    for line in front_matter.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = unquote(value.trim());
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "title" => title = Some(value.to_string()),
            "description" => description = Some(value.to_string()),
            _ => {}
        }
    }
    (title, description)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
