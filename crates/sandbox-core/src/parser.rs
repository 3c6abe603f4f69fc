//! Stage one of the pipeline: turn raw skill Markdown into a [`ParsedData`]
//! record. Pure function, no I/O.
//!
//! Grounded on the frontmatter-delimiter scan and heading walk in
//! `skill_md.rs`, generalized here: instead of extracting
//! tool-documentation sections, the body is scanned against fixed
//! keyword-regex tables for tools, frameworks, and dependencies.

use crate::errors::ParseError;
use crate::types::ParsedData;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// `parse(raw) -> Parsed | error`.
pub fn parse(raw: &str) -> Result<ParsedData, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyContent);
    }

    let (frontmatter, body) = extract_frontmatter(trimmed)?;

    let sections = enumerate_headings(&body);
    let mentioned_tools = scan_table(&body, &TOOL_PATTERNS);
    let mentioned_frameworks = scan_table(&body, &FRAMEWORK_PATTERNS);
    let mut mentioned_dependencies = scan_table(&body, &DEPENDENCY_PATTERNS);
    for captured in scan_proper_noun_dependencies(&body) {
        if !mentioned_dependencies.contains(&captured) {
            mentioned_dependencies.push(captured);
        }
    }

    let name = frontmatter_string(&frontmatter, "name").unwrap_or_else(|| first_heading(&body));
    let description = frontmatter_string(&frontmatter, "description").unwrap_or_default();

    Ok(ParsedData {
        name,
        description,
        frontmatter,
        sections,
        mentioned_tools,
        mentioned_frameworks,
        mentioned_dependencies,
        raw_guidelines: body.trim().to_string(),
    })
}

/// Split on a line consisting of exactly `---`. Opening delimiter present
/// but no closing one is `invalid_frontmatter`; a non-mapping YAML document
/// between the delimiters falls back to empty frontmatter with the original
/// content as body (not an error); a YAML decode failure is
/// `invalid_frontmatter`.
fn extract_frontmatter(
    content: &str,
) -> Result<(HashMap<String, serde_yaml::Value>, String), ParseError> {
    if !content.starts_with("---") {
        return Ok((HashMap::new(), content.to_string()));
    }

    let after_first = &content[3..];
    let end_pos = match after_first.find("\n---") {
        Some(pos) => pos,
        None => {
            return Err(ParseError::InvalidFrontmatter(
                "opening --- present but no closing --- found".to_string(),
            ))
        }
    };

    let yaml_text = after_first[..end_pos].trim();
    let body_start = 3 + end_pos + 4;
    let body = if body_start < content.len() {
        content[body_start..].trim().to_string()
    } else {
        String::new()
    };

    // A safe loader: serde_yaml never constructs arbitrary Rust types from
    // tags, it only ever decodes into the requested shape.
    let value: serde_yaml::Value = match serde_yaml::from_str(yaml_text) {
        Ok(v) => v,
        Err(e) => return Err(ParseError::InvalidFrontmatter(e.to_string())),
    };

    match value {
        serde_yaml::Value::Mapping(map) => {
            let mut frontmatter = HashMap::with_capacity(map.len());
            for (k, v) in map {
                if let Some(key) = k.as_str() {
                    frontmatter.insert(key.to_string(), v);
                }
            }
            Ok((frontmatter, body))
        }
        // Decoded to something other than a mapping: proceed with empty
        // frontmatter and the *original* content as body.
        _ => Ok((HashMap::new(), content.to_string())),
    }
}

fn frontmatter_string(frontmatter: &HashMap<String, serde_yaml::Value>, key: &str) -> Option<String> {
    frontmatter.get(key).and_then(|v| match v {
        serde_yaml::Value::String(s) => Some(s.clone()),
        _ => None,
    })
}

fn first_heading(body: &str) -> String {
    for line in body.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("# ") {
            return rest.trim().to_string();
        }
    }
    String::new()
}

/// Enumerate `##`/`###` headings in body order, de-duplicated.
fn enumerate_headings(body: &str) -> Vec<String> {
    use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

    let mut sections = Vec::new();
    let mut collecting = false;
    let mut current = String::new();
    let mut relevant = false;

    for event in Parser::new(body) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                relevant = matches!(level, HeadingLevel::H2 | HeadingLevel::H3);
                collecting = relevant;
                current.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                if collecting {
                    let heading = current.trim().to_string();
                    if !heading.is_empty() && !sections.contains(&heading) {
                        sections.push(heading);
                    }
                }
                collecting = false;
                relevant = false;
            }
            Event::Text(text) | Event::Code(text) if collecting && relevant => {
                current.push_str(&text);
            }
            _ => {}
        }
    }

    sections
}

struct KeywordPattern {
    regex: Regex,
    canonical: &'static str,
}

fn build_table(pairs: &[(&'static str, &'static str)]) -> Vec<KeywordPattern> {
    pairs
        .iter()
        .map(|(pattern, canonical)| KeywordPattern {
            regex: Regex::new(pattern).expect("static keyword regex must compile"),
            canonical,
        })
        .collect()
}

static TOOL_PATTERNS: Lazy<Vec<KeywordPattern>> = Lazy::new(|| {
    build_table(&[
        (r"(?i)\bsearch the web\b|\bweb search\b|\bsearch online\b", "web_search"),
        (r"(?i)\brun (shell|bash) commands?\b|\bcli\b|\bcommand[- ]line\b|\bexecute (shell|bash) commands?\b", "cli_execution"),
        (r"(?i)\bread files?\b|\bfile system\b", "file_read"),
        (r"(?i)\bwrite files?\b", "file_write"),
        (r"(?i)\bhttp requests?\b|\brest api\b", "http_request"),
    ])
});

static FRAMEWORK_PATTERNS: Lazy<Vec<KeywordPattern>> = Lazy::new(|| {
    build_table(&[
        (r"(?i)\breact\b", "React"),
        (r"(?i)\bnode\.?js\b", "Node.js"),
        (r"(?i)\bnext\.?js\b", "Next.js"),
        (r"(?i)\bvue(\.js)?\b", "Vue"),
        (r"(?i)\bdjango\b", "Django"),
        (r"(?i)\bflask\b", "Flask"),
        (r"(?i)\bfastapi\b", "FastAPI"),
        (r"(?i)\bexpress(\.js)?\b", "Express"),
        (r"(?i)\bspring boot\b", "Spring Boot"),
        (r"(?i)\brails\b", "Rails"),
    ])
});

static DEPENDENCY_PATTERNS: Lazy<Vec<KeywordPattern>> = Lazy::new(|| {
    build_table(&[
        (r"(?i)\bpostgres(ql)?\b", "PostgreSQL"),
        (r"(?i)\bredis\b", "Redis"),
        (r"(?i)\bdocker\b", "Docker"),
        (r"(?i)\bsqlite\b", "SQLite"),
        (r"(?i)\bmongodb\b", "MongoDB"),
    ])
});

fn scan_table(body: &str, table: &[KeywordPattern]) -> Vec<String> {
    let mut found = Vec::new();
    for entry in table {
        if entry.regex.is_match(body) && !found.iter().any(|f| f == entry.canonical) {
            found.push(entry.canonical.to_string());
        }
    }
    found
}

/// `<ProperNoun> (library|package|framework)` phrases, e.g. "the Lodash
/// library" or "a Tailwind package", captured into `mentioned_dependencies`.
static PROPER_NOUN_DEPENDENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Z][A-Za-z0-9]*(?:\.[a-z]+)?)\s+(?:library|package|framework)\b")
        .expect("static proper-noun regex must compile")
});

fn scan_proper_noun_dependencies(body: &str) -> Vec<String> {
    let mut found = Vec::new();
    for capture in PROPER_NOUN_DEPENDENCY.captures_iter(body) {
        let name = capture[1].to_string();
        if !found.contains(&name) {
            found.push(name);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_fails() {
        assert_eq!(parse("   \n  "), Err(ParseError::EmptyContent));
    }

    #[test]
    fn no_frontmatter_uses_first_heading() {
        let parsed = parse("# My Skill\n\nSome body text.").unwrap();
        assert_eq!(parsed.name, "My Skill");
        assert!(parsed.frontmatter.is_empty());
    }

    #[test]
    fn frontmatter_round_trips_name_and_description() {
        let doc = "---\nname: demo-skill\ndescription: |\n  line one\n  line two\n---\n\n## Tools\nbody";
        let parsed = parse(doc).unwrap();
        assert_eq!(parsed.name, "demo-skill");
        assert_eq!(parsed.description, "line one\nline two\n");
        assert_eq!(parsed.sections, vec!["Tools".to_string()]);
    }

    #[test]
    fn opening_delimiter_without_closing_is_invalid_frontmatter() {
        let doc = "---\nname: broken\n\nno closing delimiter here";
        let err = parse(doc).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFrontmatter(_)));
    }

    #[test]
    fn s1_happy_path_mentions() {
        let doc = "# Agent\n\nUse React and Node.js; search the web for docs; run shell commands.";
        let parsed = parse(doc).unwrap();
        assert!(parsed.mentioned_frameworks.contains(&"React".to_string()));
        assert!(parsed.mentioned_frameworks.contains(&"Node.js".to_string()));
        assert!(parsed.mentioned_tools.contains(&"web_search".to_string()));
        assert!(parsed.mentioned_tools.contains(&"cli_execution".to_string()));
    }

    #[test]
    fn mentions_are_duplicate_free() {
        let doc = "React React react REACT. Use React again.";
        let parsed = parse(doc).unwrap();
        assert_eq!(
            parsed.mentioned_frameworks.iter().filter(|f| *f == "React").count(),
            1
        );
    }

    #[test]
    fn proper_noun_dependency_phrase_is_captured() {
        let parsed = parse("This skill depends on the Lodash library for utilities.").unwrap();
        assert!(parsed.mentioned_dependencies.contains(&"Lodash".to_string()));
    }
}
