//! Document transform: course markdown → structured course data.
//!
//! A course source is one markdown file: a leading `#` heading naming the
//! course, then one `##` heading per lesson. Translation markers are
//! resolved for the requested locale before parsing, so lesson titles and
//! bodies come out already localized.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use assetforge_shared::{AssetForgeError, Catalog, CourseRef, Locale, Result};

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w*)\n(.*?)```").unwrap());
static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static EM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());

/// One lesson within a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    /// Localized lesson title.
    pub title: String,
    /// URL-safe slug derived from the title.
    pub slug: String,
    /// Rendered lesson body (HTML).
    pub body: String,
}

/// Structured course data, serialized to one JSON document per
/// (course, locale) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseData {
    /// Course identifier (content subdirectory name).
    pub id: String,
    /// Localized course title from the leading heading.
    pub title: String,
    /// Locale tag this variant was compiled for.
    pub locale: Locale,
    /// Lessons in source order.
    pub lessons: Vec<Lesson>,
}

/// Compile one course for one locale.
#[instrument(skip(catalog), fields(course = %course.id, locale = %locale))]
pub fn compile_course(
    course: &CourseRef,
    locale: &Locale,
    catalog: &Catalog,
) -> Result<CourseData> {
    let source = course.source_file();
    let raw =
        std::fs::read_to_string(&source).map_err(|e| AssetForgeError::io(&source, e))?;
    let localized = catalog.apply(&raw, locale);

    let mut title = String::new();
    let mut lessons: Vec<Lesson> = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in localized.lines() {
        if let Some(heading) = line.strip_prefix("## ") {
            if let Some((lesson_title, body)) = current.take() {
                lessons.push(finish_lesson(lesson_title, body));
            }
            current = Some((heading.trim().to_string(), Vec::new()));
        } else if let Some(heading) = line.strip_prefix("# ") {
            if title.is_empty() {
                title = heading.trim().to_string();
            }
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line.to_string());
        }
    }
    if let Some((lesson_title, body)) = current.take() {
        lessons.push(finish_lesson(lesson_title, body));
    }

    if title.is_empty() {
        return Err(AssetForgeError::transform(
            &source,
            "course has no top-level heading",
        ));
    }

    Ok(CourseData {
        id: course.id.clone(),
        title,
        locale: locale.clone(),
        lessons,
    })
}

fn finish_lesson(title: String, body_lines: Vec<String>) -> Lesson {
    let slug = slugify(&title);
    let body = render_markdown(&body_lines.join("\n"));
    Lesson { title, slug, body }
}

/// Lowercased, hyphen-separated, ASCII-alphanumeric slug.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_hyphen = true;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

/// Minimal markdown-to-HTML rendering: fenced code, paragraphs, inline
/// code/bold/emphasis, links. Enough for lesson bodies; anything richer
/// passes through as text.
fn render_markdown(markdown: &str) -> String {
    // Fenced code first, shielded from inline processing via placeholders.
    let mut fences: Vec<String> = Vec::new();
    let shielded = FENCE_RE.replace_all(markdown, |caps: &regex::Captures<'_>| {
        let lang = &caps[1];
        let class = if lang.is_empty() {
            String::new()
        } else {
            format!(" class=\"language-{lang}\"")
        };
        fences.push(format!(
            "<pre><code{class}>{}</code></pre>",
            escape_html(caps[2].trim_end())
        ));
        format!("\u{2}{}\u{2}", fences.len() - 1)
    });

    let mut html = String::new();
    for block in shielded.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        if let Some(idx) = block
            .strip_prefix('\u{2}')
            .and_then(|rest| rest.strip_suffix('\u{2}'))
            .and_then(|n| n.parse::<usize>().ok())
        {
            html.push_str(&fences[idx]);
            html.push('\n');
            continue;
        }
        html.push_str("<p>");
        html.push_str(&render_inline(&block.replace('\n', " ")));
        html.push_str("</p>\n");
    }

    html
}

fn render_inline(text: &str) -> String {
    let text = INLINE_CODE_RE.replace_all(text, "<code>$1</code>");
    let text = BOLD_RE.replace_all(&text, "<strong>$1</strong>");
    let text = EM_RE.replace_all(&text, "<em>$1</em>");
    LINK_RE
        .replace_all(&text, "<a href=\"$2\">$1</a>")
        .into_owned()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_fixture(markdown: &str) -> (tempfile::TempDir, CourseRef) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("css-basics");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.md"), markdown).unwrap();
        (tmp, CourseRef::new("css-basics", dir))
    }

    #[test]
    fn parses_title_and_lessons() {
        let (_tmp, course) = course_fixture(
            "# CSS Basics\n\n## Selectors\n\nPick elements with `h1`.\n\n## The Box Model\n\nEvery box has **four** edges.\n",
        );

        let data =
            compile_course(&course, &Locale::new("en"), &Catalog::default()).unwrap();
        assert_eq!(data.title, "CSS Basics");
        assert_eq!(data.lessons.len(), 2);
        assert_eq!(data.lessons[0].slug, "selectors");
        assert_eq!(data.lessons[1].slug, "the-box-model");
        assert!(data.lessons[0].body.contains("<code>h1</code>"));
        assert!(data.lessons[1].body.contains("<strong>four</strong>"));
    }

    #[test]
    fn translation_markers_resolve_per_locale() {
        let (_tmp, course) =
            course_fixture("# <<course.title>>\n\n## <<lesson.intro>>\n\nBody.\n");

        let mut catalog = Catalog::default();
        catalog.insert(Locale::new("fr"), "course.title", "Bases de CSS");
        catalog.insert(Locale::new("fr"), "lesson.intro", "Introduction");

        let fr = compile_course(&course, &Locale::new("fr"), &catalog).unwrap();
        assert_eq!(fr.title, "Bases de CSS");
        assert_eq!(fr.lessons[0].title, "Introduction");

        // Unknown locale silently falls back to raw keys.
        let de = compile_course(&course, &Locale::new("de"), &catalog).unwrap();
        assert_eq!(de.title, "course.title");
    }

    #[test]
    fn fenced_code_is_escaped_and_shielded() {
        let (_tmp, course) = course_fixture(
            "# T\n\n## L\n\n```html\n<b>bold & brash</b>\n```\n\nAfter *code*.\n",
        );

        let data =
            compile_course(&course, &Locale::new("en"), &Catalog::default()).unwrap();
        let body = &data.lessons[0].body;
        assert!(body.contains("<pre><code class=\"language-html\">&lt;b&gt;bold &amp; brash&lt;/b&gt;</code></pre>"));
        assert!(body.contains("<em>code</em>"));
    }

    #[test]
    fn missing_title_is_a_transform_error() {
        let (_tmp, course) = course_fixture("## Lesson only\n\nBody.\n");
        let err =
            compile_course(&course, &Locale::new("en"), &Catalog::default()).unwrap_err();
        assert!(err.to_string().contains("no top-level heading"));
    }

    #[test]
    fn course_data_serializes_to_json() {
        let (_tmp, course) = course_fixture("# T\n\n## L\n\nBody.\n");
        let data =
            compile_course(&course, &Locale::new("en"), &Catalog::default()).unwrap();
        let json = serde_json::to_string_pretty(&data).unwrap();
        let parsed: CourseData = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "css-basics");
        assert_eq!(parsed.lessons.len(), 1);
    }
}
