//! Code block annotation: fence meta, line notations and dual-theme
//! syntax highlighting

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Mutex;
use syntect::highlighting::{Color, Highlighter, Theme, ThemeSet};
use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};

use super::tree::{AnnotatedCode, CodeLine, Diff, Token};
use super::RenderError;

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
    static ref TITLE_RE: Regex = Regex::new(r#"title=(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref LINE_NUMBERS_RE: Regex = Regex::new(r"(?:^|\s)showLineNumbers(?:\s|$)").unwrap();
    static ref NOTATION_COMMENT_RE: Regex = Regex::new(
        r"\s*(?://|#|--|;|/\*|<!--)\s*((?:\[!code [^\]]+\]\s*)+)(?:\*/|-->)?\s*$"
    )
    .unwrap();
    static ref NOTATION_RE: Regex = Regex::new(r"\[!code ([^\]]+)\]").unwrap();
    static ref WARNED_THEMES: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";

/// Look up a bundled theme, falling back to `fallback` with a warning
pub fn resolve_theme(name: &str, fallback: &str) -> Result<&'static Theme, RenderError> {
    if let Some(theme) = THEME_SET.themes.get(name) {
        return Ok(theme);
    }
    if first_miss(name) {
        tracing::warn!("Unknown highlight theme {:?}, using {:?}", name, fallback);
    }
    THEME_SET
        .themes
        .get(fallback)
        .ok_or_else(|| RenderError::Highlight(format!("theme {:?} is not bundled", fallback)))
}

/// True the first time an unknown theme name is seen in this process
fn first_miss(name: &str) -> bool {
    match WARNED_THEMES.lock() {
        Ok(mut seen) => seen.insert(name.to_string()),
        Err(_) => true,
    }
}

/// Names of the bundled themes, sorted
pub fn theme_names() -> Vec<&'static str> {
    THEME_SET.themes.keys().map(String::as_str).collect()
}

/// Parsed fence info string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FenceMeta {
    pub language: String,
    pub title: Option<String>,
    pub line_numbers: bool,
}

impl FenceMeta {
    pub fn parse(info: &str) -> Self {
        let info = info.trim();
        let (first, rest) = info.split_once(char::is_whitespace).unwrap_or((info, ""));

        // `title="x"` alone has no language token
        let (language, meta) = if first.contains('=') {
            ("text", info)
        } else if first.is_empty() {
            ("text", rest)
        } else {
            (first, rest)
        };

        let title = TITLE_RE.captures(meta).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
        });

        Self {
            language: language.to_string(),
            title,
            line_numbers: LINE_NUMBERS_RE.is_match(meta),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mark {
    Diff(Diff),
    Highlight,
    Focus,
    Word(String),
}

#[derive(Debug)]
struct ActiveMark {
    mark: Mark,
    /// Lines left to cover, `None` runs to the end of the block
    remaining: Option<usize>,
}

fn parse_notation(text: &str) -> Option<ActiveMark> {
    let text = text.trim();
    let (mark, remaining) = match text {
        "++" => (Mark::Diff(Diff::Add), Some(1)),
        "--" => (Mark::Diff(Diff::Remove), Some(1)),
        _ => {
            let (name, arg) = text.split_once(':').unwrap_or((text, ""));
            match name {
                "highlight" | "hl" => (Mark::Highlight, Some(count(arg)?)),
                "focus" => (Mark::Focus, Some(count(arg)?)),
                "word" => {
                    let (word, range) = match arg.rsplit_once(':') {
                        Some((word, n)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => {
                            (word, Some(count(n)?))
                        }
                        _ => (arg, None),
                    };
                    if word.is_empty() {
                        return None;
                    }
                    (Mark::Word(word.to_string()), range)
                }
                _ => return None,
            }
        }
    };
    Some(ActiveMark { mark, remaining })
}

fn count(arg: &str) -> Option<usize> {
    if arg.is_empty() {
        Some(1)
    } else {
        arg.parse().ok().filter(|n| *n > 0)
    }
}

/// A source line after notation comments are stripped
#[derive(Debug, Default)]
struct PreparedLine {
    text: String,
    diff: Option<Diff>,
    highlighted: bool,
    focused: bool,
    words: Vec<String>,
}

/// Strip notation comments and resolve which lines they mark.
///
/// A line holding nothing but a notation comment is dropped and its marks
/// start at the next kept line.
fn prepare_lines(code: &str) -> Vec<PreparedLine> {
    let mut active: Vec<ActiveMark> = Vec::new();
    let mut lines = Vec::new();

    for raw in code.lines() {
        let mut text = raw;
        if let Some(caps) = NOTATION_COMMENT_RE.captures(raw) {
            let notations: Vec<_> = NOTATION_RE
                .captures_iter(&caps[1])
                .filter_map(|n| parse_notation(&n[1]))
                .collect();
            if !notations.is_empty() {
                if let Some(whole) = caps.get(0) {
                    text = &raw[..whole.start()];
                }
                active.extend(notations);
                if text.trim().is_empty() {
                    continue;
                }
            }
        }

        let mut line = PreparedLine {
            text: text.to_string(),
            ..Default::default()
        };
        for entry in &mut active {
            match &entry.mark {
                Mark::Diff(diff) => line.diff = Some(*diff),
                Mark::Highlight => line.highlighted = true,
                Mark::Focus => line.focused = true,
                Mark::Word(word) => line.words.push(word.clone()),
            }
            if let Some(n) = entry.remaining.as_mut() {
                *n = n.saturating_sub(1);
            }
        }
        active.retain(|entry| entry.remaining != Some(0));
        lines.push(line);
    }

    lines
}

fn lookup_syntax(language: &str) -> Option<&'static SyntaxReference> {
    let token = match language.to_ascii_lowercase().as_str() {
        "ts" | "tsx" | "typescript" | "jsx" | "mjs" | "cjs" => "js".to_string(),
        "mdx" => "md".to_string(),
        "shell" | "zsh" | "console" | "shellscript" => "sh".to_string(),
        "text" | "plain" | "plaintext" => "txt".to_string(),
        other => other.to_string(),
    };
    SYNTAX_SET
        .find_syntax_by_token(&token)
        .or_else(|| SYNTAX_SET.find_syntax_by_extension(&token))
}

fn find_syntax(language: &str) -> &'static SyntaxReference {
    lookup_syntax(language).unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text())
}

/// Whether a fence language has a grammar; others render as plain text
pub fn is_known_language(language: &str) -> bool {
    lookup_syntax(language).is_some()
}

fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Highlights code with a light and a dark theme in one tokenising pass
pub struct CodeHighlighter<'a> {
    light: Highlighter<'a>,
    dark: Highlighter<'a>,
}

impl<'a> CodeHighlighter<'a> {
    pub fn new(light: &'a Theme, dark: &'a Theme) -> Self {
        Self {
            light: Highlighter::new(light),
            dark: Highlighter::new(dark),
        }
    }

    /// Annotate one code block
    pub fn annotate(&self, info: &str, code: &str) -> Result<AnnotatedCode, RenderError> {
        let meta = FenceMeta::parse(info);
        let prepared = prepare_lines(code);

        let syntax = find_syntax(&meta.language);
        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();

        let mut lines = Vec::with_capacity(prepared.len());
        for line in &prepared {
            let tokens = self.tokenize(&line.text, &line.words, &mut state, &mut stack)?;
            lines.push(CodeLine {
                tokens,
                diff: line.diff,
                highlighted: line.highlighted,
                focused: line.focused,
            });
        }

        let mut copy_text = prepared
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if code.ends_with('\n') && !prepared.is_empty() {
            copy_text.push('\n');
        }

        Ok(AnnotatedCode {
            language: meta.language,
            title: meta.title,
            line_numbers: meta.line_numbers,
            lines,
            copy_text,
        })
    }

    fn tokenize(
        &self,
        text: &str,
        words: &[String],
        state: &mut ParseState,
        stack: &mut ScopeStack,
    ) -> Result<Vec<Token>, RenderError> {
        let source = format!("{}\n", text);
        let ops = state
            .parse_line(&source, &SYNTAX_SET)
            .map_err(|e| RenderError::Highlight(e.to_string()))?;

        let word_ranges = word_ranges(text, words);
        let mut tokens = Vec::new();
        let mut start = 0;

        for (offset, op) in ops {
            let end = offset.min(text.len());
            if end > start {
                self.push_segment(&mut tokens, text, start, end, stack, &word_ranges);
                start = end;
            }
            stack
                .apply(&op)
                .map_err(|e| RenderError::Highlight(format!("{:?}", e)))?;
        }
        if text.len() > start {
            self.push_segment(&mut tokens, text, start, text.len(), stack, &word_ranges);
        }

        Ok(tokens)
    }

    fn push_segment(
        &self,
        tokens: &mut Vec<Token>,
        text: &str,
        start: usize,
        end: usize,
        stack: &ScopeStack,
        word_ranges: &[(usize, usize)],
    ) {
        let light = hex(self.light.style_for_stack(stack.as_slice()).foreground);
        let dark = hex(self.dark.style_for_stack(stack.as_slice()).foreground);

        let mut cuts = vec![start, end];
        for &(a, b) in word_ranges {
            for cut in [a, b] {
                if cut > start && cut < end {
                    cuts.push(cut);
                }
            }
        }
        cuts.sort_unstable();
        cuts.dedup();

        for pair in cuts.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let word = word_ranges.iter().any(|&(ws, we)| a >= ws && b <= we);
            tokens.push(Token {
                text: text[a..b].to_string(),
                light: light.clone(),
                dark: dark.clone(),
                word,
            });
        }
    }
}

/// Byte ranges of every occurrence of `words` in `text`
fn word_ranges(text: &str, words: &[String]) -> Vec<(usize, usize)> {
    words
        .iter()
        .flat_map(|word| {
            text.match_indices(word.as_str())
                .map(move |(pos, m)| (pos, pos + m.len()))
        })
        .collect()
}
