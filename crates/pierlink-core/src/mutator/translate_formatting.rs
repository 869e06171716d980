//! Formatting translation between Discord markdown and IRC control codes.
//!
//! Discord to IRC:
//! - `**bold**` -> `\x02`, `*italic*` / `_italic_` -> `\x1D`
//! - `~~strike~~` -> `\x1E`, `` `code` `` -> `\x11`
//! - masked links `[text](url)` -> `text (url)`
//!
//! IRC to Discord:
//! - `\x02` -> `**`, `\x1D` -> `*`, `\x1F` -> `__`, `\x1E` -> `~~`, `\x11` -> `` ` ``
//! - `\x0F` closes everything open; colour (`\x03`, `\x04`) and reverse
//!   (`\x16`) codes are stripped

use std::ops::Range;

use async_trait::async_trait;
use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag, TagEnd};

use pierlink_types::error::MutatorError;
use pierlink_types::message::{Message, MutatorId, PlatformType};

use super::{LifeCycle, Mutator};

const IRC_BOLD: char = '\x02';
const IRC_COLOR: char = '\x03';
const IRC_HEX_COLOR: char = '\x04';
const IRC_RESET: char = '\x0F';
const IRC_MONOSPACE: char = '\x11';
const IRC_REVERSE: char = '\x16';
const IRC_ITALIC: char = '\x1D';
const IRC_STRIKE: char = '\x1E';
const IRC_UNDERLINE: char = '\x1F';

pub struct TranslateFormatting;

impl TranslateFormatting {
    pub const ID: MutatorId = MutatorId("translate-formatting");
}

#[async_trait]
impl Mutator for TranslateFormatting {
    fn id(&self) -> MutatorId {
        Self::ID
    }

    async fn mutate(&self, message: &mut Message) -> Result<LifeCycle, MutatorError> {
        message.content = match message.source.platform {
            PlatformType::Discord => discord_to_irc(&message.content),
            PlatformType::Irc => irc_to_discord(&message.content),
        };
        Ok(LifeCycle::Continue)
    }
}

/// Convert Discord markdown to IRC control codes.
///
/// Only constructs Discord renders are translated. Anything else (thematic
/// breaks, setext headings, indented code, link reference definitions) is
/// copied from the source unchanged, and HTML entities are not decoded.
pub fn discord_to_irc(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH).into_offset_iter();
    let mut output = String::with_capacity(markdown.len());
    let mut in_code_block = false;
    let mut list_counters: Vec<Option<u64>> = Vec::new();
    let mut link_targets: Vec<Option<String>> = Vec::new();
    // Open tags, and open tags inside a block being copied verbatim.
    let mut depth = 0usize;
    let mut skip = 0usize;
    // End of the last top-level block.
    let mut block_end = 0usize;

    for (event, range) in parser {
        if skip > 0 {
            match event {
                Event::Start(_) => skip += 1,
                Event::End(_) => skip -= 1,
                _ => {}
            }
            if skip == 0 {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    block_end = range.end;
                }
            }
            continue;
        }
        if depth == 0 && range.start > block_end {
            copy_unparsed(&markdown[block_end..range.start], &mut output);
        }

        match event {
            Event::Start(tag) => {
                depth += 1;
                if is_verbatim_block(&tag, &markdown[range.clone()]) {
                    push_verbatim(markdown, range, depth == 1, &mut output);
                    skip = 1;
                    continue;
                }
                match tag {
                    Tag::Strong => output.push(IRC_BOLD),
                    Tag::Emphasis => output.push(IRC_ITALIC),
                    Tag::Strikethrough => output.push(IRC_STRIKE),
                    Tag::CodeBlock(_) => in_code_block = true,
                    Tag::Heading { level, .. } => {
                        output.push_str(&"#".repeat(level as usize));
                        output.push(' ');
                    }
                    Tag::BlockQuote(_) => output.push_str("> "),
                    Tag::List(start) => list_counters.push(start),
                    Tag::Item => match list_counters.last_mut() {
                        Some(Some(n)) => {
                            output.push_str(&format!("{n}. "));
                            *n += 1;
                        }
                        _ => output.push_str("- "),
                    },
                    Tag::Link {
                        link_type,
                        dest_url,
                        ..
                    } => link_targets.push(match link_type {
                        LinkType::Inline | LinkType::Reference | LinkType::Collapsed
                        | LinkType::Shortcut => Some(dest_url.to_string()),
                        _ => None,
                    }),
                    _ => {}
                }
            }
            Event::End(tag_end) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    block_end = range.end;
                }
                match tag_end {
                    TagEnd::Strong => output.push(IRC_BOLD),
                    TagEnd::Emphasis => output.push(IRC_ITALIC),
                    TagEnd::Strikethrough => output.push(IRC_STRIKE),
                    TagEnd::CodeBlock => in_code_block = false,
                    TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item => output.push('\n'),
                    TagEnd::List(_) => {
                        list_counters.pop();
                    }
                    TagEnd::Link => {
                        if let Some(Some(url)) = link_targets.pop() {
                            output.push_str(&format!(" ({url})"));
                        }
                    }
                    _ => {}
                }
            }
            Event::Rule => {
                push_verbatim(markdown, range.clone(), depth == 0, &mut output);
                if depth == 0 {
                    block_end = range.end;
                }
            }
            Event::Text(text) => {
                let source = &markdown[range];
                if in_code_block || &*text == source || !source.contains('&') {
                    output.push_str(&text);
                } else {
                    // Entities stay as typed; only backslash escapes are undone.
                    output.push_str(&unescape_backslashes(source));
                }
            }
            Event::Code(code) => {
                output.push(IRC_MONOSPACE);
                output.push_str(&code);
                output.push(IRC_MONOSPACE);
            }
            Event::Html(html) | Event::InlineHtml(html) => output.push_str(&html),
            Event::SoftBreak | Event::HardBreak => {
                if !in_code_block {
                    output.push('\n');
                }
            }
            _ => {}
        }
    }
    if block_end < markdown.len() {
        copy_unparsed(&markdown[block_end..], &mut output);
    }

    // Items and paragraphs nested in items both end with a newline.
    while output.contains("\n\n") {
        output = output.replace("\n\n", "\n");
    }
    output.trim_end().trim_start_matches('\n').to_owned()
}

/// Blocks Discord shows as plain text.
fn is_verbatim_block(tag: &Tag<'_>, source: &str) -> bool {
    match tag {
        Tag::CodeBlock(CodeBlockKind::Indented) => true,
        // Setext headings span two lines; ATX headings never do.
        Tag::Heading { .. } => source.trim_end().contains('\n'),
        _ => false,
    }
}

/// Copy `markdown[range]` as typed. Top-level blocks are widened to the
/// start of their line so leading indentation survives.
fn push_verbatim(markdown: &str, range: Range<usize>, top_level: bool, output: &mut String) {
    let start = if top_level {
        markdown[..range.start].rfind('\n').map_or(0, |i| i + 1)
    } else {
        range.start
    };
    output.push_str(markdown[start..range.end].trim_end_matches(['\r', '\n']));
    output.push('\n');
}

/// Source text between top-level blocks (link reference definitions).
fn copy_unparsed(gap: &str, output: &mut String) {
    for line in gap.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
        output.push_str(line);
        output.push('\n');
    }
}

fn unescape_backslashes(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            continue;
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Span {
    Bold,
    Italic,
    Underline,
    Strike,
    Monospace,
}

impl Span {
    fn marker(self) -> &'static str {
        match self {
            Self::Bold => "**",
            Self::Italic => "*",
            Self::Underline => "__",
            Self::Strike => "~~",
            Self::Monospace => "`",
        }
    }

    fn from_code(c: char) -> Option<Self> {
        match c {
            IRC_BOLD => Some(Self::Bold),
            IRC_ITALIC => Some(Self::Italic),
            IRC_UNDERLINE => Some(Self::Underline),
            IRC_STRIKE => Some(Self::Strike),
            IRC_MONOSPACE => Some(Self::Monospace),
            _ => None,
        }
    }
}

/// Open spans with the output length right after each opener.
struct SpanStack {
    open: Vec<(Span, usize)>,
}

impl SpanStack {
    fn open(&mut self, out: &mut String, span: Span) {
        out.push_str(span.marker());
        self.open.push((span, out.len()));
    }

    /// Close the innermost span. An empty span loses its opener instead.
    fn close_top(&mut self, out: &mut String) -> Option<Span> {
        let (span, pos) = self.open.pop()?;
        if out.len() == pos {
            out.truncate(pos - span.marker().len());
        } else {
            out.push_str(span.marker());
        }
        Some(span)
    }

    /// Close `span`, closing and reopening anything nested inside it so
    /// markdown stays properly nested.
    fn toggle(&mut self, out: &mut String, span: Span) {
        let Some(idx) = self.open.iter().rposition(|(s, _)| *s == span) else {
            self.open(out, span);
            return;
        };
        let mut reopen = Vec::new();
        while self.open.len() > idx + 1 {
            if let Some(inner) = self.close_top(out) {
                reopen.push(inner);
            }
        }
        self.close_top(out);
        for inner in reopen.into_iter().rev() {
            self.open(out, inner);
        }
    }

    fn close_all(&mut self, out: &mut String) {
        while self.close_top(out).is_some() {}
    }
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

/// Skip up to `max` chars matching `pred`.
fn skip_while(chars: &mut Chars<'_>, max: usize, pred: fn(&char) -> bool) -> usize {
    let mut n = 0;
    while n < max && chars.peek().is_some_and(pred) {
        chars.next();
        n += 1;
    }
    n
}

/// Skip a colour argument `FG[,BG]` after `\x03` (decimal) or `\x04` (hex).
fn skip_color(chars: &mut Chars<'_>, width: usize, pred: fn(&char) -> bool) {
    if skip_while(chars, width, pred) == 0 {
        return;
    }
    let mut lookahead = chars.clone();
    if lookahead.next() == Some(',') && lookahead.peek().is_some_and(pred) {
        chars.next();
        skip_while(chars, width, pred);
    }
}

/// Convert IRC control codes to Discord markdown.
pub fn irc_to_discord(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut stack = SpanStack { open: Vec::new() };
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(span) = Span::from_code(c) {
            stack.toggle(&mut out, span);
            continue;
        }
        match c {
            IRC_RESET => stack.close_all(&mut out),
            IRC_COLOR => skip_color(&mut chars, 2, char::is_ascii_digit),
            IRC_HEX_COLOR => skip_color(&mut chars, 6, char::is_ascii_hexdigit),
            IRC_REVERSE => {}
            other => out.push(other),
        }
    }
    stack.close_all(&mut out);
    out
}
