//! Rendering of relay Markdown to Telegram HTML, and message splitting.
//!
//! Formatter output uses a light Markdown dialect (`**bold**`, `*italic*`,
//! `_italic_`, `` `code` ``, fenced blocks, links). Telegram's legacy
//! Markdown mode rejects unbalanced markers in user text, so the relay sends
//! HTML instead and escapes everything that is not markup.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Telegram's hard limit is 4096 characters; keep some margin.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Escape text for Telegram HTML, attributes included.
#[must_use]
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

static ESCAPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([\\`*_\[\]#])").expect("invalid regex"));
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[\w+-]*\n?([\s\S]*?)```").expect("invalid regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("invalid regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\s]+)\)").expect("invalid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}[ \t]+(.+)$").expect("invalid regex"));

/// Rendered fragments are swapped out for `\0<n>\0` tokens so later rules
/// never see their contents.
struct Stash(Vec<Stashed>);

struct Stashed {
    html: String,
    source: String,
}

impl Stash {
    fn keep(&mut self, html: String, source: &str) -> String {
        let token = format!("\u{0}{}\u{0}", self.0.len());
        self.0.push(Stashed {
            html,
            source: source.to_string(),
        });
        token
    }

    /// Put back the source text of any tokens in `text`.
    fn source_of(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (i, stashed) in self.0.iter().enumerate() {
            text = text.replace(&format!("\u{0}{i}\u{0}"), &stashed.source);
        }
        text
    }

    /// Newest first: a link's HTML may contain older escape tokens.
    fn restore(self, mut text: String) -> String {
        for (i, stashed) in self.0.into_iter().enumerate().rev() {
            text = text.replace(&format!("\u{0}{i}\u{0}"), &stashed.html);
        }
        text
    }
}

/// Render relay Markdown as Telegram HTML.
///
/// A backslash makes the next `` \ ` * _ [ ] # `` literal. The output is
/// always well nested: emphasis markers that would cross are left as text.
#[must_use]
pub fn markdown_to_html(md: &str) -> String {
    let mut stash = Stash(Vec::new());

    let text = ESCAPED.replace_all(md, |caps: &Captures<'_>| {
        stash.keep(html_escape(&caps[1]), &caps[0])
    });
    let text = FENCE.replace_all(&text, |caps: &Captures<'_>| {
        let code = stash.source_of(&caps[1]);
        stash.keep(format!("<pre>{}</pre>", html_escape(&code)), "")
    });
    let text = INLINE_CODE.replace_all(&text, |caps: &Captures<'_>| {
        let code = stash.source_of(&caps[1]);
        stash.keep(format!("<code>{}</code>", html_escape(&code)), "")
    });

    let text = html_escape(&text);
    let text = LINK.replace_all(&text, |caps: &Captures<'_>| {
        let (label, url) = (&caps[1], &caps[2]);
        let html = if is_safe_link(url) {
            format!("<a href=\"{url}\">{label}</a>")
        } else {
            format!("{label} ({url})")
        };
        stash.keep(html, "")
    });
    let text = emphasis(&text);
    let text = HEADING.replace_all(&text, "<b>$1</b>");

    stash.restore(text.into_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Bold,
    Star,
    Underscore,
}

impl Emphasis {
    fn marker(self) -> &'static str {
        match self {
            Self::Bold => "**",
            Self::Star => "*",
            Self::Underscore => "_",
        }
    }

    fn tags(self) -> (&'static str, &'static str) {
        match self {
            Self::Bold => ("<b>", "</b>"),
            Self::Star | Self::Underscore => ("<i>", "</i>"),
        }
    }
}

enum Token {
    Text(String),
    Marker {
        kind: Emphasis,
        tag: Option<&'static str>,
    },
}

/// Pair `**`, `*` and `_` markers on a stack, one line at a time.
///
/// A closer pairs with the nearest open marker of its kind; openers above
/// it stay literal, so spans never cross. `_` only opens and closes at word
/// edges, so `snake_case_name` survives.
fn emphasis(text: &str) -> String {
    let mut tokens: Vec<Token> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut prev: Option<char> = None;

    while let Some(c) = chars.next() {
        let kind = match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                Emphasis::Bold
            },
            '*' => Emphasis::Star,
            '_' => Emphasis::Underscore,
            _ => {
                if c == '\n' {
                    open.clear();
                }
                match tokens.last_mut() {
                    Some(Token::Text(run)) => run.push(c),
                    _ => tokens.push(Token::Text(c.to_string())),
                }
                prev = Some(c);
                continue;
            },
        };
        let before = prev;
        prev = Some(c);

        let is_word = |c: Option<char>| c.is_some_and(char::is_alphanumeric);
        let (can_open, can_close) = match kind {
            Emphasis::Underscore => (!is_word(before), !is_word(chars.peek().copied())),
            Emphasis::Bold | Emphasis::Star => (true, true),
        };

        let closes = if can_close {
            open.iter().rposition(|&t| {
                matches!(tokens.get(t), Some(Token::Marker { kind: k, .. }) if *k == kind)
            })
        } else {
            None
        };

        if let Some(pos) = closes {
            let opener = open[pos];
            open.truncate(pos);
            // An empty span stays literal.
            if opener.saturating_add(1) < tokens.len() {
                let (open_tag, close_tag) = kind.tags();
                if let Some(Token::Marker { tag, .. }) = tokens.get_mut(opener) {
                    *tag = Some(open_tag);
                }
                tokens.push(Token::Marker {
                    kind,
                    tag: Some(close_tag),
                });
                continue;
            }
        }

        if can_open {
            open.push(tokens.len());
        }
        tokens.push(Token::Marker { kind, tag: None });
    }

    let mut out = String::with_capacity(text.len());
    for token in &tokens {
        match token {
            Token::Text(run) => out.push_str(run),
            Token::Marker { tag: Some(tag), .. } => out.push_str(tag),
            Token::Marker { kind, tag: None } => out.push_str(kind.marker()),
        }
    }
    out
}

fn is_safe_link(url: &str) -> bool {
    ["http://", "https://", "tg://", "mailto:"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
}

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Prefers a paragraph break, then a line break, then cuts hard. Breaks
/// consumed at a split point are dropped.
#[must_use]
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = if max_chars == 0 {
        MAX_MESSAGE_CHARS
    } else {
        max_chars
    };

    let mut pieces = Vec::new();
    let mut rest = text;
    loop {
        let Some((limit, _)) = rest.char_indices().nth(max_chars) else {
            pieces.push(rest.to_string());
            return pieces;
        };
        let window = &rest[..limit];
        let (cut, skip) = match window.rfind("\n\n") {
            Some(i) if i > 0 => (i, 2),
            _ => match window.rfind('\n') {
                Some(i) if i > 0 => (i, 1),
                _ => (limit, 0),
            },
        };
        pieces.push(rest[..cut].to_string());
        rest = &rest[cut.saturating_add(skip)..];
    }
}

/// Shorten `text` to at most `max_chars` characters, keeping its last paragraph.
///
/// The head is cut and ends in an ellipsis, so a status line appended after
/// a paragraph break survives. Text without a break, or whose last paragraph
/// alone is too long, is cut hard.
#[must_use]
pub fn fit_message(text: &str, max_chars: usize) -> String {
    let max_chars = if max_chars == 0 {
        MAX_MESSAGE_CHARS
    } else {
        max_chars
    };
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let Some(split) = text.rfind("\n\n") else {
        return text.chars().take(max_chars).collect();
    };
    let tail = &text[split..];
    let head_budget = max_chars
        .saturating_sub(tail.chars().count())
        .saturating_sub(1);
    if head_budget == 0 {
        return text.chars().take(max_chars).collect();
    }

    let mut out: String = text[..split].chars().take(head_budget).collect();
    out.push('…');
    out.push_str(tail);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_keeps_short_text() {
        assert_eq!(fit_message("short\n\nok", 20), "short\n\nok");
    }

    #[test]
    fn fit_keeps_the_status_line() {
        let text = format!("{}\n\n**Response: APPROVED**", "a".repeat(50));
        let fitted = fit_message(&text, 30);
        assert_eq!(fitted, "aaaaa…\n\n**Response: APPROVED**");
        assert_eq!(fitted.chars().count(), 30);
        assert_eq!(
            markdown_to_html(&fitted),
            "aaaaa…\n\n<b>Response: APPROVED</b>"
        );
    }

    #[test]
    fn fit_cuts_hard_without_room_for_the_tail() {
        assert_eq!(fit_message(&"z".repeat(12), 5), "zzzzz");

        let text = format!("head\n\n{}", "t".repeat(20));
        assert_eq!(fit_message(&text, 10), "head\n\ntttt");
    }

    #[test]
    fn escapes_html_specials() {
        assert_eq!(
            html_escape(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn renders_bold_and_italics() {
        assert_eq!(
            markdown_to_html("**Notification from Qoder**"),
            "<b>Notification from Qoder</b>"
        );
        assert_eq!(
            markdown_to_html("*Suggested options:*"),
            "<i>Suggested options:</i>"
        );
        assert_eq!(
            markdown_to_html("_Reply to this message with your answer._"),
            "<i>Reply to this message with your answer.</i>"
        );
    }

    #[test]
    fn snake_case_is_not_italic() {
        assert_eq!(markdown_to_html("use my_var_name"), "use my_var_name");
    }

    #[test]
    fn user_text_cannot_inject_markup() {
        assert_eq!(
            markdown_to_html("<b>x</b> & y"),
            "&lt;b&gt;x&lt;/b&gt; &amp; y"
        );
    }

    #[test]
    fn code_is_escaped_and_protected() {
        assert_eq!(
            markdown_to_html("run `**not bold** <x>`"),
            "run <code>**not bold** &lt;x&gt;</code>"
        );
        assert_eq!(
            markdown_to_html("```rust\nfn main() {}\n```"),
            "<pre>fn main() {}\n</pre>"
        );
    }

    #[test]
    fn approval_layout() {
        let md = "**Approval Request**\n\n**Deploy**\n\nShip it\n\n*Context:*\n```\nlog & tail\n```";
        let html = markdown_to_html(md);
        assert!(html.starts_with("<b>Approval Request</b>\n\n<b>Deploy</b>"));
        assert!(html.contains("<i>Context:</i>"));
        assert!(html.contains("<pre>log &amp; tail\n</pre>"));
    }

    /// Panics unless every `<b>`/`<i>` closes in reverse order of opening.
    fn assert_well_nested(html: &str) {
        let mut stack = Vec::new();
        let mut rest = html;
        while let Some(start) = rest.find('<') {
            let end = rest[start..].find('>').unwrap() + start;
            let tag = &rest[start + 1..end];
            match tag.strip_prefix('/') {
                Some(name) => assert_eq!(stack.pop(), Some(name), "bad close in {html}"),
                None => stack.push(tag.split(' ').next().unwrap()),
            }
            rest = &rest[end + 1..];
        }
        assert!(stack.is_empty(), "unclosed tags in {html}");
    }

    #[test]
    fn crossing_markers_stay_well_nested() {
        assert_eq!(markdown_to_html("**a *b** c*"), "<b>a *b</b> c*");
        assert_eq!(
            markdown_to_html("**Deploy _v2** now_"),
            "<b>Deploy _v2</b> now_"
        );
        assert_eq!(markdown_to_html("*x **y* z**"), "<i>x **y</i> z**");

        for input in [
            "**a *b** c*",
            "_a **b_ c**",
            "*a _b* c_ **d**",
            "**x\ny**",
            "# **head *line**",
            "[**a](https://x.io) b**",
        ] {
            assert_well_nested(&markdown_to_html(input));
        }
    }

    #[test]
    fn nested_markers_render() {
        assert_eq!(
            markdown_to_html("*a **b** c*"),
            "<i>a <b>b</b> c</i>"
        );
        assert_eq!(markdown_to_html("****"), "****");
    }

    #[test]
    fn unclosed_markers_are_literal() {
        assert_eq!(markdown_to_html("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(markdown_to_html("**open\nclose**"), "**open\nclose**");
    }

    #[test]
    fn backslash_escapes_are_literal() {
        assert_eq!(
            markdown_to_html(r"\*not italic\* and \_x\_"),
            "*not italic* and _x_"
        );
        assert_eq!(markdown_to_html(r"\# not a heading"), "# not a heading");
        assert_eq!(markdown_to_html(r"\`x\`"), "`x`");
        assert_eq!(markdown_to_html(r"a \\ b"), r"a \ b");
    }

    #[test]
    fn escapes_are_kept_inside_code() {
        assert_eq!(
            markdown_to_html("```\nC:\\_tmp\n```"),
            "<pre>C:\\_tmp\n</pre>"
        );
        assert_eq!(markdown_to_html(r"`a\*b`"), r"<code>a\*b</code>");
    }

    #[test]
    fn escaped_plain_text_round_trips() {
        let original = "Run *deploy* on my_host_1 with [flags] # now `x`\\";
        let html = markdown_to_html(&relay_core::escape_markdown(original));
        assert_eq!(html, html_escape(original));
    }

    #[test]
    fn links_keep_safe_schemes_only() {
        assert_eq!(
            markdown_to_html("[docs](https://example.com)"),
            "<a href=\"https://example.com\">docs</a>"
        );
        assert_eq!(
            markdown_to_html("[x](javascript:alert)"),
            "x (javascript:alert)"
        );
    }

    #[test]
    fn headings_become_bold() {
        assert_eq!(markdown_to_html("## Status"), "<b>Status</b>");
    }

    #[test]
    fn short_text_is_one_piece() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
        assert_eq!(split_message("", 10), vec![""]);
        assert_eq!(split_message(&"x".repeat(10), 10).len(), 1);
    }

    #[test]
    fn splits_at_paragraph_first() {
        let text = format!("{}\n\n{}\n{}", "a".repeat(5), "b".repeat(3), "c".repeat(3));
        let pieces = split_message(&text, 12);
        assert_eq!(pieces[0], "aaaaa");
        assert_eq!(pieces[1], "bbb\nccc");
    }

    #[test]
    fn splits_at_line_then_hard() {
        let text = format!("{}\n{}", "a".repeat(4), "b".repeat(8));
        let pieces = split_message(&text, 6);
        assert_eq!(pieces, vec!["aaaa", "bbbbbb", "bb"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "é".repeat(9);
        let pieces = split_message(&text, 4);
        assert_eq!(pieces, vec!["éééé", "éééé", "é"]);
    }

    #[test]
    fn zero_limit_uses_default() {
        let text = "y".repeat(MAX_MESSAGE_CHARS + 1);
        let pieces = split_message(&text, 0);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].chars().count(), MAX_MESSAGE_CHARS);
    }
}
