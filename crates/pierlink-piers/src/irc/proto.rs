//! IRC line parsing and outbound formatting (RFC 1459 framing).

/// Byte budget for the text part of one outbound `PRIVMSG`.
///
/// The server prepends our full prefix when relaying, so this stays well
/// under the 512-byte line limit.
pub const MESSAGE_BYTES_BUDGET: usize = 400;

/// One parsed server line: `[@tags] [:prefix] COMMAND params... [:trailing]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcLine {
    pub prefix: Option<String>,
    pub command: String,
    /// Middle params followed by the trailing param, if any.
    pub params: Vec<String>,
}

impl IrcLine {
    /// Parse a raw line. Returns `None` for empty or command-less input.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut rest = raw.trim_end_matches(['\r', '\n']);

        // IRCv3 message tags are not used.
        if rest.starts_with('@') {
            rest = rest.split_once(' ')?.1;
        }
        rest = rest.trim_start_matches(' ');

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (prefix, after) = stripped.split_once(' ')?;
            rest = after.trim_start_matches(' ');
            Some(prefix.to_string())
        } else {
            None
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((cmd, after)) => (cmd, after),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, after)) => {
                    params.push(param.to_string());
                    rest = after;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Nickname part of the prefix (`nick!user@host`).
    pub fn nick(&self) -> Option<&str> {
        self.prefix.as_deref().map(nick_from_prefix)
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

/// `nick!user@host` -> `nick`. Server prefixes are returned unchanged.
pub fn nick_from_prefix(prefix: &str) -> &str {
    prefix.split(['!', '@']).next().unwrap_or(prefix)
}

/// Largest index `<= index` that lies on a char boundary of `s`.
pub(crate) fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Split `text` into pieces of at most `budget` bytes, preferring spaces.
pub fn split_to_budget(text: &str, budget: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = text;
    while rest.len() > budget {
        let first = rest.chars().next().map_or(1, char::len_utf8);
        let hard = floor_char_boundary(rest, budget).max(first);
        let cut = if rest.as_bytes().get(hard) == Some(&b' ') {
            hard
        } else {
            rest[..hard].rfind(' ').filter(|&p| p > 0).unwrap_or(hard)
        };
        out.push(rest[..cut].trim_end());
        rest = rest[cut..].trim_start_matches(' ');
    }
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Build the `PRIVMSG` lines needed to deliver `lines` to `target`.
///
/// CR and NUL are stripped, empty lines dropped, long lines split.
pub fn privmsg_lines<'a>(target: &str, lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out = Vec::new();
    for line in lines {
        let clean: String = line.chars().filter(|c| !matches!(c, '\r' | '\n' | '\0')).collect();
        for piece in split_to_budget(&clean, MESSAGE_BYTES_BUDGET) {
            if !piece.trim().is_empty() {
                out.push(format!("PRIVMSG {target} :{piece}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_privmsg() {
        let line = IrcLine::parse(":alice!a@host PRIVMSG #rust :hello there\r\n").unwrap();
        assert_eq!(line.prefix.as_deref(), Some("alice!a@host"));
        assert_eq!(line.nick(), Some("alice"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#rust", "hello there"]);
    }

    #[test]
    fn parse_without_prefix() {
        let line = IrcLine::parse("PING :irc.libera.chat").unwrap();
        assert!(line.prefix.is_none());
        assert_eq!(line.command, "PING");
        assert_eq!(line.param(0), Some("irc.libera.chat"));
    }

    #[test]
    fn parse_numeric_and_middle_params() {
        let line = IrcLine::parse(":server 433 * pierlink :Nickname is already in use").unwrap();
        assert_eq!(line.command, "433");
        assert_eq!(line.params, vec!["*", "pierlink", "Nickname is already in use"]);
        assert_eq!(line.nick(), Some("server"));
    }

    #[test]
    fn parse_mode_without_trailing() {
        let line = IrcLine::parse(":op!o@h MODE #rust +o bob").unwrap();
        assert_eq!(line.params, vec!["#rust", "+o", "bob"]);
    }

    #[test]
    fn parse_skips_tags() {
        let line = IrcLine::parse("@time=2024-01-01T00:00:00Z :a!b@c PRIVMSG #x :hi").unwrap();
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.param(1), Some("hi"));
    }

    #[test]
    fn parse_empty_trailing() {
        let line = IrcLine::parse(":a!b@c TOPIC #x :").unwrap();
        assert_eq!(line.params, vec!["#x", ""]);
    }

    #[test]
    fn parse_rejects_empty() {
        assert!(IrcLine::parse("").is_none());
        assert!(IrcLine::parse(":prefixonly").is_none());
    }

    #[test]
    fn split_prefers_spaces() {
        let pieces = split_to_budget("aaa bbb ccc", 7);
        assert_eq!(pieces, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn split_respects_char_boundaries() {
        let text = "é".repeat(10);
        let pieces = split_to_budget(&text, 5);
        assert!(pieces.iter().all(|p| p.len() <= 5));
        assert_eq!(pieces.concat(), text);
    }

    #[test]
    fn privmsg_lines_per_line() {
        let lines = privmsg_lines("#rust", ["<bob> one", "", "<bob> two\r"]);
        assert_eq!(
            lines,
            vec!["PRIVMSG #rust :<bob> one", "PRIVMSG #rust :<bob> two"]
        );
    }

    #[test]
    fn privmsg_lines_split_long() {
        let long = "word ".repeat(200);
        let lines = privmsg_lines("#rust", [long.as_str()]);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.len() <= "PRIVMSG #rust :".len() + MESSAGE_BYTES_BUDGET);
        }
    }
}
