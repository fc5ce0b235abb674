//! IRC line parsing and the few outgoing commands the client sends.

use std::fmt;

/// Maximum IRC line length, CRLF included.
pub const MAX_LINE_LEN: usize = 512;

/// Room left in every outgoing line for the `:nick!user@host ` prefix the
/// server prepends when relaying it.
const RELAY_PREFIX_ALLOWANCE: usize = 100;

const CTCP_DELIM: char = '\x01';

/// Origin of a message: a server name or a `nick!user@host` mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prefix {
    Server(String),
    User {
        nick: String,
        user: Option<String>,
        host: Option<String>,
    },
}

impl Prefix {
    /// Lenient parse. A name containing `.` with no `!`/`@` is a server.
    pub fn parse(raw: &str) -> Self {
        let (name, rest) = match raw.find(['!', '@']) {
            Some(at) => (&raw[..at], Some(&raw[at..])),
            None => (raw, None),
        };
        let Some(rest) = rest else {
            if name.contains('.') {
                return Self::Server(name.to_string());
            }
            return Self::User {
                nick: name.to_string(),
                user: None,
                host: None,
            };
        };

        let (user, host) = match rest.strip_prefix('!') {
            Some(after_bang) => match after_bang.split_once('@') {
                Some((user, host)) => (Some(user), Some(host)),
                None => (Some(after_bang), None),
            },
            None => (None, rest.strip_prefix('@')),
        };
        Self::User {
            nick: name.to_string(),
            user: user.map(str::to_string),
            host: host.map(str::to_string),
        }
    }

    /// Nick for user prefixes.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Self::User { nick, .. } => Some(nick),
            Self::Server(_) => None,
        }
    }
}

/// One parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Raw IRCv3 tag section without the leading `@`.
    pub tags: Option<String>,
    pub prefix: Option<Prefix>,
    /// Command, uppercased; numerics stay as three digits.
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parse a line (without CRLF). Returns `None` for blank lines or lines
    /// with no command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']).trim_start();

        let mut tags = None;
        if let Some(tagged) = rest.strip_prefix('@') {
            let (raw, after) = tagged.split_once(' ')?;
            tags = Some(raw.to_string());
            rest = after.trim_start();
        }

        let mut prefix = None;
        if let Some(prefixed) = rest.strip_prefix(':') {
            let (raw, after) = prefixed.split_once(' ')?;
            prefix = Some(Prefix::parse(raw));
            rest = after.trim_start();
        }

        let (command, mut rest) = match rest.split_once(' ') {
            Some((command, after)) => (command, after),
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
                },
                None => {
                    params.push(rest.to_string());
                    break;
                },
            }
        }

        Some(Self {
            tags,
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Last parameter, which is the free-text one for most commands.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Three-digit numeric reply code, if this is one.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tags) = &self.tags {
            write!(f, "@{tags} ")?;
        }
        if let Some(prefix) = &self.prefix {
            match prefix {
                Prefix::Server(name) => write!(f, ":{name} ")?,
                Prefix::User { nick, user, host } => {
                    write!(f, ":{nick}")?;
                    if let Some(user) = user {
                        write!(f, "!{user}")?;
                    }
                    if let Some(host) = host {
                        write!(f, "@{host}")?;
                    }
                    f.write_str(" ")?;
                },
            }
        }
        f.write_str(&self.command)?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':')) {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

/// True for CTCP payloads (`\x01VERSION\x01`, `\x01ACTION ...\x01`).
pub fn is_ctcp(text: &str) -> bool {
    text.starts_with(CTCP_DELIM)
}

/// Characters that would let a parameter inject another command.
fn sanitize(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\r' | '\n' | '\0')).collect()
}

pub fn nick(nickname: &str) -> String {
    format!("NICK {}", sanitize(nickname))
}

pub fn user(username: &str, real_name: &str) -> String {
    format!("USER {} 0 * :{}", sanitize(username), sanitize(real_name))
}

pub fn join(channel: &str) -> String {
    format!("JOIN {}", sanitize(channel))
}

pub fn pong(token: &str) -> String {
    format!("PONG :{}", sanitize(token))
}

pub fn whois(nickname: &str) -> String {
    format!("WHOIS {}", sanitize(nickname))
}

pub fn quit(reason: &str) -> String {
    format!("QUIT :{}", sanitize(reason))
}

/// `PRIVMSG` lines carrying `text` to `target`.
///
/// Text is split on line breaks, then each line into chunks that fit a
/// relayed IRC line. Chunks break on whitespace when possible and never
/// inside a UTF-8 sequence. Blank lines are dropped.
pub fn privmsg_lines(target: &str, text: &str) -> Vec<String> {
    let target = sanitize(target);
    let budget = MAX_LINE_LEN
        .saturating_sub(2 + RELAY_PREFIX_ALLOWANCE + "PRIVMSG  :".len() + target.len())
        .max(1);

    text.split(['\r', '\n'])
        .map(str::trim_end)
        .filter(|line| !line.trim_start().is_empty())
        .flat_map(|line| split_chunks(line, budget))
        .map(|chunk| format!("PRIVMSG {target} :{chunk}"))
        .collect()
}

fn split_chunks(line: &str, budget: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = line;
    while rest.len() > budget {
        let mut cut = budget;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // A single char wider than the budget.
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        } else if let Some(space) = rest[..cut].rfind(' ')
            && space > 0
        {
            cut = space;
        }
        chunks.push(&rest[..cut]);
        rest = rest[cut..].trim_start_matches(' ');
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}
