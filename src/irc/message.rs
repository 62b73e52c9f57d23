//! IRC message model and line codec.
//!
//! A [`Message`] is one protocol line split into its four parts:
//!
//! ```text
//! [':' prefix ' '] command [' ' param]* [' :' trailing]
//! ```
//!
//! [`Message::decode`] and [`Message::encode`] never deal with the CR LF
//! terminator; that belongs to the [`framer`](crate::irc::framer).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::irc::error::CommandMissing;

/// One decoded IRC protocol line.
///
/// Field names serialize as `Prefix`, `Command`, `Parameters` and `Trailing`
/// for the JSON diagnostic view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    /// Origin of the message (server name or `nick!user@host`).
    pub prefix: Option<String>,
    /// Verb or three-digit numeric. Empty only on a failed decode.
    pub command: String,
    /// Positional arguments, in wire order. Does not include `trailing`.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Final colon-introduced argument; may contain spaces and colons.
    pub trailing: Option<String>,
}

impl Message {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.parameters.push(param.into());
        self
    }

    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    /// Case-insensitive command comparison (`privmsg` matches `PRIVMSG`).
    pub fn is_command(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// Decode one protocol line, without its CR LF terminator.
    ///
    /// An empty line decodes to an empty message without error. A line with
    /// no command token fails with [`CommandMissing`], carrying every field
    /// recovered up to that point. Non-UTF-8 bytes are replaced lossily.
    pub fn decode(line: &[u8]) -> Result<Self, CommandMissing<Self>> {
        let mut msg = Self::default();
        if line.is_empty() {
            return Ok(msg);
        }

        let mut rest = line;
        if let Some(after_colon) = rest.strip_prefix(b":") {
            match find_space(after_colon) {
                Some(i) => {
                    msg.prefix = Some(text(&after_colon[..i]));
                    rest = &after_colon[i + 1..];
                }
                None => {
                    if !after_colon.is_empty() {
                        msg.prefix = Some(text(after_colon));
                    }
                    return Err(CommandMissing::new(msg));
                }
            }
        }

        // Prefix followed straight by a trailing segment: nothing to call a command.
        if let Some(trailing) = rest.strip_prefix(b":") {
            msg.trailing = Some(text(trailing));
            return Err(CommandMissing::new(msg));
        }

        match find_space(rest) {
            Some(i) => {
                msg.command = text(&rest[..i]);
                rest = &rest[i + 1..];
            }
            None => {
                msg.command = text(rest);
                rest = &[];
            }
        }

        while !rest.is_empty() {
            if let Some(trailing) = rest.strip_prefix(b":") {
                msg.trailing = Some(text(trailing));
                break;
            }
            match find_space(rest) {
                Some(i) => {
                    msg.parameters.push(text(&rest[..i]));
                    rest = &rest[i + 1..];
                }
                None => {
                    msg.parameters.push(text(rest));
                    break;
                }
            }
        }

        if msg.command.is_empty() {
            return Err(CommandMissing::new(msg));
        }
        Ok(msg)
    }

    /// Encode into a protocol line, without the CR LF terminator.
    ///
    /// Empty prefix, parameter list and trailing are omitted. A missing
    /// command is an error, but the line is still assembled from the other
    /// fields and returned as the error's `partial`.
    pub fn encode(&self) -> Result<String, CommandMissing<String>> {
        let line = self.to_string();
        if self.command.is_empty() {
            return Err(CommandMissing::new(line));
        }
        Ok(line)
    }
}

/// Writes the wire form. A missing command is skipped silently; use
/// [`Message::encode`] to have it reported.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.prefix.as_deref().filter(|p| !p.is_empty()) {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        if !self.parameters.is_empty() {
            write!(f, " {}", self.parameters.join(" "))?;
        }
        if let Some(trailing) = self.trailing.as_deref().filter(|t| !t.is_empty()) {
            write!(f, " :{}", trailing)?;
        }
        Ok(())
    }
}

impl FromStr for Message {
    type Err = CommandMissing<Message>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s.as_bytes())
    }
}

fn find_space(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|b| *b == b' ')
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(prefix: Option<&str>, command: &str, params: &[&str], trailing: Option<&str>) -> Message {
        Message {
            prefix: prefix.map(String::from),
            command: command.to_string(),
            parameters: params.iter().map(|p| p.to_string()).collect(),
            trailing: trailing.map(String::from),
        }
    }

    /// Lines that decode cleanly, and encode back to the same bytes.
    const VALID: &[(&str, Option<&str>, &str, &[&str], Option<&str>)] = &[
        (
            ":nick!user@host.com PRIVMSG #42o3L1t3 :l0l sw4g 0m9 s0 c00l 42o",
            Some("nick!user@host.com"),
            "PRIVMSG",
            &["#42o3L1t3"],
            Some("l0l sw4g 0m9 s0 c00l 42o"),
        ),
        ("COMMAND :no arguments here!", None, "COMMAND", &[], Some("no arguments here!")),
        ("COMMAND nothing but arguments!", None, "COMMAND", &["nothing", "but", "arguments!"], None),
        ("foo bar baz asdf", None, "foo", &["bar", "baz", "asdf"], None),
        ("foo bar baz :asdf quux", None, "foo", &["bar", "baz"], Some("asdf quux")),
        ("foo bar baz", None, "foo", &["bar", "baz"], None),
        ("foo bar baz ::asdf", None, "foo", &["bar", "baz"], Some(":asdf")),
        (":test foo bar baz asdf", Some("test"), "foo", &["bar", "baz", "asdf"], None),
        (":test foo bar baz :asdf quux", Some("test"), "foo", &["bar", "baz"], Some("asdf quux")),
        (":test foo bar baz", Some("test"), "foo", &["bar", "baz"], None),
        (":test foo bar baz ::asdf", Some("test"), "foo", &["bar", "baz"], Some(":asdf")),
        (":foo bar", Some("foo"), "bar", &[], None),
        ("PING :x", None, "PING", &[], Some("x")),
        ("QUIT", None, "QUIT", &[], None),
    ];

    #[test]
    fn test_decode_valid_lines() {
        for (line, prefix, command, params, trailing) in VALID {
            let decoded = Message::decode(line.as_bytes())
                .unwrap_or_else(|e| panic!("decode failed on {:?}: {}", line, e));
            assert_eq!(decoded, msg(*prefix, command, params, *trailing), "line {:?}", line);
        }
    }

    #[test]
    fn test_encode_valid_lines() {
        for (line, prefix, command, params, trailing) in VALID {
            let encoded = msg(*prefix, command, params, *trailing).encode().unwrap();
            assert_eq!(&encoded, line);
        }
    }

    #[test]
    fn test_decode_privmsg_scenario() {
        let m: Message = ":nick!user@host.com PRIVMSG #chan :hello there".parse().unwrap();
        assert_eq!(m.prefix.as_deref(), Some("nick!user@host.com"));
        assert_eq!(m.command, "PRIVMSG");
        assert_eq!(m.parameters, vec!["#chan"]);
        assert_eq!(m.trailing.as_deref(), Some("hello there"));
    }

    #[test]
    fn test_decode_empty_line_is_empty_message() {
        assert_eq!(Message::decode(b""), Ok(Message::default()));
    }

    #[test]
    fn test_decode_bare_colon_fails() {
        let err = Message::decode(b":").unwrap_err();
        assert_eq!(err.partial, Message::default());
    }

    #[test]
    fn test_decode_prefix_without_command_fails() {
        let err = Message::decode(b":foo").unwrap_err();
        assert_eq!(err.partial.prefix.as_deref(), Some("foo"));
        assert!(err.partial.command.is_empty());
    }

    #[test]
    fn test_decode_prefix_then_trailing_fails_with_trailing_recovered() {
        let err = Message::decode(b":foo :bar baz").unwrap_err();
        assert_eq!(err.partial, msg(Some("foo"), "", &[], Some("bar baz")));
    }

    #[test]
    fn test_decode_prefix_then_colon_token_fails() {
        // Even without a space after it, a colon token cannot be a command.
        let err = Message::decode(b":foo :bar").unwrap_err();
        assert_eq!(err.partial.trailing.as_deref(), Some("bar"));
    }

    #[test]
    fn test_decode_empty_command_fails() {
        assert!(Message::decode(b":pfx ").is_err());

        let err = Message::decode(b" lead").unwrap_err();
        assert_eq!(err.partial.parameters, vec!["lead"]);
    }

    #[test]
    fn test_decode_trailing_space_adds_no_parameter() {
        let m = Message::decode(b"MODE #chan ").unwrap();
        assert_eq!(m.parameters, vec!["#chan"]);

        let m = Message::decode(b"AWAY ").unwrap();
        assert!(m.parameters.is_empty());
    }

    #[test]
    fn test_decode_double_space_keeps_empty_parameter() {
        let m = Message::decode(b"foo a  b").unwrap();
        assert_eq!(m.parameters, vec!["a", "", "b"]);
    }

    #[test]
    fn test_decode_empty_trailing_is_present() {
        let m = Message::decode(b"TOPIC #chan :").unwrap();
        assert_eq!(m.trailing.as_deref(), Some(""));
    }

    #[test]
    fn test_decode_copies_out_of_input_buffer() {
        let mut buf = b"PING :abc".to_vec();
        let m = Message::decode(&buf).unwrap();
        buf.fill(b'x');
        assert_eq!(m.trailing.as_deref(), Some("abc"));
    }

    #[test]
    fn test_decode_invalid_utf8_is_lossy() {
        let m = Message::decode(b"PRIVMSG #c :caf\xe9").unwrap();
        assert_eq!(m.trailing.as_deref(), Some("caf\u{fffd}"));
    }

    #[test]
    fn test_encode_missing_command_returns_partial() {
        let m = msg(Some("foo"), "", &["a"], Some("bar baz"));
        let err = m.encode().unwrap_err();
        assert_eq!(err.partial, ":foo  a :bar baz");

        let err = Message::default().encode().unwrap_err();
        assert_eq!(err.partial, "");
    }

    #[test]
    fn test_encode_skips_empty_optionals() {
        let m = msg(Some(""), "PING", &[], Some(""));
        assert_eq!(m.encode().unwrap(), "PING");
    }

    #[test]
    fn test_round_trip() {
        let messages = [
            Message::new("PRIVMSG")
                .with_prefix("someguy!user@foo.bar.com")
                .with_param("#testing")
                .with_trailing("foo bar baz quux"),
            Message::new("NOTICE").with_param("user").with_trailing("*** : odd colons :"),
            Message::new("001").with_prefix("irc.example.net").with_param("me"),
            Message::new("JOIN").with_param("#a,#b").with_param("key"),
        ];
        for m in messages {
            let line = m.encode().unwrap();
            assert_eq!(Message::decode(line.as_bytes()).unwrap(), m);
        }
    }

    #[test]
    fn test_is_command_ignores_case() {
        assert!(Message::new("privmsg").is_command("PRIVMSG"));
        assert!(!Message::new("PING").is_command("PONG"));
    }

    #[test]
    fn test_json_field_names() {
        let m = Message::new("NOTICE")
            .with_prefix("server.kevlar.net")
            .with_param("user")
            .with_trailing("*** This is a test");
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(
            json,
            r#"{"Prefix":"server.kevlar.net","Command":"NOTICE","Parameters":["user"],"Trailing":"*** This is a test"}"#
        );

        let back: Message = serde_json::from_str(r#"{"Prefix":null,"Command":"PING","Trailing":"x"}"#).unwrap();
        assert_eq!(back, Message::new("PING").with_trailing("x"));
    }
}
