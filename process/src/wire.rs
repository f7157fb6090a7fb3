//! Request encoding for the interactive protocol.
//!
//! A request is one line: `<command> <args...>` joined by spaces and ended by
//! the platform line ending. When the tool understands escaped arguments the
//! line starts with [`ESCAPE_MODE`] and every argument is bracketed by
//! [`ARG_OPEN`]/[`ARG_CLOSE`], which lets arguments carry spaces. A payload
//! (unsaved buffer text) follows on its own lines and ends with [`EOT`] on a
//! line by itself.

use gmod_types::EOL;

/// Flag that switches the tool into its long-lived interactive mode.
pub const INTERACTIVE_MODE: &str = "legacy-interactive";

/// Leading token announcing escaped arguments.
pub const ESCAPE_MODE: &str = "ascii-escape";

pub const ARG_OPEN: char = '\x02';
pub const ARG_CLOSE: char = '\x03';

/// End-of-transmission marker closing a payload.
pub const EOT: char = '\x04';

#[must_use]
pub fn escape_arg(arg: &str) -> String {
    format!("{ARG_OPEN}{arg}{ARG_CLOSE}")
}

/// Request tokens before joining.
#[must_use]
pub fn command_tokens(command: &str, args: &[String], quote_args: bool) -> Vec<String> {
    if quote_args {
        let mut tokens = Vec::with_capacity(args.len() + 2);
        tokens.push(ESCAPE_MODE.to_string());
        tokens.push(command.to_string());
        tokens.extend(args.iter().map(|a| escape_arg(a)));
        tokens
    } else {
        let mut tokens = Vec::with_capacity(args.len() + 1);
        tokens.push(command.to_string());
        tokens.extend(args.iter().cloned());
        tokens
    }
}

/// The full request line, line ending included.
///
/// Line breaks inside arguments would end the request early, so each CR, LF,
/// or CRLF is replaced by a single space.
#[must_use]
pub fn encode_command(command: &str, args: &[String], quote_args: bool) -> String {
    let joined = command_tokens(command, args, quote_args).join(" ");
    let flattened = joined.replace("\r\n", " ").replace(['\r', '\n'], " ");
    format!("{flattened}{EOL}")
}

/// Payload text followed by the end-of-transmission marker line.
#[must_use]
pub fn encode_payload(text: &str) -> String {
    format!("{text}{EOL}{EOT}{EOL}")
}

/// Recover the arguments of an escaped token list.
#[must_use]
pub fn split_escaped(encoded: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = encoded;
    while let Some(open) = rest.find(ARG_OPEN) {
        let after = &rest[open + ARG_OPEN.len_utf8()..];
        let Some(close) = after.find(ARG_CLOSE) else {
            break;
        };
        out.push(after[..close].to_string());
        rest = &after[close + ARG_CLOSE.len_utf8()..];
    }
    out
}

/// The tool encodes newlines inside a response line as NUL.
#[must_use]
pub fn decode_nul(line: &str) -> String {
    line.replace('\0', "\n")
}
