//! Shell quoting for remote command strings

/// Characters that require quoting
const SHELL_META: &[char] = &[
    ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}', '<',
    '>', '|', '&', ';', '#', '~',
];

/// Quote a single argument for the remote shell.
///
/// Empty strings become `''`; strings with metacharacters are wrapped in
/// single quotes with embedded quotes escaped as `'\''`.
#[must_use]
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", arg.replace('\'', "'\\''"))
}
