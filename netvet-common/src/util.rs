//! Shared utilities for netvet.

use std::any::Any;

/// Longest message stored on a result before truncation.
pub const MAX_MESSAGE_LEN: usize = 512;

fn find_value_end(s: &str) -> usize {
    let mut end = 0;
    let mut in_quote = None;
    let mut escaped = false;

    for c in s.chars() {
        let char_len = c.len_utf8();

        if escaped {
            escaped = false;
            end += char_len;
            continue;
        }

        if c == '\\' {
            escaped = true;
            end += char_len;
            continue;
        }

        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            end += char_len;
            continue;
        }

        if c == '"' || c == '\'' {
            in_quote = Some(c);
            end += char_len;
            continue;
        }

        if c.is_whitespace() {
            break;
        }

        end += char_len;
    }
    end
}

fn find_line_end(s: &str) -> usize {
    s.find('\n').unwrap_or(s.len())
}

fn mask_with<F>(input: String, pattern: &str, replacement: &str, value_end: F) -> String
where
    F: Fn(&str) -> usize,
{
    let mut result = input;
    // Track search position to avoid infinite loop (replacement contains pattern)
    let mut search_start = 0;
    while search_start < result.len() {
        let Some(start) = result[search_start..].find(pattern) else {
            break;
        };
        let abs_start = search_start + start;
        let value_start = abs_start + pattern.len();
        let value_end = value_start + value_end(&result[value_start..]);

        let prefix = &result[..abs_start];
        let suffix = &result[value_end..];
        result = format!("{}{}{}", prefix, replacement, suffix);

        search_start = abs_start + replacement.len();
    }
    result
}

/// Mask secrets in a device command before it is logged or reported.
///
/// Device CLI keywords (`secret`, `password`, `key`, `community`, ...) mask
/// everything up to the end of the line, since the secret is often preceded
/// by an encryption type token. Flag and environment styles mask one value.
pub fn mask_sensitive_command(cmd: &str) -> String {
    let line_patterns = [
        (" secret ", " secret ***"),
        (" password ", " password ***"),
        (" key ", " key ***"),
        (" community ", " community ***"),
        (" auth-passphrase ", " auth-passphrase ***"),
        (" priv-passphrase ", " priv-passphrase ***"),
    ];
    let token_patterns = [
        ("PASSWORD=", "PASSWORD=***"),
        ("TOKEN=", "TOKEN=***"),
        ("API_KEY=", "API_KEY=***"),
        ("--token ", "--token ***"),
        ("--token=", "--token=***"),
        ("--password ", "--password ***"),
        ("--password=", "--password=***"),
    ];

    // Leading space lets keyword patterns match at the start of the text.
    let mut result = format!(" {}", cmd);
    for (pattern, replacement) in line_patterns {
        result = mask_with(result, pattern, replacement, find_line_end);
    }
    for (pattern, replacement) in token_patterns {
        result = mask_with(result, pattern, replacement, find_value_end);
    }
    result.split_off(1)
}

/// Flatten a composed result message onto one line and cap its length.
///
/// Secrets are masked where command text enters a message, not here:
/// keyword masks run to the end of the line and would swallow the rest of
/// the message.
pub fn sanitize_message(message: &str) -> String {
    let flattened = message
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");

    if flattened.chars().count() <= MAX_MESSAGE_LEN {
        return flattened;
    }
    let mut truncated: String = flattened.chars().take(MAX_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

/// Extract a readable message from a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
