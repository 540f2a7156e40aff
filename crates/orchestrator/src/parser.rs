//! Response recovery for raw producer output.
//!
//! The remote producer is expected to answer with a single JSON object but
//! routinely wraps it in prose, markdown fences, or truncates it. Four
//! extraction strategies run in fixed order; the first that yields a JSON
//! object wins. Strategy failures are swallowed, so this module never
//! propagates an error - total failure is reported as `None`.

use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Recover a JSON object from raw response text.
pub fn parse(text: &str) -> Option<Value> {
    let strategies: [(&str, fn(&str) -> Option<Value>); 4] = [
        ("direct", parse_direct),
        ("fenced_block", parse_fenced_block),
        ("brace_matched", parse_brace_matched),
        ("line_accumulation", parse_line_accumulation),
    ];

    for (name, strategy) in strategies {
        if let Some(value) = strategy(text) {
            debug!(strategy = name, "Recovered JSON object from response");
            return Some(value);
        }
    }

    debug!("All extraction strategies failed");
    None
}

fn parse_object(text: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(text).ok()?;
    value.is_object().then_some(value)
}

/// Strategy 1: the entire trimmed text is the object.
fn parse_direct(text: &str) -> Option<Value> {
    parse_object(text.trim())
}

/// Strategy 2: the object lives inside a triple-backtick block, optionally
/// tagged `json`. An unterminated fence swallows the rest of the text.
fn parse_fenced_block(text: &str) -> Option<Value> {
    let interior = if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        rest.find("```").map_or(rest, |end| &rest[..end])
    } else if let Some(start) = text.find("```") {
        let rest = &text[start + "```".len()..];
        rest.find("```").map_or(rest, |end| &rest[..end])
    } else {
        return None;
    };

    parse_object(interior.trim())
}

/// Strategy 3: scan from the first `{` and extract the substring where the
/// brace nesting depth returns to zero. Fails on unbalanced/truncated text.
fn parse_brace_matched(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    let end = start + offset + 1;
                    return parse_object(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Strategy 4: accumulate lines from the first one opening an object until
/// a line closes at least as many braces as it opens, then run the repair
/// pass before parsing.
fn parse_line_accumulation(text: &str) -> Option<Value> {
    let mut accumulated: Vec<&str> = Vec::new();
    let mut in_object = false;

    for line in text.lines() {
        if in_object || line.trim_start().starts_with('{') {
            in_object = true;
            accumulated.push(line);

            let opens = line.matches('{').count();
            let closes = line.matches('}').count();
            if line.trim_end().ends_with('}') && closes >= opens {
                break;
            }
        }
    }

    if accumulated.is_empty() {
        return None;
    }

    let repaired = repair(&accumulated.join("\n"));
    parse_object(&repaired)
}

/// Best-effort repair of near-JSON: strip trailing commas before a closing
/// bracket, escape quotes sandwiched inside words, drop control characters.
fn repair(text: &str) -> String {
    let trailing_comma =
        Regex::new(r",(\s*[}\]])").expect("valid trailing-comma pattern");
    let without_commas = trailing_comma.replace_all(text, "$1");

    let escaped = escape_interior_quotes(&without_commas);

    escaped
        .chars()
        .filter(|c| {
            let code = *c as u32;
            !(code < 0x20 || (0x7f..=0x9f).contains(&code))
        })
        .collect()
}

/// Escape a `"` only when both neighbors are alphanumeric - a quote glued
/// mid-word can never be structural, anything else is left alone.
fn escape_interior_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, ch) in chars.iter().enumerate() {
        if *ch == '"' {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p));
            let next = chars.get(i + 1);
            let escaped_already = prev == Some(&'\\');
            let interior = prev.is_some_and(|c| c.is_alphanumeric())
                && next.is_some_and(|c| c.is_alphanumeric());

            if interior && !escaped_already {
                out.push('\\');
            }
        }
        out.push(*ch);
    }

    out
}
