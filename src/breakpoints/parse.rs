/*!
 * Breakpoint Specifications
 * Parses `[<file>:]<line> [=|>|>=|% <n>] [<condition>]` and
 * `[<file>:]<line> [<expression>]`
 */

use super::types::HitCondition;
use crate::core::errors::BreakpointError;
use crate::core::types::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakSpec {
    pub location: Location,
    pub hit: Option<HitCondition>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSpec {
    pub location: Location,
    pub display: Option<String>,
}

pub fn parse_break(args: &str, default_file: &str) -> Result<BreakSpec, BreakpointError> {
    let (word, rest) = split_word(args);
    let location = parse_location(word, default_file)?;
    let (hit, rest) = parse_hit(rest)?;
    Ok(BreakSpec {
        location,
        hit,
        condition: non_empty(rest),
    })
}

pub fn parse_trace(args: &str, default_file: &str) -> Result<TraceSpec, BreakpointError> {
    let (word, rest) = split_word(args);
    Ok(TraceSpec {
        location: parse_location(word, default_file)?,
        display: non_empty(rest),
    })
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_location(word: &str, default_file: &str) -> Result<Location, BreakpointError> {
    if word.is_empty() {
        return Err(BreakpointError::Syntax("missing line number".to_string()));
    }
    let (file, line) = match word.rsplit_once(':') {
        Some((file, line)) if !file.is_empty() => (file, line),
        Some(_) => return Err(BreakpointError::Syntax(format!("missing file in '{}'", word))),
        None => (default_file, word),
    };
    let line: u32 = line
        .parse()
        .map_err(|_| BreakpointError::Syntax(format!("'{}' is not a line number", line)))?;
    if line == 0 {
        return Err(BreakpointError::Syntax("lines are numbered from 1".to_string()));
    }
    Ok(Location::line(file, line))
}

/// An optional hit condition at the start of `text`, either spaced
/// (`>= 3`) or attached (`>=3`)
fn parse_hit(text: &str) -> Result<(Option<HitCondition>, &str), BreakpointError> {
    let (word, rest) = split_word(text);
    let (op, attached) = match [">=", ">", "=", "%"]
        .iter()
        .find(|op| word.starts_with(**op))
    {
        Some(op) => (*op, &word[op.len()..]),
        None => return Ok((None, text)),
    };

    let (digits, rest) = if attached.is_empty() {
        split_word(rest)
    } else {
        (attached, rest)
    };
    let n: u64 = digits.parse().map_err(|_| {
        BreakpointError::Syntax(format!("hit condition '{}' needs a count, got '{}'", op, digits))
    })?;

    let hit = match op {
        ">=" => HitCondition::Ge(n),
        ">" => HitCondition::Gt(n),
        "=" => HitCondition::Eq(n),
        _ if n == 0 => {
            return Err(BreakpointError::Syntax("'% 0' would never stop".to_string()))
        }
        _ => HitCondition::Mod(n),
    };
    Ok((Some(hit), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_uses_default_file() {
        let spec = parse_break("12", "main.spec").unwrap();
        assert_eq!(spec.location, Location::line("main.spec", 12));
        assert_eq!(spec.hit, None);
        assert_eq!(spec.condition, None);
    }

    #[test]
    fn test_file_hit_and_condition() {
        let spec = parse_break("lib.spec:30 % 3 x > 1 and y = \"a b\"", "main.spec").unwrap();
        assert_eq!(spec.location, Location::line("lib.spec", 30));
        assert_eq!(spec.hit, Some(HitCondition::Mod(3)));
        assert_eq!(spec.condition.as_deref(), Some("x > 1 and y = \"a b\""));
    }

    #[test]
    fn test_attached_hit_condition() {
        assert_eq!(parse_break("4 >=2", "m").unwrap().hit, Some(HitCondition::Ge(2)));
        assert_eq!(parse_break("4 >5", "m").unwrap().hit, Some(HitCondition::Gt(5)));
        assert_eq!(parse_break("4 = 1", "m").unwrap().hit, Some(HitCondition::Eq(1)));
    }

    #[test]
    fn test_condition_without_hit() {
        let spec = parse_break("4 x = 2", "m").unwrap();
        assert_eq!(spec.hit, None);
        assert_eq!(spec.condition.as_deref(), Some("x = 2"));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_break("", "m").is_err());
        assert!(parse_break("abc", "m").is_err());
        assert!(parse_break("0", "m").is_err());
        assert!(parse_break(":3", "m").is_err());
        assert!(parse_break("3 % 0", "m").is_err());
        assert!(parse_break("3 >= x", "m").is_err());
    }

    #[test]
    fn test_trace_display() {
        let spec = parse_trace("f.spec:9 len s", "m").unwrap();
        assert_eq!(spec.location, Location::line("f.spec", 9));
        assert_eq!(spec.display.as_deref(), Some("len s"));
        assert_eq!(parse_trace("9", "m").unwrap().display, None);
    }
}
