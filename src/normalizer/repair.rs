//! Best-effort repair of near-JSON.
//!
//! Single pass, string aware. Handles what models actually produce: raw
//! control characters inside strings, missing commas between values,
//! trailing commas and typographic quotes. Anything else is left for the
//! parser to reject.

const LEFT_DOUBLE: char = '\u{201C}';
const RIGHT_DOUBLE: char = '\u{201D}';
const LEFT_SINGLE: char = '\u{2018}';
const RIGHT_SINGLE: char = '\u{2019}';

fn is_bare(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '.')
}

/// Whether the last emitted token can end a value
fn ends_value(last: Option<char>) -> bool {
  match last {
    Some('"' | '}' | ']') => true,
    Some(c) => c.is_ascii_alphanumeric(),
    None => false,
  }
}

pub fn repair_json(input: &str) -> String {
  let mut out = String::with_capacity(input.len() + 16);
  let mut in_string = false;
  // String was opened with a typographic quote and must close with one
  let mut smart = false;
  let mut escaped = false;
  let mut in_bare = false;
  // Output position of a comma that may still turn out to be trailing
  let mut pending_comma: Option<usize> = None;
  let mut last: Option<char> = None;

  for c in input.chars() {
    if in_string {
      if escaped {
        out.push(c);
        escaped = false;
        continue;
      }
      match c {
        '\\' => {
          out.push(c);
          escaped = true;
        }
        '"' if !smart => {
          out.push('"');
          in_string = false;
          last = Some('"');
        }
        '"' => out.push_str("\\\""),
        LEFT_DOUBLE | RIGHT_DOUBLE if smart => {
          out.push('"');
          in_string = false;
          last = Some('"');
        }
        LEFT_SINGLE | RIGHT_SINGLE => out.push('\''),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push(c),
      }
      continue;
    }

    if c.is_whitespace() {
      in_bare = false;
      out.push(c);
      continue;
    }

    if c == ',' {
      in_bare = false;
      if pending_comma.is_none() && !matches!(last, None | Some('[' | '{' | ':' | ',')) {
        pending_comma = Some(out.len());
        out.push(',');
        last = Some(',');
      }
      continue;
    }

    let opens_string = matches!(c, '"' | LEFT_DOUBLE | RIGHT_DOUBLE);
    let starts_value = opens_string || matches!(c, '{' | '[') || (is_bare(c) && !in_bare);

    if let Some(pos) = pending_comma.take() {
      if matches!(c, '}' | ']') {
        out.remove(pos);
      }
    } else if starts_value && ends_value(last) {
      out.push(',');
    }

    if opens_string {
      out.push('"');
      in_string = true;
      smart = c != '"';
      in_bare = false;
    } else {
      out.push(c);
      in_bare = is_bare(c);
      last = Some(c);
    }
  }

  out
}
