//! Line layout analysis and the bracket-aware inline rewriter.
//!
//! The rewriter is a small recursive-descent scanner over one logical line.
//! It copies everything it does not understand verbatim and only replaces
//! shorthand tag spans, so nesting of `{}`, `[]` and `""` is tracked exactly
//! rather than guessed from comma positions.

use crate::intrinsic::IntrinsicFunction;

/// Byte layout of a single YAML line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLayout<'a> {
    /// Number of leading spaces.
    pub indent: usize,
    /// Everything before the value: indentation, list markers and `key: `.
    pub prefix: &'a str,
    /// The value, with the trailing comment and whitespace removed.
    pub value: &'a str,
    /// Trailing whitespace and comment after the value.
    pub trailing: &'a str,
    /// Column of the mapping key, when the line holds one.
    pub key_column: Option<usize>,
    /// Column of the innermost `- ` list marker, when present.
    pub dash_column: Option<usize>,
}

impl<'a> LineLayout<'a> {
    /// Split a line into prefix, value and trailing comment.
    pub fn of(line: &'a str) -> Self {
        let bytes = line.as_bytes();
        let indent = bytes.iter().take_while(|b| **b == b' ').count();
        let mut pos = indent;
        let mut dash_column = None;

        while pos < bytes.len() && bytes[pos] == b'-' && (pos + 1 == bytes.len() || bytes[pos + 1] == b' ')
        {
            dash_column = Some(pos);
            pos += 1;
            while pos < bytes.len() && bytes[pos] == b' ' {
                pos += 1;
            }
        }

        let mut key_column = None;
        if let Some(colon) = find_key_colon(line, pos) {
            key_column = Some(pos);
            pos = colon + 1;
            while pos < bytes.len() && bytes[pos] == b' ' {
                pos += 1;
            }
        }

        let value_end = comment_start(line, pos).unwrap_or(line.len());
        let value = line[pos..value_end].trim_end();
        let value_end = pos + value.len();

        Self {
            indent,
            prefix: &line[..pos],
            value,
            trailing: &line[value_end..],
            key_column,
            dash_column,
        }
    }

    /// Column a block body must be indented past to belong to this line.
    pub fn owner_column(&self) -> usize {
        self.key_column.or(self.dash_column).unwrap_or(self.indent)
    }
}

/// Find the `:` terminating a block mapping key starting at `start`.
fn find_key_colon(line: &str, start: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    match bytes.get(start) {
        None | Some(b'!') | Some(b'[') | Some(b'{') | Some(b'#') | Some(b'|') | Some(b'>') => {
            return None
        }
        _ => {}
    }

    let mut in_quote = false;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'"' => in_quote = !in_quote,
            b'#' if !in_quote && i > start && bytes[i - 1] == b' ' => return None,
            b':' if !in_quote && (i + 1 == bytes.len() || bytes[i + 1] == b' ') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Byte offset of a ` #` comment outside of quotes, searching from `start`.
fn comment_start(line: &str, start: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_quote = false;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'"' => in_quote = !in_quote,
            b'#' if !in_quote && (i == start || bytes[i - 1] == b' ') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Net number of open `[`/`{` brackets outside of quotes.
pub fn bracket_balance(text: &str) -> i64 {
    let bytes = text.as_bytes();
    let mut depth = 0i64;
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_quote => i += 1,
            b'"' => in_quote = !in_quote,
            b'[' | b'{' if !in_quote => depth += 1,
            b']' | b'}' if !in_quote => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    depth
}

/// Whether a value is a block scalar indicator such as `|`, `|-` or `>+`.
pub fn is_block_indicator(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some('|') | Some('>'))
        && chars.all(|c| c == '-' || c == '+' || c.is_ascii_digit())
}

/// Outcome of rewriting one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// No shorthand present; keep the line as it is.
    Unchanged,
    /// Fully rewritten single-line value.
    Inline(String),
    /// A chain of functions whose argument is the indented block that follows.
    Block {
        functions: Vec<String>,
        indicator: Option<String>,
    },
}

/// Rewrite every shorthand tag in `value` into canonical long form.
pub fn rewrite_value(value: &str) -> Result<Rewrite, String> {
    if !value.contains('!') || !value.starts_with(['!', '[', '{']) {
        return Ok(Rewrite::Unchanged);
    }

    let mut scanner = Scanner::new(value);
    let fragment = scanner.node(false)?;
    let rest = &value[scanner.pos..];

    Ok(match fragment {
        Fragment::Pending { functions, indicator } => Rewrite::Block {
            functions,
            indicator,
        },
        other => Rewrite::Inline(format!("{}{}", other.into_text(), rest)),
    })
}

/// Rewrite a long-form `Fn::X: args` pair that sits on one line after a key.
pub fn rewrite_long_form(name: &str, args: &str) -> Result<Rewrite, String> {
    let args = args.trim();
    if args.is_empty() {
        return Ok(Rewrite::Block {
            functions: vec![name.to_string()],
            indicator: None,
        });
    }
    if is_block_indicator(args) {
        return Ok(Rewrite::Block {
            functions: vec![name.to_string()],
            indicator: Some(args.to_string()),
        });
    }

    let mut scanner = Scanner::new(args);
    let fragment = scanner.node(false)?;
    if scanner.pos < args.len() {
        return Err(format!("unexpected text after argument of {}: {}", name, &args[scanner.pos..]));
    }

    Ok(match fragment {
        Fragment::Pending { mut functions, indicator } => {
            functions.insert(0, name.to_string());
            Rewrite::Block {
                functions,
                indicator,
            }
        }
        argument => Rewrite::Inline(render(name, argument)),
    })
}

#[derive(Debug)]
enum Fragment {
    /// Plain scalar, raw text.
    Plain(String),
    /// Double-quoted scalar including its quotes.
    Quoted(String),
    /// Flow collection or rewritten function.
    Structured(String),
    /// Tag chain with no inline argument.
    Pending {
        functions: Vec<String>,
        indicator: Option<String>,
    },
}

impl Fragment {
    fn into_text(self) -> String {
        match self {
            Fragment::Plain(text) | Fragment::Quoted(text) | Fragment::Structured(text) => text,
            Fragment::Pending { functions, .. } => functions.join(" "),
        }
    }
}

/// Render `{ "Name" : args }` from an argument fragment.
fn render(name: &str, argument: Fragment) -> String {
    let is_get_att = IntrinsicFunction::from_long_name(name) == Some(IntrinsicFunction::GetAtt);
    let argument = match argument {
        Fragment::Plain(text) => {
            let text = text.trim();
            if is_get_att {
                get_att_list(text)
            } else if is_numeric(text) {
                text.to_string()
            } else {
                quote(text)
            }
        }
        Fragment::Quoted(text) if is_get_att => get_att_list(&text[1..text.len() - 1]),
        Fragment::Quoted(text) | Fragment::Structured(text) => text,
        Fragment::Pending { functions, .. } => functions.join(" "),
    };
    format!("{{ \"{}\" : {} }}", name, argument)
}

fn get_att_list(text: &str) -> String {
    match text.split_once('.') {
        Some((resource, attribute)) => format!("[{}, {}]", quote(resource), quote(attribute)),
        None => quote(text),
    }
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.parse::<f64>().is_ok() && !text.starts_with('.')
}

fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn whitespace(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn node(&mut self, in_flow: bool) -> Result<Fragment, String> {
        self.whitespace();
        match self.peek() {
            None => Ok(Fragment::Plain(String::new())),
            Some(b'!') => self.tag(in_flow),
            Some(b'[') => self.sequence(),
            Some(b'{') => self.mapping(),
            Some(b'"') => self.quoted().map(Fragment::Quoted),
            Some(_) => Ok(Fragment::Plain(self.plain(in_flow))),
        }
    }

    fn tag(&mut self, in_flow: bool) -> Result<Fragment, String> {
        let start = self.pos;
        self.pos += 1;

        // Core schema tags such as `!!str` are kept as written.
        if self.peek() == Some(b'!') {
            while matches!(self.peek(), Some(c) if c != b' ' && c != b',' && c != b']' && c != b'}') {
                self.pos += 1;
            }
            let tag = &self.src[start..self.pos];
            let inner = self.node(in_flow)?;
            return Ok(Fragment::Structured(format!("{} {}", tag, inner.into_text())));
        }

        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        let name = &self.src[start + 1..self.pos];
        let function = IntrinsicFunction::from_tag(name)
            .ok_or_else(|| format!("unknown shorthand tag !{}", name))?;

        self.whitespace();
        let rest = &self.src[self.pos..];
        let no_argument = match self.peek() {
            None => true,
            Some(b',') | Some(b']') | Some(b'}') => in_flow,
            _ => false,
        };

        if no_argument {
            if in_flow {
                return Err(format!("!{} has no argument", name));
            }
            return Ok(Fragment::Pending {
                functions: vec![function.long_name().to_string()],
                indicator: None,
            });
        }

        if !in_flow && is_block_indicator(rest) {
            self.pos = self.bytes.len();
            return Ok(Fragment::Pending {
                functions: vec![function.long_name().to_string()],
                indicator: Some(rest.to_string()),
            });
        }

        match self.node(in_flow)? {
            Fragment::Pending {
                mut functions,
                indicator,
            } => {
                functions.insert(0, function.long_name().to_string());
                Ok(Fragment::Pending {
                    functions,
                    indicator,
                })
            }
            argument => Ok(Fragment::Structured(render(function.long_name(), argument))),
        }
    }

    fn sequence(&mut self) -> Result<Fragment, String> {
        let mut out = String::from("[");
        self.pos += 1;
        loop {
            out.push_str(self.whitespace());
            match self.peek() {
                None => return Err("unbalanced [ in flow sequence".to_string()),
                Some(b']') => {
                    self.pos += 1;
                    out.push(']');
                    return Ok(Fragment::Structured(out));
                }
                _ => {}
            }

            out.push_str(&self.node(true)?.into_text());
            out.push_str(self.whitespace());
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    out.push(',');
                }
                Some(b']') => {}
                None => return Err("unbalanced [ in flow sequence".to_string()),
                Some(c) => {
                    return Err(format!("unexpected '{}' in flow sequence", c as char));
                }
            }
        }
    }

    fn mapping(&mut self) -> Result<Fragment, String> {
        let mut out = String::from("{");
        self.pos += 1;
        loop {
            out.push_str(self.whitespace());
            match self.peek() {
                None => return Err("unbalanced { in flow mapping".to_string()),
                Some(b'}') => {
                    self.pos += 1;
                    out.push('}');
                    return Ok(Fragment::Structured(out));
                }
                Some(b'"') => out.push_str(&self.quoted()?),
                Some(_) => out.push_str(&self.plain_key()),
            }

            out.push_str(self.whitespace());
            if self.peek() == Some(b':') {
                self.pos += 1;
                out.push(':');
                out.push_str(self.whitespace());
                if !matches!(self.peek(), Some(b',') | Some(b'}') | None) {
                    out.push_str(&self.node(true)?.into_text());
                }
                out.push_str(self.whitespace());
            }

            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    out.push(',');
                }
                Some(b'}') => {}
                None => return Err("unbalanced { in flow mapping".to_string()),
                Some(c) => return Err(format!("unexpected '{}' in flow mapping", c as char)),
            }
        }
    }

    fn quoted(&mut self) -> Result<String, String> {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                b'\\' => self.pos += 1,
                b'"' => return Ok(self.src[start..self.pos].to_string()),
                _ => {}
            }
        }
        Err("unterminated double-quoted string".to_string())
    }

    fn plain(&mut self, in_flow: bool) -> String {
        let start = self.pos;
        if in_flow {
            while matches!(self.peek(), Some(c) if c != b',' && c != b']' && c != b'}') {
                self.pos += 1;
            }
        } else {
            self.pos = self.bytes.len();
        }
        let raw = &self.src[start..self.pos];
        let trimmed = raw.trim_end();
        self.pos = start + trimmed.len();
        trimmed.to_string()
    }

    fn plain_key(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let next = self.bytes.get(self.pos + 1).copied();
            let ends_key = c == b':' && matches!(next, None | Some(b' ') | Some(b',') | Some(b'}'));
            if ends_key || c == b',' || c == b'}' {
                break;
            }
            self.pos += 1;
        }
        let trimmed = self.src[start..self.pos].trim_end();
        self.pos = start + trimmed.len();
        trimmed.to_string()
    }
}
