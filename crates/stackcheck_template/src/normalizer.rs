//! Shorthand tag normalization.
//!
//! Rewrites the tagged YAML dialect (`!Ref`, `!GetAtt`, ...) into text in
//! which every intrinsic function is an explicit `{"Fn::X": args}` mapping,
//! so that a plain YAML decoder can load it.
//!
//! The input is read into a queue of lines once. Each step pops one line,
//! may consume any number of the lines after it (a multi-line flow
//! collection, or the indented body of a block-form tag), and emits the
//! rewritten lines. Block bodies that may themselves contain tags are pushed
//! back to the front of the queue after re-indentation; literal block scalar
//! bodies are emitted verbatim.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::scanner::{self, LineLayout, Rewrite};

/// A transform applied to every line of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerPass {
    /// Move block-form tags onto their own line as long-form keys, and join
    /// flow collections that span several lines.
    Multiline,
    /// Rewrite single-line shorthand tags into long form.
    Elongate,
    /// Wrap `key: Fn::X: args` pairs, which a YAML decoder rejects, in braces.
    CorrectLong,
}

impl NormalizerPass {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalizerPass::Multiline => "multiline",
            NormalizerPass::Elongate => "elongate",
            NormalizerPass::CorrectLong => "correctlong",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "multiline" => Some(NormalizerPass::Multiline),
            "elongate" => Some(NormalizerPass::Elongate),
            "correctlong" => Some(NormalizerPass::CorrectLong),
            _ => None,
        }
    }
}

impl std::fmt::Display for NormalizerPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which passes the normalizer runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerOptions {
    pub passes: Vec<NormalizerPass>,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            passes: vec![
                NormalizerPass::Multiline,
                NormalizerPass::Elongate,
                NormalizerPass::CorrectLong,
            ],
        }
    }
}

impl NormalizerOptions {
    pub fn with_passes(mut self, passes: Vec<NormalizerPass>) -> Self {
        self.passes = passes;
        self
    }

    pub fn without(mut self, pass: NormalizerPass) -> Self {
        self.passes.retain(|p| *p != pass);
        self
    }

    pub fn enabled(&self, pass: NormalizerPass) -> bool {
        self.passes.contains(&pass)
    }
}

/// Rewrites shorthand tags into the canonical long form.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizerOptions,
}

/// A pending source line and its 1-based number in the original document.
type Line = (usize, String);

impl Normalizer {
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizerOptions {
        &self.options
    }

    /// Normalize raw template bytes.
    pub fn normalize(&self, source: &[u8]) -> TemplateResult<String> {
        let text = std::str::from_utf8(source)?;
        self.normalize_str(text)
    }

    /// Normalize template text.
    pub fn normalize_str(&self, text: &str) -> TemplateResult<String> {
        // Single and double quotes delimit strings alike; the canonical form
        // only uses double quotes.
        let text = text.replace('\'', "\"");

        let mut queue: VecDeque<Line> = text
            .split('\n')
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.to_string()))
            .collect();
        let mut output = Vec::with_capacity(queue.len());

        while let Some((number, line)) = queue.pop_front() {
            self.step(number, line, &mut queue, &mut output)?;
        }

        debug!(
            "Normalized template with passes [{}]",
            self.options
                .passes
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(output.join("\n"))
    }

    fn step(
        &self,
        number: usize,
        line: String,
        queue: &mut VecDeque<Line>,
        output: &mut Vec<String>,
    ) -> TemplateResult<()> {
        let layout = LineLayout::of(&line);

        if scanner::is_block_indicator(layout.value) {
            let owner = layout.owner_column();
            output.push(line);
            output.extend(take_body(queue, owner, false).into_iter().map(|(_, l)| l));
            return Ok(());
        }

        if self.options.enabled(NormalizerPass::CorrectLong) && layout.key_column.is_some() {
            if let Some((name, args)) = split_long_form(layout.value) {
                let rewrite = scanner::rewrite_long_form(name, args)
                    .map_err(|message| TemplateError::normalize(number, message))?;
                return self.apply(number, &layout, rewrite, queue, output);
            }
        }

        if layout.value.starts_with(['!', '[', '{']) && scanner::bracket_balance(layout.value) > 0 {
            if !self.options.enabled(NormalizerPass::Multiline) {
                output.push(line);
                return Ok(());
            }
            let tagged = layout.value.contains('!');
            return match join_flow(&layout, queue) {
                Some((joined, consumed)) if joined.contains('!') => {
                    queue.drain(..consumed);
                    self.step(number, joined, queue, output)
                }
                Some((_, consumed)) => {
                    output.push(line);
                    output.extend(queue.drain(..consumed).map(|(_, l)| l));
                    Ok(())
                }
                None if tagged => Err(TemplateError::normalize(
                    number,
                    "flow collection is never closed",
                )),
                None => {
                    output.push(line);
                    Ok(())
                }
            };
        }

        if !layout.value.contains('!') || !layout.value.starts_with(['!', '[', '{']) {
            output.push(line);
            return Ok(());
        }

        let rewrite = scanner::rewrite_value(layout.value)
            .map_err(|message| TemplateError::normalize(number, message))?;
        self.apply(number, &layout, rewrite, queue, output)
    }

    fn apply(
        &self,
        number: usize,
        layout: &LineLayout<'_>,
        rewrite: Rewrite,
        queue: &mut VecDeque<Line>,
        output: &mut Vec<String>,
    ) -> TemplateResult<()> {
        let original = || format!("{}{}{}", layout.prefix, layout.value, layout.trailing);

        match rewrite {
            Rewrite::Unchanged => output.push(original()),
            Rewrite::Inline(value) => {
                if self.options.enabled(NormalizerPass::Elongate)
                    || !layout.value.contains('!')
                {
                    output.push(format!("{}{}{}", layout.prefix, value, layout.trailing));
                } else {
                    output.push(original());
                }
            }
            Rewrite::Block {
                functions,
                indicator,
            } => {
                if !self.options.enabled(NormalizerPass::Multiline) {
                    output.push(original());
                    return Ok(());
                }

                let (header, column) = block_header(layout, &functions, indicator.as_deref());
                let literal = indicator.is_some();
                let body = take_body(queue, layout.owner_column(), layout.key_column.is_some());
                if body.is_empty() && !literal {
                    return Err(TemplateError::normalize(
                        number,
                        format!("{} has no argument", functions.join(" ")),
                    ));
                }

                output.extend(header);
                let body = reindent(body, column);
                if literal {
                    output.extend(body.into_iter().map(|(_, l)| l));
                } else {
                    for entry in body.into_iter().rev() {
                        queue.push_front(entry);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Split `Fn::X: args` (or `Ref: args`) sitting in value position.
fn split_long_form(value: &str) -> Option<(&str, &str)> {
    let (name, args) = match value.split_once(": ") {
        Some((name, args)) => (name, args),
        None => (value.strip_suffix(':')?, ""),
    };
    let is_function = name == "Ref"
        || name == "Condition"
        || name
            .strip_prefix("Fn::")
            .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()));
    is_function.then_some((name, args))
}

/// Header lines for a block-form function chain, and the body column.
fn block_header(
    layout: &LineLayout<'_>,
    functions: &[String],
    indicator: Option<&str>,
) -> (Vec<String>, usize) {
    let mut header = Vec::with_capacity(functions.len() + 1);
    let mut column = match layout.key_column {
        Some(key_column) => {
            header.push(format!("{}{}", layout.prefix.trim_end(), layout.trailing));
            key_column + 2
        }
        None => layout.prefix.len(),
    };

    for (idx, name) in functions.iter().enumerate() {
        let lead = if idx == 0 && layout.key_column.is_none() {
            layout.prefix.to_string()
        } else {
            " ".repeat(column)
        };
        header.push(format!("{}{}:", lead, name));
        column += 2;
    }

    if let (Some(indicator), Some(last)) = (indicator, header.last_mut()) {
        last.push(' ');
        last.push_str(indicator);
    }
    if layout.key_column.is_none() && !layout.trailing.trim().is_empty() {
        if let Some(first) = header.first_mut() {
            first.push_str(layout.trailing);
        }
    }

    (header, column)
}

/// Pop the indented body belonging to a line whose owner sits at `owner`.
///
/// Trailing blank lines are left in the queue.
fn take_body(queue: &mut VecDeque<Line>, owner: usize, compact_sequence: bool) -> Vec<Line> {
    let mut body = Vec::new();
    while let Some((_, line)) = queue.front() {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        let belongs = trimmed.trim_end().is_empty()
            || indent > owner
            || (compact_sequence && indent == owner && (trimmed.starts_with("- ") || trimmed.trim_end() == "-"));
        if !belongs {
            break;
        }
        if let Some(entry) = queue.pop_front() {
            body.push(entry);
        }
    }

    while body.last().is_some_and(|(_, l)| l.trim().is_empty()) {
        if let Some(entry) = body.pop() {
            queue.push_front(entry);
        }
    }
    body
}

/// Shift a body so its least indented line starts at `column`.
fn reindent(body: Vec<Line>, column: usize) -> Vec<Line> {
    let min = body
        .iter()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(_, l)| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(column);

    body.into_iter()
        .map(|(number, line)| {
            if line.trim().is_empty() {
                return (number, String::new());
            }
            let indent = line.len() - line.trim_start().len();
            let shifted = indent + column - min;
            (number, format!("{}{}", " ".repeat(shifted), line.trim_start()))
        })
        .collect()
}

/// Join the lines after `layout` onto it until its flow brackets balance.
///
/// Comments are dropped from every joined piece. Returns the joined line
/// and how many queued lines it consumed, or `None` when the collection is
/// never closed.
fn join_flow(layout: &LineLayout<'_>, queue: &VecDeque<Line>) -> Option<(String, usize)> {
    let mut joined = format!("{}{}", layout.prefix, layout.value);
    let mut balance = scanner::bracket_balance(layout.value);
    let mut consumed = 0;
    let mut lines = queue.iter();
    while balance > 0 {
        let (_, next) = lines.next()?;
        consumed += 1;
        let next = LineLayout::of(next);
        let piece = format!("{}{}", next.prefix, next.value);
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        joined.push(' ');
        joined.push_str(piece);
        balance = scanner::bracket_balance(LineLayout::of(&joined).value);
    }
    Some((joined, consumed))
}
