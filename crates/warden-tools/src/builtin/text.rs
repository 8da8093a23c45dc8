//! Text and data tools: in-file search/replace, arithmetic, JSON
//! inspection, and base64 codecs.

use async_trait::async_trait;
use base64::Engine;
use std::collections::BTreeMap;
use std::sync::Arc;

use warden_core::{ParamSpec, Result, RiskLevel, ToolCategory, ToolDescriptor};

use super::{optional, required};
use crate::registry::{ToolHandler, ToolRegistry};

pub fn register(registry: &ToolRegistry) {
    registry.register(
        ToolDescriptor::new(
            "search_in_file",
            "Find lines in a file containing a pattern; returns line numbers",
            ToolCategory::TextData,
            RiskLevel::Low,
        )
        .param("path", ParamSpec::string("File to search"))
        .param("pattern", ParamSpec::string("Substring to look for")),
        Arc::new(SearchInFile),
    );
    registry.register(
        ToolDescriptor::new(
            "replace_in_file",
            "Replace every occurrence of a string in a file",
            ToolCategory::TextData,
            RiskLevel::Medium,
        )
        .param("path", ParamSpec::string("File to edit"))
        .param("search", ParamSpec::string("Exact text to find"))
        .param("replacement", ParamSpec::string("Text to replace it with")),
        Arc::new(ReplaceInFile),
    );
    registry.register(
        ToolDescriptor::new(
            "calculate",
            "Evaluate an arithmetic expression (+ - * / % ^, parentheses)",
            ToolCategory::TextData,
            RiskLevel::Low,
        )
        .param("expression", ParamSpec::string("Expression to evaluate")),
        Arc::new(Calculate),
    );
    registry.register(
        ToolDescriptor::new(
            "parse_json",
            "Parse a JSON string and pretty-print it, optionally drilling \
             into a JSON pointer like /items/0/name",
            ToolCategory::TextData,
            RiskLevel::Low,
        )
        .param("json", ParamSpec::string("JSON text to parse"))
        .param("pointer", ParamSpec::string("JSON pointer to extract").optional()),
        Arc::new(ParseJson),
    );
    registry.register(
        ToolDescriptor::new(
            "encode_base64",
            "Base64-encode a UTF-8 string",
            ToolCategory::TextData,
            RiskLevel::Low,
        )
        .param("text", ParamSpec::string("Text to encode")),
        Arc::new(EncodeBase64),
    );
    registry.register(
        ToolDescriptor::new(
            "decode_base64",
            "Decode a base64 string back to UTF-8 text",
            ToolCategory::TextData,
            RiskLevel::Low,
        )
        .param("data", ParamSpec::string("Base64 data to decode")),
        Arc::new(DecodeBase64),
    );
}

struct SearchInFile;

#[async_trait]
impl ToolHandler for SearchInFile {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "search_in_file")?;
        let pattern = required(args, "pattern", "search_in_file")?;
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => return Ok(format!("Error: reading {path}: {e}")),
        };
        let matches: Vec<String> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains(pattern))
            .take(100)
            .map(|(i, line)| format!("{}: {}", i + 1, line))
            .collect();
        if matches.is_empty() {
            Ok(format!("No matches for '{pattern}' in {path}"))
        } else {
            Ok(format!("{} matches:\n{}", matches.len(), matches.join("\n")))
        }
    }
}

struct ReplaceInFile;

#[async_trait]
impl ToolHandler for ReplaceInFile {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let path = required(args, "path", "replace_in_file")?;
        let search = required(args, "search", "replace_in_file")?;
        let replacement = args
            .get("replacement")
            .map(String::as_str)
            .unwrap_or_default();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) => return Ok(format!("Error: reading {path}: {e}")),
        };
        let occurrences = content.matches(search).count();
        if occurrences == 0 {
            return Ok(format!("Error: '{search}' not found in {path}"));
        }
        let updated = content.replace(search, replacement);
        match tokio::fs::write(path, updated).await {
            Ok(()) => Ok(format!("Replaced {occurrences} occurrence(s) in {path}")),
            Err(e) => Ok(format!("Error: writing {path}: {e}")),
        }
    }
}

struct Calculate;

#[async_trait]
impl ToolHandler for Calculate {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let expression = required(args, "expression", "calculate")?;
        match eval(expression) {
            Ok(value) => {
                // Render integers without a trailing .0
                if value.fract() == 0.0 && value.abs() < 1e15 {
                    Ok(format!("{}", value as i64))
                } else {
                    Ok(format!("{value}"))
                }
            }
            Err(e) => Ok(format!("Error: {e}")),
        }
    }
}

struct ParseJson;

#[async_trait]
impl ToolHandler for ParseJson {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let json = required(args, "json", "parse_json")?;
        let value: serde_json::Value = match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => return Ok(format!("Error: invalid JSON: {e}")),
        };
        let value = match optional(args, "pointer") {
            Some(pointer) => match value.pointer(pointer) {
                Some(v) => v.clone(),
                None => return Ok(format!("Error: pointer '{pointer}' not found")),
            },
            None => value,
        };
        Ok(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
    }
}

struct EncodeBase64;

#[async_trait]
impl ToolHandler for EncodeBase64 {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let text = args.get("text").map(String::as_str).unwrap_or_default();
        Ok(base64::engine::general_purpose::STANDARD.encode(text))
    }
}

struct DecodeBase64;

#[async_trait]
impl ToolHandler for DecodeBase64 {
    async fn run(&self, args: &BTreeMap<String, String>) -> Result<String> {
        let data = required(args, "data", "decode_base64")?;
        match base64::engine::general_purpose::STANDARD.decode(data.trim()) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Ok(text),
                Err(_) => Ok("Error: decoded data is not valid UTF-8".into()),
            },
            Err(e) => Ok(format!("Error: invalid base64: {e}")),
        }
    }
}

// ── Expression evaluator ───────────────────────────────────────
//
// Recursive descent over `+ - * / % ^`, parentheses, and unary minus.
// `^` binds tightest and associates right.

fn eval(input: &str) -> std::result::Result<f64, String> {
    let tokens: Vec<char> = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!(
            "unexpected character '{}' at position {}",
            parser.tokens[parser.pos], parser.pos
        ));
    }
    Ok(value)
}

struct Parser {
    tokens: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn expr(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op) = self.peek() {
            match op {
                '+' => {
                    self.bump();
                    value += self.term()?;
                }
                '-' => {
                    self.bump();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.power()?;
        while let Some(op) = self.peek() {
            match op {
                '*' => {
                    self.bump();
                    value *= self.power()?;
                }
                '/' => {
                    self.bump();
                    let rhs = self.power()?;
                    if rhs == 0.0 {
                        return Err("division by zero".into());
                    }
                    value /= rhs;
                }
                '%' => {
                    self.bump();
                    let rhs = self.power()?;
                    if rhs == 0.0 {
                        return Err("division by zero".into());
                    }
                    value %= rhs;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn power(&mut self) -> std::result::Result<f64, String> {
        let base = self.unary()?;
        if self.peek() == Some('^') {
            self.bump();
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> std::result::Result<f64, String> {
        if self.peek() == Some('-') {
            self.bump();
            return Ok(-self.unary()?);
        }
        self.atom()
    }

    fn atom(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some('(') => {
                self.bump();
                let value = self.expr()?;
                if self.bump() != Some(')') {
                    return Err("missing closing parenthesis".into());
                }
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while self
                    .peek()
                    .map(|c| c.is_ascii_digit() || c == '.')
                    .unwrap_or(false)
                {
                    self.bump();
                }
                let text: String = self.tokens[start..self.pos].iter().collect();
                text.parse().map_err(|_| format!("invalid number '{text}'"))
            }
            Some(c) => Err(format!("unexpected character '{c}'")),
            None => Err("unexpected end of expression".into()),
        }
    }
}
