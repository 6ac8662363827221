//! Parsing of solver stdout: the sat/unsat verdict line and the
//! `(define-fun ...)` entries of a model.
//!
//! This is not a general S-expression parser. Model output from Z3 and
//! cvc5 for a QF_BV problem with only constant declarations is regular
//! enough to scan directly: every assignment is a zero-argument
//! `define-fun` whose body is a boolean or bitvector literal.

use crate::error::SolverError;
use crate::model::{Model, ModelValue};
use crate::result::SolverResult;

/// Parse a complete solver run: verdict first, then the model if sat.
pub fn parse_solver_output(stdout: &str, stderr: &str) -> Result<SolverResult, SolverError> {
    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let verdict = match lines.next() {
        Some(v) => v,
        None => {
            if stderr.trim().is_empty() {
                return Err(SolverError::Parse("empty solver output".to_string()));
            }
            return Err(SolverError::Process(stderr.trim().to_string()));
        }
    };

    match verdict {
        "sat" => {
            let rest_start = stdout.find("sat").map(|i| i + 3).unwrap_or(0);
            let model = parse_model(&stdout[rest_start..])?;
            Ok(SolverResult::Sat(Some(model)))
        }
        "unsat" => Ok(SolverResult::Unsat),
        "unknown" | "timeout" => {
            let reason = if stderr.trim().is_empty() {
                verdict.to_string()
            } else {
                stderr.trim().to_string()
            };
            Ok(SolverResult::Unknown(reason))
        }
        other => Err(SolverError::Parse(format!("unexpected verdict: {other}"))),
    }
}

/// Scan for every `(define-fun name () sort value)` in the text.
pub fn parse_model(text: &str) -> Result<Model, SolverError> {
    let mut model = Model::new();
    for (i, _) in text.match_indices("(define-fun") {
        let mut cursor = Cursor::new(&text[i + "(define-fun".len()..]);
        let name = cursor.symbol()?;
        cursor.balanced_group()?; // argument list, always ()
        cursor.sort()?;
        let value = cursor.value()?;
        model.insert(name, value);
    }
    Ok(model)
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(rest: &'a str) -> Self {
        Self { rest }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn err(&self, what: &str) -> SolverError {
        let context: String = self.rest.chars().take(40).collect();
        SolverError::Parse(format!("expected {what} at: {context:?}"))
    }

    /// A plain symbol or a `|quoted|` one; quoting is stripped.
    fn symbol(&mut self) -> Result<String, SolverError> {
        self.skip_ws();
        if let Some(stripped) = self.rest.strip_prefix('|') {
            let end = stripped
                .find('|')
                .ok_or_else(|| self.err("closing | of quoted symbol"))?;
            let name = stripped[..end].to_string();
            self.rest = &stripped[end + 1..];
            return Ok(name);
        }
        let end = self
            .rest
            .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(self.err("symbol"));
        }
        let name = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        Ok(name)
    }

    /// A balanced parenthesized group, discarded.
    fn balanced_group(&mut self) -> Result<(), SolverError> {
        self.skip_ws();
        if !self.rest.starts_with('(') {
            return Err(self.err("("));
        }
        let mut depth = 0usize;
        for (i, c) in self.rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        self.rest = &self.rest[i + 1..];
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.err("balanced group"))
    }

    /// A sort, discarded: either an identifier or a parenthesized form
    /// like `(_ BitVec 8)`.
    fn sort(&mut self) -> Result<(), SolverError> {
        self.skip_ws();
        if self.rest.starts_with('(') {
            self.balanced_group()
        } else {
            self.symbol().map(|_| ())
        }
    }

    /// A literal value: `true`, `false`, `#x...`, `#b...`, or
    /// `(_ bvN width)`.
    fn value(&mut self) -> Result<ModelValue, SolverError> {
        self.skip_ws();
        if let Some(rest) = self.rest.strip_prefix("true") {
            self.rest = rest;
            return Ok(ModelValue::Bool(true));
        }
        if let Some(rest) = self.rest.strip_prefix("false") {
            self.rest = rest;
            return Ok(ModelValue::Bool(false));
        }
        if let Some(rest) = self.rest.strip_prefix("#x") {
            let (bits, remaining) = take_radix(rest, 16)?;
            self.rest = remaining;
            return Ok(ModelValue::BitVec(bits));
        }
        if let Some(rest) = self.rest.strip_prefix("#b") {
            let (bits, remaining) = take_radix(rest, 2)?;
            self.rest = remaining;
            return Ok(ModelValue::BitVec(bits));
        }
        if self.rest.starts_with('(') {
            // (_ bvN width)
            self.rest = self.rest[1..].trim_start();
            if !self.rest.starts_with('_') {
                return Err(self.err("(_ bvN w) literal"));
            }
            self.rest = self.rest[1..].trim_start();
            let rest = self
                .rest
                .strip_prefix("bv")
                .ok_or_else(|| self.err("bv prefix"))?;
            let (bits, remaining) = take_radix(rest, 10)?;
            self.rest = remaining;
            self.skip_ws();
            let close = self
                .rest
                .find(')')
                .ok_or_else(|| self.err("closing ) of bv literal"))?;
            self.rest = &self.rest[close + 1..];
            return Ok(ModelValue::BitVec(bits));
        }
        Err(self.err("boolean or bitvector literal"))
    }
}

fn take_radix(text: &str, radix: u32) -> Result<(u64, &str), SolverError> {
    let end = text
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(text.len());
    if end == 0 {
        return Err(SolverError::Parse(format!(
            "expected base-{radix} digits at: {:?}",
            text.chars().take(40).collect::<String>()
        )));
    }
    let bits = u64::from_str_radix(&text[..end], radix)
        .map_err(|e| SolverError::Parse(format!("bad base-{radix} literal: {e}")))?;
    Ok((bits, &text[end..]))
}
