use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of the listing is rendered, as reported by the page itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStatus {
    pub loaded: usize,
    pub total: usize,
}

impl ProgressStatus {
    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}", self.loaded, self.total)
    }
}

/// Plain digits, or digits grouped in threes by commas (`1,204`).
fn is_grouped_number(token: &str) -> bool {
    let mut groups = token.split(',');
    let head = groups.next().unwrap_or_default();
    let all_digits = |g: &str| !g.is_empty() && g.chars().all(|c| c.is_ascii_digit());
    if !all_digits(head) {
        return false;
    }
    let mut rest = groups.peekable();
    if rest.peek().is_none() {
        return true;
    }
    head.len() <= 3 && rest.all(|g| g.len() == 3 && all_digits(g))
}

fn parse_count(token: &str, text: &str) -> Result<usize> {
    if !is_grouped_number(token) {
        return Err(Error::Parse(format!(
            "progress count {:?} in {:?} is not a number",
            token, text
        )));
    }
    token
        .replace(',', "")
        .parse::<usize>()
        .map_err(|e| Error::Parse(format!("progress count {:?} in {:?}: {}", token, text, e)))
}

/// Parses text shaped like `"30 of 321 loaded"`: first token loaded, third total.
pub fn parse_progress(text: &str) -> Result<ProgressStatus> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(Error::Parse(format!(
            "progress text {:?} has {} tokens, expected at least 3",
            text,
            tokens.len()
        )));
    }

    Ok(ProgressStatus {
        loaded: parse_count(tokens[0], text)?,
        total: parse_count(tokens[2], text)?,
    })
}
