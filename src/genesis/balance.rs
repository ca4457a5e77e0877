//! Balance allocation literal parsing.
//!
//! Accepted forms (the `balance:` prefix and outer braces are optional):
//!
//! ```text
//! balance:"1000","2000"
//! balance:{"1000","2000"}
//! balance:{1000,true},{"2000",false}
//! ```
//!
//! A plain amount is a regular account; `{amount,true}` marks a validator
//! account whose amount is staked.

use std::str::FromStr;

use primitive_types::U256;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceEntry {
    pub amount: U256,
    pub is_special: bool,
}

/// Ordered, immutable list of balance entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceAllocation {
    entries: Vec<BalanceEntry>,
}

impl BalanceAllocation {
    pub fn parse(literal: &str) -> Result<Self, AppError> {
        let body = literal.trim();
        let body = body.strip_prefix("balance:").unwrap_or(body).trim();

        let mut items = split_top_level(body)?;
        // One braced item is either a single `{amount,bool}` tuple or the
        // whole list wrapped in braces (`{"1000","2000"}`, or `{1000,2000}`
        // once a shell has stripped the quotes).
        if items.len() == 1 && is_braced(items[0]) {
            let inner = &items[0][1..items[0].len() - 1];
            let parts = split_top_level(inner)?;
            if parts.len() != 2 || !looks_like_tuple(inner) {
                items = parts;
            }
        }

        let entries = items
            .into_iter()
            .filter(|item| !item.is_empty())
            .map(parse_entry)
            .collect::<Result<Vec<_>, _>>()?;

        if entries.is_empty() {
            return Err(AppError::Parse(format!(
                "no balance entries in '{literal}'"
            )));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[BalanceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BalanceEntry> {
        self.entries.iter()
    }
}

impl FromStr for BalanceAllocation {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_braced(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('{') && s.ends_with('}')
}

/// `amount,bool`: the second half is a bare boolean.
fn looks_like_tuple(inner: &str) -> bool {
    inner
        .rsplit_once(',')
        .is_some_and(|(_, flag)| matches!(flag.trim(), "true" | "false"))
}

/// Split on commas outside quotes and braces.
fn split_top_level(s: &str) -> Result<Vec<&str>, AppError> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut start = 0usize;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '{' if !in_quotes => depth += 1,
            '}' if !in_quotes => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| AppError::Parse(format!("unbalanced '}}' in '{s}'")))?;
            }
            ',' if !in_quotes && depth == 0 => {
                items.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err(AppError::Parse(format!("unterminated quote in '{s}'")));
    }
    if depth != 0 {
        return Err(AppError::Parse(format!("unbalanced '{{' in '{s}'")));
    }
    items.push(s[start..].trim());
    Ok(items)
}

fn parse_entry(item: &str) -> Result<BalanceEntry, AppError> {
    if is_braced(item) {
        let inner = &item[1..item.len() - 1];
        let (amount, flag) = inner
            .rsplit_once(',')
            .ok_or_else(|| AppError::Parse(format!("entry '{item}' must be {{amount,bool}}")))?;
        let is_special = match flag.trim() {
            "true" => true,
            "false" => false,
            other => {
                return Err(AppError::Parse(format!(
                    "entry '{item}' has invalid flag '{other}'"
                )));
            }
        };
        return Ok(BalanceEntry {
            amount: parse_amount(amount)?,
            is_special,
        });
    }
    Ok(BalanceEntry {
        amount: parse_amount(item)?,
        is_special: false,
    })
}

/// Non-negative decimal integer, optionally quoted, at most 256 bits.
pub fn parse_amount(raw: &str) -> Result<U256, AppError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim();

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Parse(format!(
            "invalid amount '{trimmed}': expected a non-negative integer"
        )));
    }
    U256::from_dec_str(digits)
        .map_err(|e| AppError::Parse(format!("invalid amount '{trimmed}': {e:?}")))
}
