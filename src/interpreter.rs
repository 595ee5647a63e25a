//! Command Interpreter
//!
//! The model's reply is supposed to be a single call-shaped line like
//! `buy_crypto_price("BTC", 30)`. This module turns that text into a
//! [`Command`] or says precisely why it could not:
//!
//! - the text does not start with `name(...)` at all -> [`Outcome::Malformed`],
//!   the only outcome the loop retries with a fresh decision;
//! - fewer than two arguments -> [`Outcome::InsufficientArgs`], dropped
//!   without retry. This check runs before the verb lookup and therefore
//!   also swallows a well-formed `cancel_order(id)` - see the tests;
//! - the verb is not one of the six -> [`Outcome::UnknownVerb`], dropped;
//! - otherwise -> [`Outcome::Execute`] with the cleaned argument list.
//!
//! Parsing is a small hand-rolled scanner, not a regex: the verb is the
//! ASCII word at the very start of the text, the argument list runs to the
//! matching close paren, and only top-level commas separate arguments.
//! Trailing commentary after the close paren is ignored; leading
//! commentary makes the reply malformed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    BuyByPrice,
    BuyByLimit,
    SellByPrice,
    SellByLimit,
    CancelOrder,
    NoOp,
}

impl Verb {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "buy_crypto_price" => Some(Verb::BuyByPrice),
            "buy_crypto_limit" => Some(Verb::BuyByLimit),
            "sell_crypto_price" => Some(Verb::SellByPrice),
            "sell_crypto_limit" => Some(Verb::SellByLimit),
            "cancel_order" => Some(Verb::CancelOrder),
            "do_nothing" => Some(Verb::NoOp),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Verb::BuyByPrice => "buy_crypto_price",
            Verb::BuyByLimit => "buy_crypto_limit",
            Verb::SellByPrice => "sell_crypto_price",
            Verb::SellByLimit => "sell_crypto_limit",
            Verb::CancelOrder => "cancel_order",
            Verb::NoOp => "do_nothing",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A parsed command, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Execute(Command),
    InsufficientArgs { verb_name: String, args: Vec<String> },
    UnknownVerb { name: String },
    Malformed,
}

pub fn interpret(response: &str) -> Outcome {
    let Some((name, body)) = parse_call(response) else {
        return Outcome::Malformed;
    };

    let args = split_args(body);

    // The arity gate comes before the verb lookup, so a one-argument call
    // is dropped no matter what its name is.
    if args.len() < 2 {
        return Outcome::InsufficientArgs {
            verb_name: name.to_string(),
            args,
        };
    }

    match Verb::from_name(name) {
        Some(verb) => Outcome::Execute(Command { verb, args }),
        None => Outcome::UnknownVerb {
            name: name.to_string(),
        },
    }
}

/// Split `name(body)` anchored at the start of the text. Returns the verb
/// name and the text between the paren and its matching close paren.
fn parse_call(text: &str) -> Option<(&str, &str)> {
    let bytes = text.as_bytes();
    let mut name_end = 0;
    while name_end < bytes.len()
        && (bytes[name_end].is_ascii_alphanumeric() || bytes[name_end] == b'_')
    {
        name_end += 1;
    }
    if name_end == 0 || bytes.get(name_end) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    for (offset, c) in text[name_end..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[..name_end], &text[name_end + 1..name_end + offset]));
                }
            }
            _ => {}
        }
    }
    // the open paren was never closed
    None
}

/// Split the argument body on top-level commas. An empty body is an empty
/// argument list.
fn split_args(body: &str) -> Vec<String> {
    if body.is_empty() {
        return Vec::new();
    }

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (offset, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(clean_arg(&body[start..offset]));
                start = offset + 1;
            }
            _ => {}
        }
    }
    args.push(clean_arg(&body[start..]));
    args
}

/// Trim whitespace and one surrounding layer of double quotes.
fn clean_arg(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.to_string()
}
