//! Pure ranking of lock candidates.
//!
//! Candidates are ordered by the sequence suffix the coordination service
//! appended at creation. Suffixes are fixed-width zero-padded decimals, so
//! they are compared as strings and never parsed.
//!
//! All functions are deterministic and side-effect free.

use crate::error::{LockError, Result};

/// A sibling that counts as a contender, with its sequence suffix split off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contender<'a> {
    pub sequence: &'a str,
    pub name: &'a str,
}

/// Outcome of ranking one candidate against its siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ranking {
    /// No contender with a lower sequence exists; the lock is held.
    First,
    /// Name of the nearest contender with a lower sequence.
    Behind { predecessor: String },
}

/// Sequence suffix of `name` after the first matching prefix.
///
/// The prefix is stripped exactly once.
pub fn sequence_suffix<'a>(name: &'a str, prefixes: &[&str]) -> Option<&'a str> {
    prefixes
        .iter()
        .find_map(|prefix| name.strip_prefix(*prefix))
}

/// Siblings carrying one of the `blocking` prefixes, ascending by sequence.
pub fn rank_contenders<'a>(siblings: &'a [String], blocking: &[&str]) -> Vec<Contender<'a>> {
    let mut contenders: Vec<Contender<'a>> = siblings
        .iter()
        .filter_map(|name| {
            sequence_suffix(name, blocking).map(|sequence| Contender {
                sequence,
                name: name.as_str(),
            })
        })
        .collect();
    contenders.sort_by(|a, b| a.sequence.cmp(b.sequence).then_with(|| a.name.cmp(b.name)));
    contenders
}

/// Rank `own_name` among `siblings`.
///
/// `own_prefix` is the prefix `own_name` was created with; its sequence is
/// compared against every sibling carrying a `blocking` prefix. The
/// predecessor is the contender with the highest sequence below our own.
///
/// The candidate must appear in `siblings`: it was created before the listing
/// was taken, so its absence means the service or the caller is inconsistent.
pub fn rank(own_name: &str, own_prefix: &str, siblings: &[String], blocking: &[&str]) -> Result<Ranking> {
    if !siblings.iter().any(|sibling| sibling == own_name) {
        return Err(LockError::ProtocolInvariantViolated(format!(
            "candidate {} missing from listing of {} siblings",
            own_name,
            siblings.len()
        )));
    }
    let Some(own_sequence) = own_name.strip_prefix(own_prefix) else {
        return Err(LockError::ProtocolInvariantViolated(format!(
            "candidate {} does not carry prefix {}",
            own_name, own_prefix
        )));
    };

    let predecessor = rank_contenders(siblings, blocking)
        .into_iter()
        .take_while(|contender| contender.sequence < own_sequence)
        .last();

    Ok(match predecessor {
        Some(contender) => Ranking::Behind {
            predecessor: contender.name.to_string(),
        },
        None => Ranking::First,
    })
}
