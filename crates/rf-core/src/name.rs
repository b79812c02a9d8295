//! Stop-name normalization.
//!
//! Crowd-sourced stop names differ in case, punctuation, and number
//! formatting ("Main St. 02" vs "main st 2").  Grouping keys are produced
//! by [`normalize_group_key`], which folds those differences away; the
//! number runs are zero-padded to a fixed width so that lexicographic
//! comparison of keys agrees with numeric comparison of platform numbers.

use std::collections::BTreeSet;

/// Collapse runs of whitespace into single spaces and trim the ends.
/// Used for display names, which keep their case and punctuation.
pub fn normalize_display_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;

    for ch in name.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(ch);
        }
    }

    out
}

/// Produce the grouping key for a stop name: lowercased, punctuation
/// stripped, digit runs zero-padded to 3 characters, whitespace collapsed.
pub fn normalize_group_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut digits = String::new();
    let mut pending_space = false;

    let mut flush_digits = |out: &mut String, digits: &mut String| {
        if !digits.is_empty() {
            for _ in digits.len()..3 {
                out.push('0');
            }
            out.push_str(digits);
            digits.clear();
        }
    };

    for ch in name.chars() {
        if ch.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            digits.push(ch);
        } else {
            flush_digits(&mut out, &mut digits);
            if ch.is_whitespace() {
                pending_space = true;
            } else if ch.is_alphabetic() {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.extend(ch.to_lowercase());
            }
            // Punctuation is stripped entirely ("Gaulle'a" == "Gaullea").
        }
    }
    flush_digits(&mut out, &mut digits);

    out
}

/// The set of numbers appearing in a name.  Leading zeros are folded so
/// keys padded by [`normalize_group_key`] compare equal to raw inputs.
pub fn extract_numbers(name: &str) -> BTreeSet<u64> {
    let mut numbers = BTreeSet::new();
    let mut digits = String::new();

    for ch in name.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            if let Ok(n) = digits.parse() {
                numbers.insert(n);
            }
            digits.clear();
        }
    }
    if !digits.is_empty() {
        if let Ok(n) = digits.parse() {
            numbers.insert(n);
        }
    }

    numbers
}
