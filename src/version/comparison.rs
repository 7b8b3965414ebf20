//! Debian version ordering.
//!
//! Implements the comparison `dpkg --compare-versions` uses: epochs compare
//! numerically, then upstream versions, then revisions, each with the
//! `verrevcmp` algorithm where non-digit runs compare character by character
//! (letters before other symbols, `~` before everything including the end of
//! the string) and digit runs compare numerically.
//!
//! # Examples
//!
//! ```rust,no_run
//! use deb_updater::version::comparison::compare_fragments;
//! use std::cmp::Ordering;
//!
//! assert_eq!(compare_fragments("1.0~rc1", "1.0"), Ordering::Less);
//! assert_eq!(compare_fragments("1.10", "1.9"), Ordering::Greater);
//! assert_eq!(compare_fragments("1.002", "1.2"), Ordering::Equal);
//! ```

use std::cmp::Ordering;

/// Weight of a single character in a non-digit run.
const fn order(c: u8) -> i32 {
    if c.is_ascii_digit() {
        0
    } else if c.is_ascii_alphabetic() {
        c as i32
    } else if c == b'~' {
        -1
    } else if c != 0 {
        c as i32 + 256
    } else {
        0
    }
}

/// Byte at `index`, or `0` past the end.
fn at(s: &[u8], index: usize) -> u8 {
    s.get(index).copied().unwrap_or(0)
}

/// Compare two upstream-version or revision fragments.
#[must_use]
pub fn compare_fragments(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0, 0);

    while i < a.len() || j < b.len() {
        // Non-digit prefix
        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = order(at(a, i));
            let bc = order(at(b, j));
            if ac != bc {
                return ac.cmp(&bc);
            }
            i += 1;
            j += 1;
        }

        while at(a, i) == b'0' {
            i += 1;
        }
        while at(b, j) == b'0' {
            j += 1;
        }

        // Digit run: the longer run wins, otherwise the first differing digit
        let mut first_diff = Ordering::Equal;
        while at(a, i).is_ascii_digit() && at(b, j).is_ascii_digit() {
            if first_diff == Ordering::Equal {
                first_diff = a[i].cmp(&b[j]);
            }
            i += 1;
            j += 1;
        }

        if at(a, i).is_ascii_digit() {
            return Ordering::Greater;
        }
        if at(b, j).is_ascii_digit() {
            return Ordering::Less;
        }
        if first_diff != Ordering::Equal {
            return first_diff;
        }
    }

    Ordering::Equal
}
