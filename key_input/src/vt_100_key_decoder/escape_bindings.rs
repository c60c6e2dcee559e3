// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// cspell:words rxvt

//! Static exact-match escape bindings.
//!
//! These are the fixed sequences that legacy terminals send for unmodified navigation
//! and function keys, plus the rxvt and Linux console variants. Lookups are exact
//! matches only. Anything with parameters (`ESC [ 1 ; 5 A`) is handled by
//! [`super::csi_keys`], and the two tables agree on every sequence both can parse.
//!
//! [`is_binding_prefix`] answers whether a buffer could still grow into one of these
//! bindings, which is one of the reasons the resolver keeps waiting for more bytes.

use super::{KeyModifiers, KeyPress, NamedKey};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::LazyLock;

/// Bracketed paste start marker, `ESC [ 200 ~`.
pub const PASTE_START_MARKER: &[u8] = b"\x1b[200~";

/// Bracketed paste end marker, `ESC [ 201 ~`.
pub const PASTE_END_MARKER: &[u8] = b"\x1b[201~";

/// Exact sequence (including the leading `ESC`) to key.
pub static ESCAPE_BINDINGS: LazyLock<FxHashMap<&'static [u8], KeyPress>> =
    LazyLock::new(build_bindings);

/// Every strict prefix of every entry in [`ESCAPE_BINDINGS`].
pub static ESCAPE_BINDING_PREFIXES: LazyLock<FxHashSet<&'static [u8]>> =
    LazyLock::new(|| {
        let mut acc = FxHashSet::default();
        for &sequence in ESCAPE_BINDINGS.keys() {
            for end in 1..sequence.len() {
                acc.insert(&sequence[..end]);
            }
        }
        acc
    });

#[must_use]
pub fn lookup_escape_binding(sequence: &[u8]) -> Option<KeyPress> {
    ESCAPE_BINDINGS.get(sequence).copied()
}

#[must_use]
pub fn is_binding_prefix(sequence: &[u8]) -> bool {
    ESCAPE_BINDING_PREFIXES.contains(sequence)
}

fn build_bindings() -> FxHashMap<&'static [u8], KeyPress> {
    use NamedKey::{Begin, Delete, Down, End, Enter, FocusIn, FocusOut, Home, Insert,
                   Left, PageDown, PageUp, Right, Tab, Up};

    let named = KeyPress::named;
    let function = KeyPress::function;
    let shift = |key: NamedKey| KeyPress::named(key).with_modifiers(KeyModifiers::SHIFT);
    let ctrl = |key: NamedKey| KeyPress::named(key).with_modifiers(KeyModifiers::CTRL);

    let table: [(&'static [u8], KeyPress); 84] = [
        // CSI cursor keys.
        (b"\x1b[A", named(Up)),
        (b"\x1b[B", named(Down)),
        (b"\x1b[C", named(Right)),
        (b"\x1b[D", named(Left)),
        (b"\x1b[H", named(Home)),
        (b"\x1b[F", named(End)),
        (b"\x1b[E", named(Begin)),
        (b"\x1b[Z", shift(Tab)),
        (b"\x1b[I", named(FocusIn)),
        (b"\x1b[O", named(FocusOut)),
        // SS3 (application cursor mode) keys.
        (b"\x1bOA", named(Up)),
        (b"\x1bOB", named(Down)),
        (b"\x1bOC", named(Right)),
        (b"\x1bOD", named(Left)),
        (b"\x1bOH", named(Home)),
        (b"\x1bOF", named(End)),
        (b"\x1bOE", named(Begin)),
        (b"\x1bOM", named(Enter)),
        (b"\x1bOP", function(1)),
        (b"\x1bOQ", function(2)),
        (b"\x1bOR", function(3)),
        (b"\x1bOS", function(4)),
        // VT220 tilde keys.
        (b"\x1b[1~", named(Home)),
        (b"\x1b[2~", named(Insert)),
        (b"\x1b[3~", named(Delete)),
        (b"\x1b[4~", named(End)),
        (b"\x1b[5~", named(PageUp)),
        (b"\x1b[6~", named(PageDown)),
        (b"\x1b[7~", named(Home)),
        (b"\x1b[8~", named(End)),
        (b"\x1b[11~", function(1)),
        (b"\x1b[12~", function(2)),
        (b"\x1b[13~", function(3)),
        (b"\x1b[14~", function(4)),
        (b"\x1b[15~", function(5)),
        (b"\x1b[17~", function(6)),
        (b"\x1b[18~", function(7)),
        (b"\x1b[19~", function(8)),
        (b"\x1b[20~", function(9)),
        (b"\x1b[21~", function(10)),
        (b"\x1b[23~", function(11)),
        (b"\x1b[24~", function(12)),
        (b"\x1b[25~", function(13)),
        (b"\x1b[26~", function(14)),
        (b"\x1b[28~", function(15)),
        (b"\x1b[29~", function(16)),
        (b"\x1b[31~", function(17)),
        (b"\x1b[32~", function(18)),
        (b"\x1b[33~", function(19)),
        (b"\x1b[34~", function(20)),
        // Linux console.
        (b"\x1b[[A", function(1)),
        (b"\x1b[[B", function(2)),
        (b"\x1b[[C", function(3)),
        (b"\x1b[[D", function(4)),
        (b"\x1b[[E", function(5)),
        // rxvt shifted and ctrl cursor keys.
        (b"\x1b[a", shift(Up)),
        (b"\x1b[b", shift(Down)),
        (b"\x1b[c", shift(Right)),
        (b"\x1b[d", shift(Left)),
        (b"\x1bOa", ctrl(Up)),
        (b"\x1bOb", ctrl(Down)),
        (b"\x1bOc", ctrl(Right)),
        (b"\x1bOd", ctrl(Left)),
        // rxvt `$` (shift) and `^` (ctrl) editing keys.
        (b"\x1b[2$", shift(Insert)),
        (b"\x1b[3$", shift(Delete)),
        (b"\x1b[5$", shift(PageUp)),
        (b"\x1b[6$", shift(PageDown)),
        (b"\x1b[7$", shift(Home)),
        (b"\x1b[8$", shift(End)),
        (b"\x1b[2^", ctrl(Insert)),
        (b"\x1b[3^", ctrl(Delete)),
        (b"\x1b[5^", ctrl(PageUp)),
        (b"\x1b[6^", ctrl(PageDown)),
        (b"\x1b[7^", ctrl(Home)),
        (b"\x1b[8^", ctrl(End)),
        // xterm shifted and ctrl cursor keys, the most common modified forms.
        (b"\x1b[1;2A", shift(Up)),
        (b"\x1b[1;2B", shift(Down)),
        (b"\x1b[1;2C", shift(Right)),
        (b"\x1b[1;2D", shift(Left)),
        (b"\x1b[1;5A", ctrl(Up)),
        (b"\x1b[1;5B", ctrl(Down)),
        (b"\x1b[1;5C", ctrl(Right)),
        (b"\x1b[1;5D", ctrl(Left)),
        (b"\x1b[3;5~", ctrl(Delete)),
    ];

    table.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(b"\x1b[A", "Up")]
    #[test_case(b"\x1bOB", "Down")]
    #[test_case(b"\x1b[Z", "S-Tab")]
    #[test_case(b"\x1b[3~", "Delete")]
    #[test_case(b"\x1b[24~", "F12")]
    #[test_case(b"\x1b[34~", "F20")]
    #[test_case(b"\x1b[[E", "F5")]
    #[test_case(b"\x1bOM", "Enter")]
    #[test_case(b"\x1b[c", "S-Right")]
    #[test_case(b"\x1bOd", "C-Left")]
    #[test_case(b"\x1b[5^", "C-PageUp")]
    #[test_case(b"\x1b[8$", "S-End")]
    #[test_case(b"\x1b[I", "FocusIn")]
    fn test_lookup(sequence: &[u8], expected: &str) {
        let key = lookup_escape_binding(sequence).unwrap();
        assert_eq!(key.to_key_name().as_str(), expected);
    }

    #[test]
    fn test_no_duplicate_sequences() {
        // `collect()` silently overwrites duplicates, so compare sizes.
        assert_eq!(ESCAPE_BINDINGS.len(), 84);
    }

    #[test]
    fn test_prefixes() {
        assert!(is_binding_prefix(b"\x1b"));
        assert!(is_binding_prefix(b"\x1b["));
        assert!(is_binding_prefix(b"\x1b[["));
        assert!(is_binding_prefix(b"\x1b[1"));
        assert!(is_binding_prefix(b"\x1bO"));
        // Complete entries are not strict prefixes.
        assert!(!is_binding_prefix(b"\x1b[A"));
        assert!(!is_binding_prefix(b"\x1bx"));
    }

    #[test]
    fn test_paste_start_is_not_a_binding() {
        assert_eq!(lookup_escape_binding(PASTE_START_MARKER), None);
        assert_eq!(lookup_escape_binding(PASTE_END_MARKER), None);
    }
}
