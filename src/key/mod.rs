//! Key-name resolution and key identity comparison.
//!
//! # Overview
//!
//! [`KeyIdentity`] is the normalized, comparable form of a key: either a
//! single character or one of a fixed set of canonical named keys.
//! [`resolve`] turns human-entered text (`"F7"`, `" return "`, `"a"`) into a
//! `KeyIdentity`; [`from_rdev`] maps raw OS key events onto the same
//! identity space so that event matching and configuration parsing agree.
//!
//! Resolution order:
//!
//! 1. function-key pattern (`f` + digits) checked against the named-key set
//! 2. synonym table (`return` → `enter`, `escape` → `esc`, …)
//! 3. any canonical named-key token verbatim
//! 4. single-character input becomes a [`KeyIdentity::Character`]
//! 5. anything else fails with [`ParseError::Unrecognized`]
//!
//! Multi-character unrecognized input always fails — it is never truncated
//! to its first character.

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// ParseError
// ---------------------------------------------------------------------------

/// Errors produced by [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input was empty (or whitespace-only).
    #[error("key name is empty")]
    Empty,

    /// The input is not a known key name and not a single character.
    #[error("unrecognized key name: {0:?}")]
    Unrecognized(String),
}

// ---------------------------------------------------------------------------
// KeyIdentity
// ---------------------------------------------------------------------------

/// Normalized identity of a key.
///
/// Two identities are *identical* iff they compare equal.  Two identities
/// are *same-family* when they are side-variants of the same logical key
/// (`ctrl_l` / `ctrl_r` / `ctrl`) — see [`identities_conflict`].
///
/// Construct via [`resolve`] (from text) or [`from_rdev`] (from an OS
/// event); both produce the same canonical tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyIdentity {
    /// A printable character key, case-folded (`'a'`, `'7'`, `'+'`).
    Character(char),
    /// A canonical named key (`"f7"`, `"ctrl_l"`, `"space"`).
    Named(&'static str),
}

impl KeyIdentity {
    /// The canonical textual form of this identity.
    ///
    /// Feeding the result back through [`resolve`] yields an identical
    /// identity.
    pub fn canonical_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyIdentity::Character(c) => write!(f, "{c}"),
            KeyIdentity::Named(name) => f.write_str(name),
        }
    }
}

/// The reserved emergency-stop key.  Fixed, not configurable.
pub const EMERGENCY_STOP: KeyIdentity = KeyIdentity::Named("esc");

// ---------------------------------------------------------------------------
// Canonical named-key set
// ---------------------------------------------------------------------------

/// Every canonical named-key token [`resolve`] accepts verbatim.
///
/// Side variants (`_l` / `_r`) and their base names are all present so a
/// user can bind either a specific side or the whole family.
const NAMED_KEYS: &[&str] = &[
    "shift", "shift_l", "shift_r", "ctrl", "ctrl_l", "ctrl_r", "alt", "alt_l", "alt_r", "space",
    "enter", "tab", "esc", "backspace", "caps_lock", "delete", "home", "end", "page_up",
    "page_down", "up", "down", "left", "right", "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8",
    "f9", "f10", "f11", "f12",
];

/// Accepted spellings that map onto a canonical token.
const SYNONYMS: &[(&str, &str)] = &[
    ("return", "enter"),
    ("escape", "esc"),
    ("capslock", "caps_lock"),
    ("control", "ctrl"),
    ("spacebar", "space"),
];

fn canonical(token: &str) -> Option<&'static str> {
    NAMED_KEYS.iter().copied().find(|&name| name == token)
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

/// Parse human-entered text into a [`KeyIdentity`].
///
/// Input is trimmed and case-folded first.  See the module docs for the
/// resolution order.
///
/// # Errors
///
/// - [`ParseError::Empty`] — blank input.
/// - [`ParseError::Unrecognized`] — multi-character input that matches no
///   rule.  Never silently truncated.
///
/// # Examples
///
/// ```
/// use autopress::key::{resolve, KeyIdentity};
///
/// assert_eq!(resolve(" F7 "),     Ok(KeyIdentity::Named("f7")));
/// assert_eq!(resolve("Return"),   Ok(KeyIdentity::Named("enter")));
/// assert_eq!(resolve("A"),        Ok(KeyIdentity::Character('a')));
/// assert!(resolve("not-a-key").is_err());
/// ```
pub fn resolve(raw: &str) -> Result<KeyIdentity, ParseError> {
    let folded = raw.trim().to_lowercase();
    if folded.is_empty() {
        return Err(ParseError::Empty);
    }

    // (a) function-key pattern: "f" followed by digits must name a key in
    // the supported set — "f0" or "f25" fail rather than fall through.
    if let Some(digits) = folded.strip_prefix('f') {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return canonical(&folded)
                .map(KeyIdentity::Named)
                .ok_or(ParseError::Unrecognized(folded));
        }
    }

    // (b) synonyms
    if let Some(&(_, name)) = SYNONYMS.iter().find(|&&(alias, _)| alias == folded) {
        return Ok(KeyIdentity::Named(name));
    }

    // (c) canonical tokens verbatim
    if let Some(name) = canonical(&folded) {
        return Ok(KeyIdentity::Named(name));
    }

    // (d) single character
    let mut chars = folded.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(KeyIdentity::Character(c));
    }

    // (e) no guessing beyond this point
    Err(ParseError::Unrecognized(folded))
}

// ---------------------------------------------------------------------------
// identities_conflict
// ---------------------------------------------------------------------------

/// Base name of a named key with any `_l` / `_r` side qualifier stripped.
///
/// Only the side qualifier is stripped, so `page_up` and `page_down` remain
/// distinct families.
fn family(name: &str) -> &str {
    name.strip_suffix("_l")
        .or_else(|| name.strip_suffix("_r"))
        .unwrap_or(name)
}

/// True when two identities are identical or same-family.
///
/// Used both to reject self-targeting configurations and to match incoming
/// key events against the configured initiate key (so binding `ctrl`
/// matches either physical control key).
///
/// ```
/// use autopress::key::{identities_conflict, KeyIdentity};
///
/// let ctrl_l = KeyIdentity::Named("ctrl_l");
/// let ctrl_r = KeyIdentity::Named("ctrl_r");
/// assert!(identities_conflict(&ctrl_l, &ctrl_r));
///
/// let a = KeyIdentity::Character('a');
/// let b = KeyIdentity::Character('b');
/// assert!(!identities_conflict(&a, &b));
/// ```
pub fn identities_conflict(a: &KeyIdentity, b: &KeyIdentity) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (KeyIdentity::Named(x), KeyIdentity::Named(y)) => family(x) == family(y),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// from_rdev
// ---------------------------------------------------------------------------

/// Map a raw `rdev` key event onto the identity space used by [`resolve`].
///
/// Returns `None` for keys outside the supported set (media keys, keypad,
/// platform oddities) — the dispatcher ignores those events.
pub fn from_rdev(key: rdev::Key) -> Option<KeyIdentity> {
    use rdev::Key::*;

    let named = |name: &'static str| Some(KeyIdentity::Named(name));
    let ch = |c: char| Some(KeyIdentity::Character(c));

    match key {
        // Modifiers — sided, so family matching can fold them together
        ShiftLeft => named("shift_l"),
        ShiftRight => named("shift_r"),
        ControlLeft => named("ctrl_l"),
        ControlRight => named("ctrl_r"),
        Alt => named("alt_l"),
        AltGr => named("alt_r"),

        // Named keys
        Space => named("space"),
        Return => named("enter"),
        Tab => named("tab"),
        Escape => named("esc"),
        Backspace => named("backspace"),
        CapsLock => named("caps_lock"),
        Delete => named("delete"),
        Home => named("home"),
        End => named("end"),
        PageUp => named("page_up"),
        PageDown => named("page_down"),
        UpArrow => named("up"),
        DownArrow => named("down"),
        LeftArrow => named("left"),
        RightArrow => named("right"),

        // Function keys
        F1 => named("f1"),
        F2 => named("f2"),
        F3 => named("f3"),
        F4 => named("f4"),
        F5 => named("f5"),
        F6 => named("f6"),
        F7 => named("f7"),
        F8 => named("f8"),
        F9 => named("f9"),
        F10 => named("f10"),
        F11 => named("f11"),
        F12 => named("f12"),

        // Letters
        KeyA => ch('a'),
        KeyB => ch('b'),
        KeyC => ch('c'),
        KeyD => ch('d'),
        KeyE => ch('e'),
        KeyF => ch('f'),
        KeyG => ch('g'),
        KeyH => ch('h'),
        KeyI => ch('i'),
        KeyJ => ch('j'),
        KeyK => ch('k'),
        KeyL => ch('l'),
        KeyM => ch('m'),
        KeyN => ch('n'),
        KeyO => ch('o'),
        KeyP => ch('p'),
        KeyQ => ch('q'),
        KeyR => ch('r'),
        KeyS => ch('s'),
        KeyT => ch('t'),
        KeyU => ch('u'),
        KeyV => ch('v'),
        KeyW => ch('w'),
        KeyX => ch('x'),
        KeyY => ch('y'),
        KeyZ => ch('z'),

        // Digit row
        Num0 => ch('0'),
        Num1 => ch('1'),
        Num2 => ch('2'),
        Num3 => ch('3'),
        Num4 => ch('4'),
        Num5 => ch('5'),
        Num6 => ch('6'),
        Num7 => ch('7'),
        Num8 => ch('8'),
        Num9 => ch('9'),

        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
