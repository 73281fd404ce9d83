//! Record keys for lanes and nodes, using string interning for the lane side
//!
//! Lane keys are strings in graph documents (`"semestre1"` and friends) and
//! are compared constantly during validation and layout, so they are interned
//! once and carried as a [`LaneKey`] symbol. Node keys are plain integers
//! ([`NodeKey`]); keys generated by the model are negative, matching the
//! convention of the documents this editor exchanges with its host.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for efficient lane key storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

/// Interned lane key
///
/// Provides efficient storage and comparison of lane key strings through
/// string interning.
///
/// # Examples
///
/// ```
/// use malla_core::key::LaneKey;
///
/// let first = LaneKey::new("semestre1");
/// let again = LaneKey::new("semestre1");
///
/// assert_eq!(first, again);
/// assert!(first == "semestre1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneKey(DefaultSymbol);

impl LaneKey {
    /// Creates a `LaneKey` from &str.
    pub fn new(name: &str) -> Self {
        let mut interner = INTERNER
            .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
            .lock()
            .expect("Failed to acquire interner lock");
        let symbol = interner.get_or_intern(name);
        Self(symbol)
    }

    /// Parses the trailing decimal digits of the key, if any.
    ///
    /// Earlier document versions encoded a lane's ordinal position in its
    /// key (`"semestre7"` is the 7th lane); loading such documents falls
    /// back to this parse when no explicit rank is present.
    ///
    /// # Examples
    ///
    /// ```
    /// use malla_core::key::LaneKey;
    ///
    /// assert_eq!(LaneKey::new("semestre7").trailing_number(), Some(7));
    /// assert_eq!(LaneKey::new("semestre10").trailing_number(), Some(10));
    /// assert_eq!(LaneKey::new("electives").trailing_number(), None);
    /// ```
    pub fn trailing_number(self) -> Option<u32> {
        let text = self.to_string();
        let stem = text.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &text[stem.len()..];
        if digits.is_empty() {
            None
        } else {
            digits.parse().ok()
        }
    }
}

impl fmt::Display for LaneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = INTERNER
            .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
            .lock()
            .expect("Failed to acquire interner lock");
        let str_value = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        write!(f, "{}", str_value)
    }
}

impl std::str::FromStr for LaneKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for LaneKey {
    /// Creates a `LaneKey` from a string slice
    ///
    /// This is a convenience implementation that calls `LaneKey::new`.
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for LaneKey {
    /// Allows direct comparison with string slices: `key == "string"`
    fn eq(&self, other: &str) -> bool {
        let interner = INTERNER
            .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
            .lock()
            .expect("Failed to acquire interner lock");
        let self_str = interner
            .resolve(self.0)
            .expect("Symbol should exist in interner");
        self_str == other
    }
}

impl PartialEq<&str> for LaneKey {
    /// Allows direct comparison with string references: `key == &string`
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// Integer node key
///
/// Graph documents carry node keys as JSON numbers; keys assigned by the
/// model itself count down from -1 so they never collide with host-assigned
/// keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(i64);

impl NodeKey {
    /// Creates a node key from its numeric value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the numeric value of the key.
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}
