//! [`GestureLibrary`] – the fixed table of gestures a response may request.
//!
//! Maps a short symbolic name (`"nod"`, `"dance"`) to the animation path the
//! robot plays.  Built once before a session starts and shared read-only
//! afterwards; the directive parser rejects any name not found here.

use std::collections::BTreeMap;

/// Gesture name → animation path.
///
/// Backed by a `BTreeMap` so [`names`][GestureLibrary::names] is stable,
/// which keeps the gesture list embedded in prompts identical across runs.
#[derive(Debug, Clone, Default)]
pub struct GestureLibrary {
    entries: BTreeMap<String, String>,
}

/// The stock NAO animations the performance uses.
const NAO_GESTURES: &[(&str, &str)] = &[
    ("hysteric", "animations/Stand/Emotions/Positive/Happy_1"),
    ("fist_pump", "animations/Stand/Emotions/Positive/Happy_2"),
    ("victory", "animations/Stand/Emotions/Positive/Happy_3"),
    ("fast_nod", "animations/Stand/Emotions/Positive/Happy_4"),
    ("dance", "animations/Stand/Emotions/Positive/Hysterical_1"),
    ("clap", "animations/Stand/Emotions/Positive/Excited_1"),
    ("bored", "animations/Stand/Emotions/Negative/Bored_1"),
    ("fear", "animations/Stand/Emotions/Negative/Fear_1"),
    ("embarassed", "animations/Stand/Emotions/Neutral/Embarrassed_1"),
    ("hey_1", "animations/Stand/Gestures/Hey_1"),
    ("hey_2", "animations/Stand/Gestures/Hey_2"),
    ("headshake_1", "animations/Stand/Gestures/No_2"),
    ("headshake_2", "animations/Stand/Gestures/No_8"),
    ("stop", "animations/Stand/Gestures/No_3"),
    ("nod", "animations/Stand/Gestures/Yes_1"),
    ("flex", "animations/Stand/Gestures/YouKnowWhat_1"),
    ("cross_arms", "animations/Stand/Gestures/YouKnowWhat_2"),
    ("you", "animations/Stand/Gestures/You_4"),
    ("calmdown", "animations/Stand/Gestures/CalmDown_1"),
    ("desperate", "animations/Stand/Gestures/Desperate_5"),
    ("everything", "animations/Stand/Gestures/Everything_3"),
    ("wiggle", "animations/Stand/Gestures/Excited_1"),
    ("pondering", "animations/Stand/Gestures/Thinking_2"),
    ("thinking", "animations/Stand/Gestures/Thinking_3"),
    ("pleading", "Please_2"),
];

impl GestureLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// The library shipped with the NAO performance.
    pub fn nao_defaults() -> Self {
        NAO_GESTURES.iter().copied().collect()
    }

    /// Register `name` → `animation`.  A previous entry with the same name is
    /// replaced.
    pub fn insert(&mut self, name: impl Into<String>, animation: impl Into<String>) {
        self.entries.insert(name.into(), animation.into());
    }

    /// Animation path for `name`, if registered.
    pub fn animation(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, A: Into<String>> FromIterator<(N, A)> for GestureLibrary {
    fn from_iter<I: IntoIterator<Item = (N, A)>>(iter: I) -> Self {
        let mut lib = GestureLibrary::new();
        for (name, animation) in iter {
            lib.insert(name, animation);
        }
        lib
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nao_defaults_has_full_table() {
        let lib = GestureLibrary::nao_defaults();
        assert_eq!(lib.len(), 25);
        assert_eq!(lib.animation("nod"), Some("animations/Stand/Gestures/Yes_1"));
        assert_eq!(lib.animation("pleading"), Some("Please_2"));
    }

    #[test]
    fn unknown_name_is_absent() {
        let lib = GestureLibrary::nao_defaults();
        assert!(!lib.contains("flibber"));
        assert_eq!(lib.animation("flibber"), None);
    }

    #[test]
    fn names_are_sorted() {
        let lib: GestureLibrary = [("wave", "a"), ("bow", "b"), ("nod", "c")]
            .into_iter()
            .collect();
        let names: Vec<&str> = lib.names().collect();
        assert_eq!(names, vec!["bow", "nod", "wave"]);
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let mut lib = GestureLibrary::new();
        lib.insert("nod", "old");
        lib.insert("nod", "new");
        assert_eq!(lib.len(), 1);
        assert_eq!(lib.animation("nod"), Some("new"));
    }
}
