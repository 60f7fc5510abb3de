//! Path and name normalization shared by the catalog, the matcher and the
//! folder content selector.
//!
//! Catalog paths always use `/` as separator, whatever the platform the
//! raw file list was produced on.

use regex::Regex;

use crate::{error::Result, text_util::collapse_words};

/// Label that catalog exports prepend to folder and file names.
pub const DEFAULT_NOISE_PREFIX: &str = "Sherlock";

/// Cleans display names by stripping the noise prefix and underscores.
///
/// Every comparison between names goes through the same cleaner so a
/// cleaned string is never compared with a raw one.
#[derive(Debug, Clone, Default)]
pub struct NameCleaner {
    prefix: Option<Regex>,
}

impl NameCleaner {
    /// Build a cleaner for the given noise label. `None` or a blank label
    /// disables prefix stripping.
    ///
    /// # Examples
    ///
    /// ```
    /// use dossier::normalize::NameCleaner;
    ///
    /// let cleaner = NameCleaner::new(Some("Sherlock")).unwrap();
    /// assert_eq!(cleaner.clean("sherlock - Ivanov_Petr_01.01"), "Ivanov Petr 01.01");
    /// ```
    pub fn new(label: Option<&str>) -> Result<Self> {
        let prefix = match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => Some(Regex::new(&format!(
                r"(?i)^\s*{}\s*[—_-]?\s*",
                regex::escape(label)
            ))?),
            None => None,
        };
        Ok(Self { prefix })
    }

    /// Remove the leading noise label, if present.
    pub fn strip_prefix<'a>(&self, name: &'a str) -> &'a str {
        match &self.prefix {
            Some(re) => match re.find(name) {
                Some(m) => &name[m.end()..],
                None => name,
            },
            None => name,
        }
    }

    /// Display form: prefix stripped, underscores turned into spaces,
    /// surrounding whitespace trimmed.
    pub fn clean(&self, name: &str) -> String {
        self.strip_prefix(name).replace('_', " ").trim().to_string()
    }

    /// Comparison form: the display form lowercased with separator runs
    /// collapsed to single spaces.
    pub fn comparable(&self, name: &str) -> String {
        collapse_words(self.strip_prefix(name))
    }
}

/// Turn a raw file-system path into a catalog path anchored at
/// `base_folder`.
///
/// Separators are unified, empty and `.` segments dropped and `..`
/// resolved; then everything before the first case-insensitive occurrence
/// of `base_folder` is cut off. Returns `None` when the base folder does
/// not occur in the path.
pub fn normalize_path(raw: &str, base_folder: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || base_folder.is_empty() {
        return None;
    }

    let unified = raw.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    let normalized = segments.join("/");

    let start = find_ignore_case(&normalized, base_folder)?;
    Some(normalized[start..].to_string())
}

/// Byte offset of the first case-insensitive occurrence of `needle`.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .char_indices()
        .map(|(idx, _)| idx)
        .find(|&idx| starts_with_ignore_case(&haystack[idx..], needle))
}

fn starts_with_ignore_case(haystack: &str, needle: &str) -> bool {
    let mut hay = haystack.chars().flat_map(char::to_lowercase);
    needle
        .chars()
        .flat_map(char::to_lowercase)
        .all(|c| hay.next() == Some(c))
}

/// Last segment of a catalog path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Everything before the last separator; empty for a single segment.
pub fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(head, _)| head).unwrap_or("")
}

/// Split a file name into stem and extension (with its dot).
///
/// Leading dots belong to the stem, so `.profile` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let lead = name.len() - name.trim_start_matches('.').len();
    match name[lead..].rfind('.') {
        Some(idx) => name.split_at(lead + idx),
        None => (name, ""),
    }
}

/// Whether `path` lies strictly inside `folder`.
pub fn is_under(path: &str, folder: &str) -> bool {
    path.strip_prefix(folder)
        .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
}
