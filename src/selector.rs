//! Decides which files accompany a resolved person folder.
//!
//! A folder contributes at most one summary text and a list of attachable
//! documents. Documents are admitted in catalog order until either the
//! per-folder count budget or the cumulative size budget would be
//! exceeded.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    catalog::CatalogIndex,
    error::Result,
    handles::{Handle, HandleTable},
    normalize,
    text_util::{SHORT_SUMMARY_CHARS, take_chars},
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub const DEFAULT_SUMMARY_PATTERNS: &[&str] = &["*.txt", "*.txt_"];
pub const DEFAULT_ATTACHABLE_PATTERNS: &[&str] = &["*.pdf", "*.pdf_"];

/// `bytes / 1048576`.
pub fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Size of a file in megabytes.
pub fn file_size_mb(path: &Path) -> std::io::Result<f64> {
    Ok(megabytes(std::fs::metadata(path)?.len()))
}

/// Read at most `max_chars` characters from the start of `path`.
///
/// Only the bytes those characters can occupy are read. Returns the text
/// and whether the file continues past it. Bytes that are not UTF-8 fail
/// the read only when they fall inside the kept prefix.
fn read_head(path: &Path, max_chars: usize) -> std::io::Result<(String, bool)> {
    let window = max_chars.saturating_mul(4).saturating_add(1);
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?)
        .take(window as u64)
        .read_to_end(&mut bytes)?;

    let decoded = match std::str::from_utf8(&bytes) {
        Ok(text) => text,
        Err(e) => {
            let valid = &bytes[..e.valid_up_to()];
            let valid = std::str::from_utf8(valid).unwrap_or_default();
            if e.error_len().is_some() && valid.chars().count() < max_chars {
                return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e));
            }
            valid
        }
    };

    let (head, cut) = take_chars(decoded, max_chars);
    let more = cut || head.len() < bytes.len();
    Ok((head.to_string(), more))
}

/// File-name patterns that classify catalog entries.
#[derive(Debug, Clone)]
pub struct FileRules {
    summary: GlobSet,
    attachable: GlobSet,
}

impl FileRules {
    /// Compile case-insensitive glob patterns matched against base names.
    pub fn new<S: AsRef<str>>(summary: &[S], attachable: &[S]) -> Result<Self> {
        Ok(Self {
            summary: compile(summary)?,
            attachable: compile(attachable)?,
        })
    }

    pub fn is_summary(&self, file_name: &str) -> bool {
        self.summary.is_match(file_name)
    }

    pub fn is_attachable(&self, file_name: &str) -> bool {
        self.attachable.is_match(file_name)
    }
}

impl Default for FileRules {
    fn default() -> Self {
        Self {
            summary: compile(DEFAULT_SUMMARY_PATTERNS)
                .unwrap_or_else(|_| GlobSet::empty()),
            attachable: compile(DEFAULT_ATTACHABLE_PATTERNS)
                .unwrap_or_else(|_| GlobSet::empty()),
        }
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern.as_ref())
                .case_insensitive(true)
                .literal_separator(true)
                .build()?,
        );
    }
    Ok(builder.build()?)
}

/// Per-folder delivery budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FolderBudget {
    pub max_count: usize,
    pub max_total_mb: f64,
}

impl Default for FolderBudget {
    fn default() -> Self {
        Self {
            max_count: 10,
            max_total_mb: 50.0,
        }
    }
}

/// How much of the summary file to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryForm {
    /// The first 500 characters, with `...` appended when cut.
    Short,
    /// The entire file.
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub path: PathBuf,
    pub text: String,
    pub truncated: bool,
}

/// Outcome of looking up and reading a folder's summary.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryLookup {
    Found(Summary),
    /// A summary file exists but holds only whitespace.
    Blank(PathBuf),
    Missing,
    Unreadable { path: PathBuf, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedDocument {
    pub handle: Handle,
    pub catalog_path: String,
    pub path: PathBuf,
    pub display_name: String,
    pub size_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderContents {
    pub folder: String,
    pub display_name: String,
    pub summary: Option<Summary>,
    pub summary_error: Option<String>,
    pub documents: Vec<SelectedDocument>,
    pub truncation_notices: Vec<String>,
}

/// Result of selecting a folder's files.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// The folder exists but holds no summary and no deliverable document.
    Empty { folder: String, display_name: String },
    Contents(FolderContents),
}

/// Picks the summary and the documents delivered for a folder.
#[derive(Debug, Clone)]
pub struct FolderContentSelector {
    root: PathBuf,
    rules: FileRules,
    budget: FolderBudget,
}

impl FolderContentSelector {
    /// `root` is the directory catalog paths are resolved against.
    pub fn new(root: PathBuf, rules: FileRules, budget: FolderBudget) -> Self {
        Self {
            root,
            rules,
            budget,
        }
    }

    pub fn budget(&self) -> FolderBudget {
        self.budget
    }

    /// Absolute location of a catalog path.
    pub fn resolve(&self, catalog_path: &str) -> PathBuf {
        self.root.join(catalog_path)
    }

    /// The catalog entry holding the folder's summary.
    ///
    /// Prefers a summary file whose cleaned stem and the folder's cleaned
    /// name are prefixes of one another; otherwise the first summary file
    /// in the folder. Catalog order decides between candidates.
    pub fn summary_entry<'a>(
        &self,
        catalog: &'a CatalogIndex,
        folder: &'a str,
    ) -> Option<&'a str> {
        let cleaner = catalog.cleaner();
        let folder_name = cleaner.comparable(normalize::basename(folder));
        let mut fallback = None;

        for entry in catalog.entries_under(folder) {
            let file_name = normalize::basename(entry);
            if !self.rules.is_summary(file_name) {
                continue;
            }
            let (stem, _) = normalize::split_extension(file_name);
            let stem = cleaner.comparable(stem);
            if stem.starts_with(&folder_name) || folder_name.starts_with(&stem) {
                return Some(entry);
            }
            fallback.get_or_insert(entry);
        }

        fallback
    }

    /// Locate and read the folder's summary.
    pub fn read_summary(
        &self,
        catalog: &CatalogIndex,
        folder: &str,
        form: SummaryForm,
    ) -> SummaryLookup {
        let Some(entry) = self.summary_entry(catalog, folder) else {
            return SummaryLookup::Missing;
        };
        let path = self.resolve(entry);

        let read = match form {
            SummaryForm::Short => read_head(&path, SHORT_SUMMARY_CHARS),
            SummaryForm::Full => std::fs::read_to_string(&path).map(|text| (text, false)),
        };
        let (content, cut) = match read {
            Ok(read) => read,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read summary");
                return SummaryLookup::Unreadable {
                    path,
                    error: e.to_string(),
                };
            }
        };

        let mut text = content.trim().to_string();
        if text.is_empty() {
            warn!(path = %path.display(), "summary file is empty");
            return SummaryLookup::Blank(path);
        }
        if cut {
            text.push_str("...");
        }

        SummaryLookup::Found(Summary {
            path,
            text,
            truncated: cut,
        })
    }

    /// Select the full summary and the admitted documents of `folder`.
    ///
    /// Each admitted document receives a fresh handle from `handles`.
    pub fn select(
        &self,
        catalog: &CatalogIndex,
        folder: &str,
        handles: &HandleTable<PathBuf>,
    ) -> Selection {
        let display_name = catalog.display_name(folder);

        let (summary, summary_error) =
            match self.read_summary(catalog, folder, SummaryForm::Full) {
                SummaryLookup::Found(summary) => (Some(summary), None),
                SummaryLookup::Unreadable { error, .. } => {
                    (None, Some(format!("Could not read the summary file: {error}")))
                }
                SummaryLookup::Blank(_) | SummaryLookup::Missing => (None, None),
            };

        let mut documents = Vec::new();
        let mut truncation_notices = Vec::new();
        let mut total_mb = 0.0;

        for entry in catalog.entries_under(folder) {
            let file_name = normalize::basename(entry);
            if !self.rules.is_attachable(file_name) {
                continue;
            }

            let path = self.resolve(entry);
            let size_mb = match file_size_mb(&path) {
                Ok(size) => size,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not stat document, skipped");
                    continue;
                }
            };

            if documents.len() >= self.budget.max_count {
                truncation_notices.push(format!(
                    "Reached the limit of {} documents per folder; the remaining documents were not sent.",
                    self.budget.max_count
                ));
                break;
            }
            if total_mb + size_mb > self.budget.max_total_mb {
                truncation_notices.push(format!(
                    "Reached the total size limit of {} MB per folder; the remaining documents were not sent.",
                    self.budget.max_total_mb
                ));
                break;
            }

            total_mb += size_mb;
            let handle = handles.allocate(path.clone());
            debug!(handle, path = %path.display(), size_mb, "document admitted");
            documents.push(SelectedDocument {
                handle,
                catalog_path: entry.to_string(),
                path,
                display_name: catalog.cleaner().clean(file_name),
                size_mb,
            });
        }

        if summary.is_none()
            && summary_error.is_none()
            && documents.is_empty()
            && truncation_notices.is_empty()
        {
            warn!(folder, "folder has no summary and no documents");
            return Selection::Empty {
                folder: folder.to_string(),
                display_name,
            };
        }

        Selection::Contents(FolderContents {
            folder: folder.to_string(),
            display_name,
            summary,
            summary_error,
            documents,
            truncation_notices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::NameCleaner;

    struct Fixture {
        _tmp: tempfile::TempDir,
        root: PathBuf,
        catalog: CatalogIndex,
    }

    /// Write `files` (catalog path, size in bytes or text) under a temp root
    /// and index them.
    fn fixture(files: &[(&str, FileBody)]) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        for (rel, body) in files {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            match body {
                FileBody::Text(text) => std::fs::write(&path, text).unwrap(),
                FileBody::Bytes(n) => std::fs::write(&path, vec![0u8; *n]).unwrap(),
                FileBody::Absent => {}
            }
        }
        let lines: Vec<String> =
            files.iter().map(|(rel, _)| format!("/mnt/{rel}")).collect();
        let catalog = CatalogIndex::build(
            lines,
            "Base",
            NameCleaner::new(Some("Sherlock")).unwrap(),
        );
        Fixture {
            _tmp: tmp,
            root,
            catalog,
        }
    }

    enum FileBody {
        Text(&'static str),
        Bytes(usize),
        Absent,
    }

    const MB: usize = 1024 * 1024;
    const FOLDER: &str = "Base/Group/Ivanov_Petr_01.01";

    fn selector(root: &Path, budget: FolderBudget) -> FolderContentSelector {
        FolderContentSelector::new(root.to_path_buf(), FileRules::default(), budget)
    }

    #[test]
    fn scenario_one_summary_one_document() {
        let fx = fixture(&[
            ("Base/Group/Ivanov_Petr_01.01/CV.pdf", FileBody::Bytes(10)),
            (
                "Base/Group/Ivanov_Petr_01.01/summary.txt",
                FileBody::Text("Born 01.01.\nEngineer."),
            ),
        ]);
        let handles = HandleTable::new();
        let selection = selector(&fx.root, FolderBudget::default())
            .select(&fx.catalog, FOLDER, &handles);

        let Selection::Contents(contents) = selection else {
            panic!("expected contents");
        };
        let summary = contents.summary.expect("summary");
        assert_eq!(summary.text, "Born 01.01.\nEngineer.");
        assert_eq!(contents.documents.len(), 1);
        assert_eq!(contents.documents[0].display_name, "CV.pdf");
        assert!(contents.truncation_notices.is_empty());
        assert_eq!(
            handles.resolve(contents.documents[0].handle),
            Some(fx.root.join("Base/Group/Ivanov_Petr_01.01/CV.pdf"))
        );
    }

    #[test]
    fn name_matched_summary_wins_over_earlier_file() {
        let fx = fixture(&[
            ("Base/Group/Ivanov_Petr_01.01/notes.txt", FileBody::Text("notes")),
            (
                "Base/Group/Ivanov_Petr_01.01/Sherlock_Ivanov_Petr.txt",
                FileBody::Text("the real summary"),
            ),
        ]);
        let sel = selector(&fx.root, FolderBudget::default());
        assert_eq!(
            sel.summary_entry(&fx.catalog, FOLDER),
            Some("Base/Group/Ivanov_Petr_01.01/Sherlock_Ivanov_Petr.txt")
        );
    }

    #[test]
    fn short_summary_is_truncated_with_ellipsis() {
        let long = "а".repeat(600);
        let fx = fixture(&[(
            "Base/Group/Ivanov_Petr_01.01/Ivanov_Petr_01.01.txt",
            FileBody::Absent,
        )]);
        std::fs::create_dir_all(fx.root.join(FOLDER)).unwrap();
        std::fs::write(fx.root.join(FOLDER).join("Ivanov_Petr_01.01.txt"), &long)
            .unwrap();

        let sel = selector(&fx.root, FolderBudget::default());
        let SummaryLookup::Found(short) =
            sel.read_summary(&fx.catalog, FOLDER, SummaryForm::Short)
        else {
            panic!("expected summary");
        };
        assert!(short.truncated);
        assert_eq!(short.text.chars().count(), 503);
        assert!(short.text.ends_with("..."));

        let SummaryLookup::Found(full) =
            sel.read_summary(&fx.catalog, FOLDER, SummaryForm::Full)
        else {
            panic!("expected summary");
        };
        assert_eq!(full.text, long);
    }

    #[test]
    fn short_summary_ignores_bytes_past_the_head() {
        let fx = fixture(&[(
            "Base/Group/Ivanov_Petr_01.01/Ivanov_Petr_01.01.txt",
            FileBody::Absent,
        )]);
        let mut body = "a".repeat(600).into_bytes();
        body.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        std::fs::create_dir_all(fx.root.join(FOLDER)).unwrap();
        std::fs::write(fx.root.join(FOLDER).join("Ivanov_Petr_01.01.txt"), &body)
            .unwrap();

        let sel = selector(&fx.root, FolderBudget::default());
        let SummaryLookup::Found(short) =
            sel.read_summary(&fx.catalog, FOLDER, SummaryForm::Short)
        else {
            panic!("expected summary");
        };
        assert!(short.truncated);
        assert_eq!(short.text, format!("{}...", "a".repeat(500)));

        assert!(matches!(
            sel.read_summary(&fx.catalog, FOLDER, SummaryForm::Full),
            SummaryLookup::Unreadable { .. }
        ));
    }

    #[test]
    fn invalid_bytes_inside_the_head_are_unreadable() {
        let fx = fixture(&[(
            "Base/Group/Ivanov_Petr_01.01/Ivanov_Petr_01.01.txt",
            FileBody::Absent,
        )]);
        let mut body = b"Engineer ".to_vec();
        body.push(0xff);
        std::fs::create_dir_all(fx.root.join(FOLDER)).unwrap();
        std::fs::write(fx.root.join(FOLDER).join("Ivanov_Petr_01.01.txt"), &body)
            .unwrap();

        let sel = selector(&fx.root, FolderBudget::default());
        assert!(matches!(
            sel.read_summary(&fx.catalog, FOLDER, SummaryForm::Short),
            SummaryLookup::Unreadable { .. }
        ));
    }

    #[test]
    fn short_summary_of_exact_length_is_not_cut() {
        let fx = fixture(&[(
            "Base/Group/Ivanov_Petr_01.01/Ivanov_Petr_01.01.txt",
            FileBody::Absent,
        )]);
        std::fs::create_dir_all(fx.root.join(FOLDER)).unwrap();
        std::fs::write(
            fx.root.join(FOLDER).join("Ivanov_Petr_01.01.txt"),
            "я".repeat(500),
        )
        .unwrap();

        let sel = selector(&fx.root, FolderBudget::default());
        let SummaryLookup::Found(short) =
            sel.read_summary(&fx.catalog, FOLDER, SummaryForm::Short)
        else {
            panic!("expected summary");
        };
        assert!(!short.truncated);
        assert_eq!(short.text.chars().count(), 500);
    }

    #[test]
    fn missing_summary_file_is_unreadable() {
        let fx = fixture(&[(
            "Base/Group/Ivanov_Petr_01.01/Ivanov_Petr_01.01.txt",
            FileBody::Absent,
        )]);
        let sel = selector(&fx.root, FolderBudget::default());
        assert!(matches!(
            sel.read_summary(&fx.catalog, FOLDER, SummaryForm::Short),
            SummaryLookup::Unreadable { .. }
        ));
    }

    #[test]
    fn count_budget_stops_admission() {
        let fx = fixture(&[
            ("Base/Group/Ivanov_Petr_01.01/a.pdf", FileBody::Bytes(1)),
            ("Base/Group/Ivanov_Petr_01.01/b.pdf", FileBody::Bytes(1)),
            ("Base/Group/Ivanov_Petr_01.01/c.pdf", FileBody::Bytes(1)),
        ]);
        let budget = FolderBudget {
            max_count: 2,
            max_total_mb: 50.0,
        };
        let Selection::Contents(contents) =
            selector(&fx.root, budget).select(&fx.catalog, FOLDER, &HandleTable::new())
        else {
            panic!("expected contents");
        };
        let names: Vec<_> =
            contents.documents.iter().map(|d| d.display_name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
        assert_eq!(contents.truncation_notices.len(), 1);
        assert!(contents.truncation_notices[0].contains("2 documents"));
    }

    #[test]
    fn size_budget_stops_admission() {
        let fx = fixture(&[
            ("Base/Group/Ivanov_Petr_01.01/a.pdf", FileBody::Bytes(2 * MB)),
            ("Base/Group/Ivanov_Petr_01.01/b.pdf", FileBody::Bytes(2 * MB)),
            ("Base/Group/Ivanov_Petr_01.01/c.pdf", FileBody::Bytes(1)),
        ]);
        let budget = FolderBudget {
            max_count: 10,
            max_total_mb: 3.0,
        };
        let Selection::Contents(contents) =
            selector(&fx.root, budget).select(&fx.catalog, FOLDER, &HandleTable::new())
        else {
            panic!("expected contents");
        };
        assert_eq!(contents.documents.len(), 1);
        assert_eq!(contents.truncation_notices.len(), 1);
        assert!(contents.truncation_notices[0].contains("3 MB"));
        let total: f64 = contents.documents.iter().map(|d| d.size_mb).sum();
        assert!(total <= 3.0);
    }

    #[test]
    fn unstatable_document_is_skipped() {
        let fx = fixture(&[
            ("Base/Group/Ivanov_Petr_01.01/gone.pdf", FileBody::Absent),
            ("Base/Group/Ivanov_Petr_01.01/here.PDF", FileBody::Bytes(5)),
        ]);
        let Selection::Contents(contents) = selector(&fx.root, FolderBudget::default())
            .select(&fx.catalog, FOLDER, &HandleTable::new())
        else {
            panic!("expected contents");
        };
        assert_eq!(contents.documents.len(), 1);
        assert_eq!(contents.documents[0].display_name, "here.PDF");
        assert!(contents.truncation_notices.is_empty());
    }

    #[test]
    fn folder_without_files_is_empty_outcome() {
        let fx = fixture(&[
            ("Base/Group/Ivanov_Petr_01.01/photo.jpg", FileBody::Bytes(5)),
        ]);
        let selection = selector(&fx.root, FolderBudget::default()).select(
            &fx.catalog,
            FOLDER,
            &HandleTable::new(),
        );
        assert_eq!(
            selection,
            Selection::Empty {
                folder: FOLDER.to_string(),
                display_name: "Ivanov Petr 01.01".to_string(),
            }
        );
    }

    #[test]
    fn file_rules_match_case_insensitively() {
        let rules = FileRules::default();
        assert!(rules.is_summary("Ivanov.TXT"));
        assert!(rules.is_summary("Ivanov.txt_"));
        assert!(rules.is_attachable("cv.Pdf_"));
        assert!(!rules.is_attachable("cv.pdf.bak"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(FileRules::new(&["[".to_string()], &[]).is_err());
    }
}
