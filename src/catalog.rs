use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    matcher,
    normalize::{self, NameCleaner},
    text_util::capitalize,
};

/// Category assigned to folders that sit directly under the base folder.
pub const OTHER_CATEGORY: &str = "Other";

/// In-memory index over a flat list of catalog paths.
///
/// Built once from the raw file list and read-only afterwards, so it can
/// be shared behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    base_folder: String,
    cleaner: NameCleaner,
    paths: Vec<String>,
    folders: Vec<String>,
    surnames: BTreeSet<String>,
    by_category: BTreeMap<String, Vec<String>>,
}

impl CatalogIndex {
    /// Build the index from raw path lines.
    ///
    /// Lines that do not contain `base_folder` are skipped; large catalogs
    /// routinely contain unrelated files.
    ///
    /// # Examples
    ///
    /// ```
    /// use dossier::{CatalogIndex, normalize::NameCleaner};
    ///
    /// let index = CatalogIndex::build(
    ///     ["X/Base/Group/Ivanov_Petr_01.01/CV.pdf"],
    ///     "Base",
    ///     NameCleaner::default(),
    /// );
    /// assert_eq!(index.folders(), ["Base/Group/Ivanov_Petr_01.01"]);
    /// assert!(index.surnames().contains("Ivanov"));
    /// ```
    pub fn build<I, S>(lines: I, base_folder: &str, cleaner: NameCleaner) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths = Vec::new();
        let mut skipped = 0usize;
        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() {
                continue;
            }
            match normalize::normalize_path(line, base_folder) {
                Some(path) => paths.push(path),
                None => {
                    skipped += 1;
                    debug!(line, "catalog line has no base folder, skipped");
                }
            }
        }

        let base_lower = base_folder.to_lowercase();
        let mut folders = BTreeSet::new();
        let mut surnames = BTreeSet::new();
        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for path in &paths {
            let category = category_of(path, &base_lower);

            let folder = normalize::parent(path);
            let folder_name = normalize::basename(folder);
            if folder.is_empty()
                || folder_name.is_empty()
                || folder.to_lowercase() == base_lower
            {
                continue;
            }
            folders.insert(folder.to_string());

            let display = cleaner.clean(folder_name);
            let Some(first) = display.split_whitespace().next() else {
                continue;
            };
            let surname = capitalize(first);
            surnames.insert(surname.clone());
            grouped.entry(category).or_default().insert(surname);
        }

        let index = Self {
            base_folder: base_folder.to_string(),
            cleaner,
            paths,
            folders: folders.into_iter().collect(),
            surnames,
            by_category: grouped
                .into_iter()
                .map(|(category, names)| (category, names.into_iter().collect()))
                .collect(),
        };

        info!(
            paths = index.paths.len(),
            skipped,
            folders = index.folders.len(),
            surnames = index.surnames.len(),
            categories = index.by_category.len(),
            "catalog index built"
        );
        index
    }

    /// Read a newline-delimited UTF-8 file list and build the index.
    pub fn load(
        file_list: &Path,
        base_folder: &str,
        cleaner: NameCleaner,
    ) -> Result<Self> {
        let content = std::fs::read_to_string(file_list).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    kind: "file list",
                    name: file_list.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        Ok(Self::build(content.lines(), base_folder, cleaner))
    }

    pub fn base_folder(&self) -> &str {
        &self.base_folder
    }

    pub fn cleaner(&self) -> &NameCleaner {
        &self.cleaner
    }

    /// All catalog paths in input order.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Person folders, sorted and unique.
    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    pub fn surnames(&self) -> &BTreeSet<String> {
        &self.surnames
    }

    pub fn surnames_by_category(&self) -> &BTreeMap<String, Vec<String>> {
        &self.by_category
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Catalog paths strictly inside `folder`, in catalog order.
    pub fn entries_under<'a>(
        &'a self,
        folder: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.paths
            .iter()
            .map(String::as_str)
            .filter(move |path| normalize::is_under(path, folder))
    }

    /// Cleaned display name of a folder.
    pub fn display_name(&self, folder: &str) -> String {
        self.cleaner.clean(normalize::basename(folder))
    }

    /// Folders whose name contains every word of `query`.
    pub fn search(&self, query: &str) -> Vec<String> {
        matcher::match_folders(query, &self.folders, &self.cleaner)
    }

    /// Find the folder whose cleaned name equals `name` exactly.
    ///
    /// Used to resolve birthday entries, which are keyed by the full
    /// folder display name.
    pub fn find_folder_by_name(&self, name: &str) -> Option<&str> {
        let wanted = self.cleaner.comparable(name);
        if wanted.is_empty() {
            return None;
        }
        self.folders
            .iter()
            .find(|folder| {
                self.cleaner.comparable(normalize::basename(folder)) == wanted
            })
            .map(String::as_str)
    }
}

/// The segment right after the base folder, when it names a directory.
fn category_of(path: &str, base_lower: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    segments
        .iter()
        .position(|segment| segment.to_lowercase() == base_lower)
        .and_then(|idx| segments.get(idx + 1))
        .filter(|candidate| !candidate.contains('.'))
        .map(|candidate| capitalize(candidate))
        .unwrap_or_else(|| OTHER_CATEGORY.to_string())
}
