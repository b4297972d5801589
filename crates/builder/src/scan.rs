/// Knowledge-directory scan: every top-level regular file becomes one
/// document whose id is its filename.
use std::path::Path;

use {tracing::warn, walkdir::WalkDir};

use ragswitch_index::Document;

/// Enumerate the corpus. Non-recursive; subdirectories and unreadable files
/// are skipped. Sorted by filename so repeated scans of the same corpus
/// produce identical manifests.
pub fn scan_documents(dir: &Path) -> anyhow::Result<Vec<Document>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().into_owned();
        match std::fs::read_to_string(entry.path()) {
            Ok(text) => documents.push(Document { id, text }),
            Err(e) => {
                warn!(file = %entry.path().display(), error = %e, "skipping unreadable file");
            },
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_top_level_files_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "B").unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        std::fs::write(dir.path().join("c.txt"), "C").unwrap();

        let documents = scan_documents(dir.path()).unwrap();
        let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(documents[0].text, "A");
    }

    #[test]
    fn ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("doc.txt"), "hello").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("inner.txt"), "nope").unwrap();

        let documents = scan_documents(dir.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].id, "doc.txt");
    }

    #[test]
    fn missing_directory_is_an_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let documents = scan_documents(&dir.path().join("does-not-exist")).unwrap();
        assert!(documents.is_empty());
    }
}
