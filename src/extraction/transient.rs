use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

const MAX_STEM_CHARS: usize = 48;

/// Uniquely named scratch file holding an upload for the duration of one extraction.
///
/// The name combines the invocation scope, a sanitized form of the client filename, and a
/// random suffix, so two uploads named `report.pdf` processed at the same time never share a
/// path. The file is deleted when the guard is released or dropped.
pub struct TransientFile {
    file: NamedTempFile,
}

impl TransientFile {
    /// Write `bytes` to a new scratch file inside `dir`.
    pub fn stage(dir: &Path, scope: &str, filename: &str, bytes: &[u8]) -> io::Result<Self> {
        let (stem, extension) = split_filename(filename);
        let prefix = format!("docsum-{}-{}-", sanitize(scope), stem);
        let suffix = extension
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::trace!(path = %file.path().display(), bytes = bytes.len(), "Staged upload");
        Ok(Self { file })
    }

    /// Location of the staged bytes.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the scratch file now, logging (not propagating) a failed removal.
    pub fn release(self) {
        let path = self.file.path().to_path_buf();
        if let Err(error) = self.file.close() {
            tracing::warn!(path = %path.display(), error = %error, "Failed to remove staged upload");
        }
    }
}

fn split_filename(filename: &str) -> (String, Option<String>) {
    // Client filenames may carry directory components from either platform.
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(sanitize(ext))),
        _ => (base, None),
    };
    let stem = sanitize(stem);
    let stem = if stem.is_empty() {
        "upload".to_string()
    } else {
        stem
    };
    (stem, extension.filter(|ext| !ext.is_empty()))
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(MAX_STEM_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_filename_gets_distinct_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = TransientFile::stage(dir.path(), "a1", "report.pdf", b"one").expect("stage");
        let second = TransientFile::stage(dir.path(), "a1", "report.pdf", b"two").expect("stage");

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path()).expect("read"), b"one");
        assert_eq!(std::fs::read(second.path()).expect("read"), b"two");
    }

    #[test]
    fn release_and_drop_both_remove_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let released = TransientFile::stage(dir.path(), "s", "a.pdf", b"x").expect("stage");
        let released_path = released.path().to_path_buf();
        released.release();
        assert!(!released_path.exists());

        let dropped_path = {
            let dropped = TransientFile::stage(dir.path(), "s", "b.pdf", b"x").expect("stage");
            dropped.path().to_path_buf()
        };
        assert!(!dropped_path.exists());
    }

    #[test]
    fn name_keeps_scope_and_sanitized_stem() {
        let dir = tempfile::tempdir().expect("tempdir");
        let staged = TransientFile::stage(dir.path(), "run42", "../../etc/Q3 report.pdf", b"x")
            .expect("stage");
        let name = staged
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .expect("utf-8 name")
            .to_string();

        assert!(name.starts_with("docsum-run42-Q3report-"), "{name}");
        assert!(name.ends_with(".pdf"), "{name}");
        assert_eq!(staged.path().parent(), Some(dir.path()));
    }

    #[test]
    fn missing_stem_falls_back_to_placeholder() {
        assert_eq!(split_filename(""), ("upload".to_string(), None));
        assert_eq!(split_filename("???"), ("upload".to_string(), None));
        assert_eq!(
            split_filename("notes.final.pdf"),
            ("notesfinal".to_string(), Some("pdf".to_string()))
        );
    }
}
