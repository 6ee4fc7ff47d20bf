//! Knowledge source loading.

use std::path::Path;

use tracing::info;

use tripleloop_shared::{Document, Result, TripleLoopError};

/// Framework summary shipped with the binary.
pub const BUNDLED_KNOWLEDGE: &str = include_str!("../assets/knowledge_base.txt");

/// Read the knowledge document from `path`, or use the bundled text.
///
/// An empty file is a valid (empty) document.
pub fn load_document(path: Option<&Path>) -> Result<Document> {
    let Some(path) = path else {
        info!(len = BUNDLED_KNOWLEDGE.len(), "using bundled knowledge text");
        return Ok(Document::new(BUNDLED_KNOWLEDGE));
    };

    if path.is_dir() {
        return Err(TripleLoopError::validation(format!(
            "knowledge path {} is a directory",
            path.display()
        )));
    }

    let text = std::fs::read_to_string(path).map_err(|e| TripleLoopError::io(path, e))?;
    info!(path = %path.display(), len = text.len(), "knowledge document read");
    Ok(Document::new(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_text_covers_framework() {
        let doc = load_document(None).unwrap();
        assert!(!doc.is_empty());
        for needle in ["LOOP 1", "LOOP 2", "LOOP 3", "Wirkung = Inhalt × Akzeptanz"] {
            assert!(doc.text().contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = std::env::temp_dir().join(format!("tripleloop-doc-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kb.txt");
        std::fs::write(&path, "Eigenes Wissen.").unwrap();

        let doc = load_document(Some(&path)).unwrap();
        assert_eq!(doc.text(), "Eigenes Wissen.");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_document(Some(Path::new("/nonexistent/tripleloop/kb.txt"))).unwrap_err();
        assert!(matches!(err, TripleLoopError::Io { .. }));
    }

    #[test]
    fn directory_is_rejected() {
        let err = load_document(Some(&std::env::temp_dir())).unwrap_err();
        assert!(matches!(err, TripleLoopError::Validation { .. }));
    }
}
