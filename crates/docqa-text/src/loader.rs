//! `.docx` loading.
//!
//! A `.docx` file is a zip archive whose main body lives in
//! `word/document.xml` as WordprocessingML. Extraction collects the text
//! runs (`w:t`) of each paragraph (`w:p`) and joins paragraphs with blank
//! lines. Anything that is not a readable archive with that entry fails
//! loudly as a load error; an empty document never comes out of a corrupt
//! file.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;

use docqa_core::error::{Error, Result};
use docqa_core::types::SourceDocument;

const DOCUMENT_ENTRY: &str = "word/document.xml";

#[derive(Debug, Default)]
pub struct DocxLoader;

impl DocxLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a single `.docx` file into a `SourceDocument`.
    pub fn load_file(&self, path: &Path) -> Result<SourceDocument> {
        let file = File::open(path).map_err(|e| load_err(path, e.to_string()))?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| load_err(path, format!("not a .docx archive: {e}")))?;
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_ENTRY)
            .map_err(|e| load_err(path, format!("missing {DOCUMENT_ENTRY}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| load_err(path, e.to_string()))?;

        let text = extract_document_text(&xml).map_err(|reason| load_err(path, reason))?;
        Ok(SourceDocument {
            doc_id: doc_id_for(path),
            path: path.to_string_lossy().to_string(),
            text,
        })
    }

    /// Load every `.docx` file under a directory, sorted by path.
    /// Files with other extensions are silently skipped; a `.docx` that
    /// fails to load aborts the whole call.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<SourceDocument>> {
        let files = list_docx_files(dir);
        let mut docs = Vec::with_capacity(files.len());
        for (i, path) in files.iter().enumerate() {
            println!("Loading file {}/{}: {}", i + 1, files.len(), path.display());
            docs.push(self.load_file(path)?);
        }
        Ok(docs)
    }
}

fn load_err(path: &Path, reason: String) -> Error {
    Error::Load { path: path.to_path_buf(), reason }
}

fn doc_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn list_docx_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let is_docx = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
        if is_docx {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}

/// Pull the plain text out of WordprocessingML. Only `w:t` run contents
/// are kept; `w:tab` becomes a tab, `w:br`/`w:cr` a line break, and each
/// closed `w:p` a paragraph.
fn extract_document_text(xml: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_run_text = true;
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_run_text = false,
                b"p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    } else {
                        current.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if in_run_text {
                    let piece = t.unescape().map_err(|e| format!("bad XML text: {e}"))?;
                    current.push_str(&piece);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("bad {DOCUMENT_ENTRY}: {e}")),
        }
    }
    if !current.trim().is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs.join("\n\n"))
}
