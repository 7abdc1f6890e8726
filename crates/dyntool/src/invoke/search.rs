//! `search` tools: term-frequency search over `.txt` and `.md` files.
//!
//! The score is the summed number of case-insensitive (Unicode lowercase)
//! occurrences of each query term. The snippet is cut around the earliest
//! hit of any term.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value, json};
use walkdir::WalkDir;

/// Results returned when the call does not pass `top_k`.
pub const DEFAULT_TOP_K: usize = 5;

const SNIPPET_BEFORE: usize = 120;
const SNIPPET_AFTER: usize = 240;

/// One matching document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Path relative to the searched directory, `/`-separated.
    pub file: String,
    pub score: usize,
    pub snippet: String,
}

/// Run a search tool. Reads `query`, `top_k` and an optional `docs_dir`
/// override from `params`; `root` is used otherwise.
pub async fn run(root: PathBuf, params: Map<String, Value>) -> Result<Value, String> {
    let query = params
        .get("query")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let top_k = params
        .get("top_k")
        .and_then(Value::as_u64)
        .map_or(DEFAULT_TOP_K, |k| k as usize);
    let root = params
        .get("docs_dir")
        .and_then(Value::as_str)
        .map(PathBuf::from)
        .unwrap_or(root);

    let hits = tokio::task::spawn_blocking(move || search_dir(&root, &query, top_k))
        .await
        .map_err(|e| format!("search task failed: {e}"))?;
    Ok(json!({ "results": hits }))
}

/// Search every `.txt` / `.md` file under `root`, best matches first.
///
/// An empty query or a missing directory yields no hits. Unreadable files
/// are skipped.
pub fn search_dir(root: &Path, query: &str, top_k: usize) -> Vec<SearchHit> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_searchable(entry.path()))
        .filter_map(|entry| {
            let bytes = fs::read(entry.path()).ok()?;
            let text = String::from_utf8_lossy(&bytes);
            score_document(&text, &terms).map(|(score, snippet)| SearchHit {
                file: relative_name(root, entry.path()),
                score,
                snippet,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.file.cmp(&b.file)));
    hits.truncate(top_k);
    hits
}

fn is_searchable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt") || e.eq_ignore_ascii_case("md"))
}

fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Score `text` against lowercase `terms`; `None` when nothing matches.
fn score_document(text: &str, terms: &[String]) -> Option<(usize, String)> {
    let (lower, origin) = lowercase_with_offsets(text);
    let score: usize = terms.iter().map(|t| lower.matches(t.as_str()).count()).sum();
    if score == 0 {
        return None;
    }
    let first = terms
        .iter()
        .filter_map(|t| lower.find(t.as_str()))
        .min()
        .and_then(|i| origin.get(i).copied())?;
    let start = char_floor(text, first.saturating_sub(SNIPPET_BEFORE));
    let end = char_floor(text, (first + SNIPPET_AFTER).min(text.len()));
    let snippet = text.get(start..end).unwrap_or_default().replace('\n', " ");
    Some((score, snippet))
}

/// Lowercase `text` and return, for every byte of the result, the byte
/// offset in `text` of the char it came from. Lowercasing can change a
/// char's encoded length, so offsets in the two strings differ.
fn lowercase_with_offsets(text: &str) -> (String, Vec<usize>) {
    let mut lower = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());
    for (offset, c) in text.char_indices() {
        for l in c.to_lowercase() {
            lower.push(l);
            origin.resize(lower.len(), offset);
        }
    }
    (lower, origin)
}

/// Largest char boundary `<= idx`.
fn char_floor(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("attention.md"),
            "# Attention\nTransformers use attention. Attention is all you need.",
        )
        .unwrap();
        fs::write(
            dir.path().join("nested/rnn.txt"),
            "Recurrent networks predate attention.",
        )
        .unwrap();
        fs::write(dir.path().join("notes.rs"), "attention attention attention").unwrap();
        dir
    }

    #[test]
    fn ranks_by_term_frequency() {
        let dir = corpus();
        let hits = search_dir(dir.path(), "Attention", 5);
        let files: Vec<&str> = hits.iter().map(|h| h.file.as_str()).collect();
        assert_eq!(files, ["attention.md", "nested/rnn.txt"]);
        assert_eq!(hits[0].score, 3);
        assert!(!hits[0].snippet.contains('\n'));
    }

    #[test]
    fn top_k_truncates() {
        let dir = corpus();
        assert_eq!(search_dir(dir.path(), "attention", 1).len(), 1);
    }

    #[test]
    fn empty_query_or_missing_dir_has_no_hits() {
        let dir = corpus();
        assert!(search_dir(dir.path(), "   ", 5).is_empty());
        assert!(search_dir(&dir.path().join("absent"), "attention", 5).is_empty());
    }

    #[test]
    fn snippet_is_cut_on_char_boundaries() {
        let text = format!("{}needle{}", "é".repeat(100), "ü".repeat(200));
        let (score, snippet) = score_document(&text, &["needle".to_string()]).unwrap();
        assert_eq!(score, 1);
        assert!(snippet.contains("needle"));
    }

    #[test]
    fn matching_is_unicode_case_insensitive() {
        let (score, snippet) =
            score_document("Über alles. über.", &["über".to_string()]).unwrap();
        assert_eq!(score, 2);
        assert_eq!(snippet, "Über alles. über.");

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("de.txt"), "ÄRGER und ärger").unwrap();
        let hits = search_dir(dir.path(), "Ärger", 5);
        assert_eq!(hits[0].score, 2);
    }

    #[test]
    fn snippet_starts_at_the_hit_after_length_changing_lowercase() {
        // 'İ' lowercases to two chars, three bytes instead of two.
        let text = format!("{}needle", "İ".repeat(150));
        let (_, snippet) = score_document(&text, &["needle".to_string()]).unwrap();
        // 120 bytes of context before the hit is 60 two-byte chars.
        assert_eq!(snippet, format!("{}needle", "İ".repeat(60)));
    }

    #[tokio::test]
    async fn run_reads_params() {
        let dir = corpus();
        let mut params = Map::new();
        params.insert("query".into(), json!("recurrent"));
        params.insert("docs_dir".into(), json!(dir.path().to_string_lossy()));

        let result = run(PathBuf::from("unused"), params).await.unwrap();
        assert_eq!(result["results"][0]["file"], "nested/rnn.txt");
        assert_eq!(result["results"].as_array().unwrap().len(), 1);
    }
}
