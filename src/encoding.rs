//! Encoding and newline recovery for unreliable CSV sources.
//!
//! The loader first tries to use the file as-is; when that fails it walks an
//! ordered chain of candidate encodings, cleaning newlines and control bytes
//! along the way, and finishes with a lossy UTF-8 decode that always
//! succeeds. Every encoding problem downstream of the existence check is
//! absorbed here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::WINDOWS_1252;
use thiserror::Error;
use tracing::{info, warn};

const REPLACEMENT: char = '\u{FFFD}';

/// Ordered candidate encodings for the recovery chain. First parse wins.
const CANDIDATE_ENCODINGS: [CandidateEncoding; 4] = [
    CandidateEncoding::Utf8,
    CandidateEncoding::Windows1252,
    CandidateEncoding::Latin1,
    CandidateEncoding::Ascii,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateEncoding {
    Utf8,
    Windows1252,
    Latin1,
    Ascii,
}

impl CandidateEncoding {
    pub fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Windows1252 => "Windows-1252",
            Self::Latin1 => "ISO-8859-1",
            Self::Ascii => "ASCII",
        }
    }

    /// Decodes raw bytes, dropping invalid or undefined sequences instead of
    /// failing. The terminal fallback step keeps replacement characters; the
    /// candidate steps discard them.
    fn decode_dropping_invalid(self, raw: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(raw)
                .chars()
                .filter(|ch| *ch != REPLACEMENT)
                .collect(),
            Self::Windows1252 => {
                let (decoded, _, _) = WINDOWS_1252.decode(raw);
                decoded.chars().filter(|ch| *ch != REPLACEMENT).collect()
            }
            Self::Latin1 => encoding_rs::mem::decode_latin1(raw).into_owned(),
            Self::Ascii => raw
                .iter()
                .filter(|byte| byte.is_ascii())
                .map(|byte| *byte as char)
                .collect(),
        }
    }
}

/// How the accepted text was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySource {
    /// The file parsed as-is; no cleaning applied.
    Direct,
    /// A candidate encoding in the chain produced parseable text.
    Cleaned(CandidateEncoding),
    /// The guaranteed-success terminal step; text may contain U+FFFD.
    LossyFallback,
}

/// A text blob guaranteed to parse as delimited rows with a header, plus
/// provenance of the recovery step that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub text: String,
    pub recovery: RecoverySource,
    /// Cleaned side file written for diagnosis when the chain was triggered.
    pub side_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("source file not found: {path}")]
    SourceMissing { path: PathBuf },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Turns a possibly malformed byte source into parseable CSV text.
///
/// Only a missing source file is fatal. Cleaned intermediate variants are
/// written under `out_dir`, named after the encoding that produced them.
pub fn normalize_source(path: &Path, out_dir: &Path) -> Result<NormalizedTable, NormalizeError> {
    if !path.exists() {
        return Err(NormalizeError::SourceMissing {
            path: path.to_path_buf(),
        });
    }

    let raw = fs::read(path)?;

    // Fast path: the file is already valid UTF-8 and parses as CSV.
    if let Ok(text) = String::from_utf8(raw.clone()) {
        if parses_as_table(&text) {
            info!(
                component = "encoding",
                event = "encoding.normalize.direct",
                path = %path.display(),
                bytes = raw.len()
            );
            return Ok(NormalizedTable {
                text,
                recovery: RecoverySource::Direct,
                side_file: None,
            });
        }
    }

    warn!(
        component = "encoding",
        event = "encoding.normalize.direct_failed",
        path = %path.display(),
        "initial CSV read failed, attempting to clean encoding/newlines"
    );

    let stem = file_stem(path);

    for candidate in CANDIDATE_ENCODINGS {
        let decoded = candidate.decode_dropping_invalid(&raw);
        let cleaned = scrub_text(&decoded);
        if !parses_as_table(&cleaned) {
            warn!(
                component = "encoding",
                event = "encoding.normalize.candidate_failed",
                encoding = candidate.label()
            );
            continue;
        }

        let side_file = out_dir.join(format!("{stem}.cleaned.{}.csv", candidate.label()));
        write_side_file(&side_file, &cleaned)?;
        info!(
            component = "encoding",
            event = "encoding.normalize.cleaned",
            encoding = candidate.label(),
            side_file = %side_file.display()
        );
        return Ok(NormalizedTable {
            text: cleaned,
            recovery: RecoverySource::Cleaned(candidate),
            side_file: Some(side_file),
        });
    }

    // Terminal step: lossy UTF-8 with replacement characters kept. Never
    // fails; accepted unconditionally.
    let fallback = scrub_text(&String::from_utf8_lossy(&raw));
    let side_file = out_dir.join(format!("{stem}.fallback.csv"));
    write_side_file(&side_file, &fallback)?;
    warn!(
        component = "encoding",
        event = "encoding.normalize.fallback",
        side_file = %side_file.display(),
        "all candidate encodings failed, applied lossy fallback cleaning"
    );

    Ok(NormalizedTable {
        text: fallback,
        recovery: RecoverySource::LossyFallback,
        side_file: Some(side_file),
    })
}

/// Normalizes CRLF and lone CR to LF, then replaces remaining control
/// characters below 0x20 (except newline and tab) with spaces so stray
/// control bytes cannot break row parsing.
fn scrub_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    unified
        .chars()
        .map(|ch| {
            if ch == '\n' || ch == '\t' || ch as u32 >= 32 {
                ch
            } else {
                ' '
            }
        })
        .collect()
}

/// Strict parse check: a non-empty header and every record readable with the
/// same column count as the header.
fn parses_as_table(text: &str) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    match reader.headers() {
        Ok(headers) if !headers.is_empty() => {}
        _ => return false,
    }

    for record in reader.records() {
        if record.is_err() {
            return false;
        }
    }
    true
}

fn write_side_file(path: &Path, text: &str) -> Result<(), NormalizeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "source".to_string())
}
