//! Token extraction: read the pdfium text layer into positioned words.
//!
//! ## Why words, not text segments?
//!
//! pdfium's text segments merge everything on a baseline that shares a
//! font run, so a single segment can span the licensee-name, DBA and
//! address columns. Column assignment needs one token per word with its
//! own left edge, so glyphs are regrouped here: a word ends at whitespace,
//! at a horizontal gap wider than [`PageLayout::word_gap`], or at a
//! vertical jump larger than [`PageLayout::line_gap`].
//!
//! ## Why spawn_blocking?
//!
//! pdfium uses thread-local state and is not safe to drive from async
//! contexts, so every pdfium call runs on tokio's blocking pool. Pages are
//! handed back one at a time over a channel so callers can start
//! assembling records before the last page has been read.
//!
//! Coordinates are converted from PDF's bottom-left origin to a top-left
//! origin: `top` grows downward from the top edge of the page.

use crate::config::PageLayout;
use crate::error::RosterError;
use crate::output::DocumentMetadata;
use crate::pipeline::input::ResolvedInput;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A single positioned word on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    /// Left edge, in points from the left of the page.
    pub x0: f64,
    /// Top edge, in points from the top of the page.
    pub top: f64,
    /// 1-based page number.
    pub page: usize,
}

impl Token {
    pub fn new(text: impl Into<String>, x0: f64, top: f64, page: usize) -> Self {
        Self {
            text: text.into(),
            x0,
            top,
            page,
        }
    }
}

/// Every token of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageTokens {
    /// 1-based page number; selects the header cutoff.
    pub page_number: usize,
    pub tokens: Vec<Token>,
}

/// One glyph from the text layer, already in top-left coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub left: f64,
    pub right: f64,
    pub top: f64,
}

/// Group glyphs (in content-stream order) into word tokens.
pub fn group_words(glyphs: &[Glyph], word_gap: f64, line_gap: f64, page: usize) -> Vec<Token> {
    struct Word {
        text: String,
        x0: f64,
        top: f64,
        last_left: f64,
        last_right: f64,
        last_top: f64,
    }

    fn flush(current: &mut Option<Word>, out: &mut Vec<Token>, page: usize) {
        if let Some(w) = current.take() {
            out.push(Token::new(w.text, w.x0, w.top, page));
        }
    }

    let mut tokens = Vec::new();
    let mut current: Option<Word> = None;

    for g in glyphs {
        if g.ch.is_whitespace() || g.ch.is_control() {
            flush(&mut current, &mut tokens, page);
            continue;
        }

        let breaks = current.as_ref().is_some_and(|w| {
            (g.top - w.last_top).abs() > line_gap
                || g.left > w.last_right + word_gap
                || g.right < w.last_left - word_gap
        });
        if breaks {
            flush(&mut current, &mut tokens, page);
        }

        match current.as_mut() {
            Some(w) => {
                w.text.push(g.ch);
                w.x0 = w.x0.min(g.left);
                w.top = w.top.min(g.top);
                w.last_left = g.left;
                w.last_right = g.right;
                w.last_top = g.top;
            }
            None => {
                current = Some(Word {
                    text: g.ch.to_string(),
                    x0: g.left,
                    top: g.top,
                    last_left: g.left,
                    last_right: g.right,
                    last_top: g.top,
                });
            }
        }
    }
    flush(&mut current, &mut tokens, page);
    tokens
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Bind to a pdfium shared library.
///
/// Resolution order: `PDFIUM_LIB_PATH`, then the working directory, then
/// the system library search path.
pub fn bind_pdfium() -> Result<Pdfium, RosterError> {
    if let Ok(p) = std::env::var("PDFIUM_LIB_PATH") {
        if !p.is_empty() {
            let path = PathBuf::from(p);
            return Pdfium::bind_to_library(&path)
                .map(Pdfium::new)
                .map_err(|e| {
                    RosterError::PdfiumBindingFailed(format!("{}: {}", path.display(), e))
                });
        }
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| RosterError::PdfiumBindingFailed(e.to_string()))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, RosterError> {
    pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                RosterError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                RosterError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            RosterError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })
}

/// Read one page's text layer into word tokens.
fn page_tokens(page: &PdfPage, page_number: usize, layout: &PageLayout) -> Result<PageTokens, RosterError> {
    let page_height = page.height().value as f64;
    let text = page
        .text()
        .map_err(|e| RosterError::TextExtractionFailed {
            page: page_number,
            detail: format!("{:?}", e),
        })?;

    let mut glyphs = Vec::new();
    for ch in text.chars().iter() {
        let Some(c) = ch.unicode_char() else {
            continue;
        };
        let Ok(bounds) = ch.loose_bounds() else {
            continue;
        };
        glyphs.push(Glyph {
            ch: c,
            left: bounds.left().value as f64,
            right: bounds.right().value as f64,
            top: page_height - bounds.top().value as f64,
        });
    }

    let tokens = group_words(&glyphs, layout.word_gap, layout.line_gap, page_number);
    debug!(
        "Page {}: {} glyphs → {} tokens",
        page_number,
        glyphs.len(),
        tokens.len()
    );
    Ok(PageTokens {
        page_number,
        tokens,
    })
}

/// Read the selected pages on the blocking pool, sending each page's
/// tokens as soon as it is ready.
///
/// `source` is moved into the worker so a downloaded temp file outlives
/// the read. The channel closes after the last page or the first error.
pub fn spawn_token_reader(
    source: ResolvedInput,
    password: Option<String>,
    page_indices: Vec<usize>,
    layout: PageLayout,
) -> mpsc::Receiver<Result<PageTokens, RosterError>> {
    let (tx, rx) = mpsc::channel(4);

    tokio::task::spawn_blocking(move || {
        let result = read_pages_blocking(
            source.path(),
            password.as_deref(),
            &page_indices,
            &layout,
            |page| tx.blocking_send(Ok(page)).is_ok(),
        );
        if let Err(e) = result {
            let _ = tx.blocking_send(Err(e));
        }
        drop(source);
    });

    rx
}

/// Blocking page loop. `emit` returns `false` when the consumer has gone.
fn read_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    page_indices: &[usize],
    layout: &PageLayout,
    mut emit: impl FnMut(PageTokens) -> bool,
) -> Result<(), RosterError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }

        let page = pages
            .get(idx as u16)
            .map_err(|e| RosterError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        if !emit(page_tokens(&page, idx + 1, layout)?) {
            debug!("Token consumer dropped; stopping after page {}", idx + 1);
            break;
        }
    }

    Ok(())
}

/// Extract document metadata from a PDF without reading page text.
pub async fn extract_metadata(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, RosterError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_metadata_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| RosterError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn extract_metadata_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<DocumentMetadata, RosterError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    })
}
