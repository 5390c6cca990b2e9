//! Markdown rendering of a Machine Representation
//!
//! The Markdown view has its own content identity: its entity-tag is the
//! SHA-256 of the rendered bytes, prefixed with `sha256-`.

use crate::block::Block;
use crate::mr::MachineRepresentation;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Render a snapshot as Markdown
///
/// Blocks are emitted in order, separated by blank lines. The result has its
/// trailing whitespace trimmed and ends with exactly one newline.
#[must_use]
pub fn render(mr: &MachineRepresentation) -> String {
    let mut out = String::new();
    if !mr.title.is_empty() {
        let _ = write!(out, "# {}\n\n", mr.title);
    }
    for block in &mr.blocks {
        render_block(&mut out, block);
    }
    let mut out = out.trim_end().to_string();
    out.push('\n');
    out
}

/// Entity-tag of a rendered Markdown document
#[must_use]
pub fn etag(markdown: &str) -> String {
    let digest = Sha256::digest(markdown.as_bytes());
    format!("sha256-{}", hex::encode(digest))
}

fn render_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading { level, content } => {
            let text = content.trim();
            if !text.is_empty() {
                let hashes = "#".repeat(usize::from((*level).clamp(1, 6)));
                let _ = write!(out, "{hashes} {text}\n\n");
            }
        }
        Block::Paragraph { content }
        | Block::Other {
            content: Some(content),
            ..
        } => {
            let text = content.trim();
            if !text.is_empty() {
                let _ = write!(out, "{text}\n\n");
            }
        }
        Block::List { ordered, items } => {
            for (idx, item) in items.iter().enumerate() {
                if *ordered {
                    let _ = writeln!(out, "{}. {item}", idx + 1);
                } else {
                    let _ = writeln!(out, "- {item}");
                }
            }
            if !items.is_empty() {
                out.push('\n');
            }
        }
        Block::Image { url, alt_text } => {
            if let Some(url) = url.as_deref().filter(|u| !u.is_empty()) {
                let alt = alt_text.as_deref().unwrap_or_default();
                let _ = write!(out, "![{alt}]({url})\n\n");
            }
        }
        Block::Code { content } => {
            if !content.is_empty() {
                let _ = write!(out, "```\n{content}\n```\n\n");
            }
        }
        Block::Quote { content } => {
            if !content.is_empty() {
                for line in split_lines(content) {
                    let _ = writeln!(out, "> {line}");
                }
                out.push('\n');
            }
        }
        Block::Other { content: None, .. } => {}
    }
}

/// Split on `\r\n`, `\r` or `\n`
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find(['\r', '\n']) {
            Some(pos) => {
                let skip = if current[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = Some(&current[pos + skip..]);
                Some(&current[..pos])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}
