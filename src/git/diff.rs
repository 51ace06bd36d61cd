use git2::{DiffOptions, Patch};

use crate::error::Result;
use crate::git::paths::Namespace;
use crate::git::store::{content_at, ContentStore};
use crate::models::{DiffOp, DiffSegment};

impl ContentStore {
    /// Diff page `name` between two revisions, reading both sides from
    /// committed blobs rather than the working tree.
    pub fn diff(&self, name: &str, start_revision: &str, end_revision: &str) -> Result<Vec<DiffSegment>> {
        self.with_read(|worktree, repo| {
            let target = Namespace::Page.resolve(worktree.root(), name)?;
            let old = content_at(repo, &target, start_revision)?;
            let new = content_at(repo, &target, end_revision)?;
            diff_bytes(&old.content, &new.content)
        })
    }
}

/// Line diff of two buffers as merged equal/insert/delete segments.
///
/// Uses libgit2's Myers diff with context wide enough to cover both
/// inputs, so the segments always reconstruct them completely.
pub fn diff_bytes(old: &[u8], new: &[u8]) -> Result<Vec<DiffSegment>> {
    let lines = old.iter().chain(new).filter(|&&b| b == b'\n').count() + 1;
    let context = u32::try_from(lines).unwrap_or(u32::MAX);

    let mut opts = DiffOptions::new();
    opts.context_lines(context).interhunk_lines(context).force_text(true);

    let patch = Patch::from_buffers(old, None, new, None, Some(&mut opts))?;

    let mut segments: Vec<DiffSegment> = Vec::new();
    for hunk_idx in 0..patch.num_hunks() {
        for line_idx in 0..patch.num_lines_in_hunk(hunk_idx)? {
            let line = patch.line_in_hunk(hunk_idx, line_idx)?;
            let op = match line.origin() {
                ' ' => DiffOp::Equal,
                '+' => DiffOp::Insert,
                '-' => DiffOp::Delete,
                // End-of-file newline markers carry no content of their own.
                _ => continue,
            };
            push_segment(&mut segments, op, &String::from_utf8_lossy(line.content()));
        }
    }

    // Identical inputs produce no hunks at all.
    if segments.is_empty() && !old.is_empty() {
        segments.push(DiffSegment {
            op: DiffOp::Equal,
            text: String::from_utf8_lossy(old).into_owned(),
        });
    }

    Ok(segments)
}

fn push_segment(segments: &mut Vec<DiffSegment>, op: DiffOp, text: &str) {
    match segments.last_mut() {
        Some(last) if last.op == op => last.text.push_str(text),
        _ => segments.push(DiffSegment {
            op,
            text: text.to_string(),
        }),
    }
}
