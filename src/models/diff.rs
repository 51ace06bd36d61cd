//! Diff DTOs.
//!
//! A diff is a flat list of segments; concatenating the `Equal` and
//! `Delete` texts gives the old content, `Equal` and `Insert` the new one.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Equal,
    Insert,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffSegment {
    pub op: DiffOp,
    pub text: String,
}

impl DiffSegment {
    pub fn is_change(&self) -> bool {
        self.op != DiffOp::Equal
    }
}
