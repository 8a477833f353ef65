// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of whole-project snapshots.
//!
//! Every frame keeps the bincode bytes of the project as it was *before* an
//! edit. Stepping back hands out the stored bytes and files the live project
//! on the opposite stack, so undo and redo are the same move in mirror.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Default number of undoable edits kept
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Undo stack is empty
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Redo stack is empty
    #[error("Nothing to redo")]
    NothingToRedo,

    /// A snapshot could not be encoded or decoded
    #[error("Snapshot encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// One recorded edit: its label and the encoded project to go back to
#[derive(Debug, Clone)]
struct Frame {
    label: String,
    bytes: Vec<u8>,
}

impl Frame {
    fn encode<T: Serialize>(label: String, state: &T) -> Result<Self> {
        Ok(Self {
            label,
            bytes: bincode::serialize(state)?,
        })
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.bytes)?)
    }
}

/// Counters describing the history stacks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Edits that can be undone
    pub undo_count: usize,
    /// Edits that can be redone
    pub redo_count: usize,
    /// Bytes held by all snapshots
    pub memory_used: usize,
    /// Undo depth before the oldest edit is dropped
    pub max_depth: usize,
}

/// Bounded undo/redo stacks
#[derive(Debug)]
pub struct History {
    past: VecDeque<Frame>,
    future: Vec<Frame>,
    max_depth: usize,
    bytes_held: usize,
}

impl History {
    /// History keeping [`MAX_HISTORY`] edits
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// History keeping at most `max_depth` edits (at least one)
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            max_depth: max_depth.max(1),
            bytes_held: 0,
        }
    }

    fn push_past(&mut self, frame: Frame) {
        self.bytes_held += frame.bytes.len();
        self.past.push_back(frame);
        while self.past.len() > self.max_depth {
            let Some(dropped) = self.past.pop_front() else {
                break;
            };
            self.bytes_held -= dropped.bytes.len();
        }
    }

    fn push_future(&mut self, frame: Frame) {
        self.bytes_held += frame.bytes.len();
        self.future.push(frame);
    }

    /// Store `before` as the state an edit labelled `label` can be undone to.
    ///
    /// Anything that could be redone is forgotten.
    pub fn record<T: Serialize>(&mut self, label: impl Into<String>, before: &T) -> Result<()> {
        let frame = Frame::encode(label.into(), before)?;
        let discarded: usize = self.future.drain(..).map(|f| f.bytes.len()).sum();
        self.bytes_held -= discarded;
        self.push_past(frame);
        Ok(())
    }

    /// Step back one edit, filing `current` for redo.
    ///
    /// Both stacks are untouched when this fails.
    pub fn undo<T: Serialize + DeserializeOwned>(&mut self, current: &T) -> Result<T> {
        let frame = self.past.back().ok_or(HistoryError::NothingToUndo)?;
        let restored = frame.decode()?;
        let filed = Frame::encode(frame.label.clone(), current)?;

        if let Some(frame) = self.past.pop_back() {
            self.bytes_held -= frame.bytes.len();
        }
        self.push_future(filed);
        Ok(restored)
    }

    /// Step forward one undone edit, filing `current` for undo
    pub fn redo<T: Serialize + DeserializeOwned>(&mut self, current: &T) -> Result<T> {
        let frame = self.future.last().ok_or(HistoryError::NothingToRedo)?;
        let restored = frame.decode()?;
        let filed = Frame::encode(frame.label.clone(), current)?;

        if let Some(frame) = self.future.pop() {
            self.bytes_held -= frame.bytes.len();
        }
        self.push_past(filed);
        Ok(restored)
    }

    /// Whether an edit can be undone
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Whether an undone edit can be redone
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Drop both stacks
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.bytes_held = 0;
    }

    /// Current stack sizes and memory use
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.past.len(),
            redo_count: self.future.len(),
            memory_used: self.bytes_held,
            max_depth: self.max_depth,
        }
    }

    /// Label of the edit [`History::undo`] would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.past.back().map(|f| f.label.as_str())
    }

    /// Label of the edit [`History::redo`] would reapply
    pub fn redo_description(&self) -> Option<&str> {
        self.future.last().map(|f| f.label.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
