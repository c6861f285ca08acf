//! Reversible commands and the bounded undo / redo history.
//!
//! Commands store only deltas (paths, statuses, destinations), never file
//! snapshots. Reversal is performed by the organizer, which owns the ports.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::models::{Destination, FileStatus};

/// What one file move changed
#[derive(Debug, Clone, PartialEq)]
pub struct FileDelta {
    pub file_id: String,
    pub file_name: String,
    pub from_path: PathBuf,
    pub to_path: PathBuf,
    pub original_status: FileStatus,
    pub original_destination: Option<Destination>,
    /// Destination the file was organized into
    pub destination: Destination,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move(FileDelta),
    /// `to_path` is the created copy; the source stays in place
    Copy(FileDelta),
    Skip {
        file_id: String,
        file_name: String,
        previous_status: FileStatus,
        previous_destination: Option<Destination>,
    },
    BulkMove { deltas: Vec<FileDelta> },
}

impl Command {
    /// Short human-readable label for activity entries
    pub fn description(&self) -> String {
        match self {
            Command::Move(delta) if delta.destination.is_trash() => {
                format!("Delete {}", delta.file_name)
            }
            Command::Move(delta) => format!(
                "Move {} to {}",
                delta.file_name,
                delta.destination.display_name()
            ),
            Command::Copy(delta) => format!(
                "Copy {} to {}",
                delta.file_name,
                delta.destination.display_name()
            ),
            Command::Skip { file_name, .. } => format!("Skip {}", file_name),
            Command::BulkMove { deltas } => format!("Organize {} files", deltas.len()),
        }
    }

    /// Ids of every file the command touched
    pub fn file_ids(&self) -> Vec<&str> {
        match self {
            Command::Move(delta) | Command::Copy(delta) => vec![delta.file_id.as_str()],
            Command::Skip { file_id, .. } => vec![file_id.as_str()],
            Command::BulkMove { deltas } => deltas.iter().map(|d| d.file_id.as_str()).collect(),
        }
    }
}

/// Bounded undo and redo stacks; the oldest entry is evicted when full
#[derive(Debug)]
pub struct CommandStack {
    undo: VecDeque<Command>,
    redo: VecDeque<Command>,
    max_undo: usize,
    max_redo: usize,
}

impl CommandStack {
    pub fn new(max_undo: usize, max_redo: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            max_undo: max_undo.max(1),
            max_redo: max_redo.max(1),
        }
    }

    /// Record a newly executed command; clears redo
    pub fn push(&mut self, command: Command) {
        self.redo.clear();
        Self::push_bounded(&mut self.undo, command, self.max_undo);
    }

    pub fn pop_undo(&mut self) -> Option<Command> {
        self.undo.pop_back()
    }

    pub fn pop_redo(&mut self) -> Option<Command> {
        self.redo.pop_back()
    }

    /// A command was undone
    pub fn push_redo(&mut self, command: Command) {
        Self::push_bounded(&mut self.redo, command, self.max_redo);
    }

    /// A command was redone; unlike `push`, redo is kept
    pub fn push_undo(&mut self, command: Command) {
        Self::push_bounded(&mut self.undo, command, self.max_undo);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Whether any undo or redo entry touches `file_id`
    pub fn references(&self, file_id: &str) -> bool {
        self.undo
            .iter()
            .chain(self.redo.iter())
            .any(|command| command.file_ids().contains(&file_id))
    }

    pub fn peek_undo(&self) -> Option<&Command> {
        self.undo.back()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    fn push_bounded(stack: &mut VecDeque<Command>, command: Command, max: usize) {
        while stack.len() >= max {
            stack.pop_front();
        }
        stack.push_back(command);
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(50, 50)
    }
}

/// Shared handle to the command history
pub type CommandHistory = Arc<Mutex<CommandStack>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn skip(n: usize) -> Command {
        Command::Skip {
            file_id: format!("/d/{}.pdf", n),
            file_name: format!("{}.pdf", n),
            previous_status: FileStatus::Pending,
            previous_destination: None,
        }
    }

    #[test]
    fn test_push_clears_redo() {
        let mut stack = CommandStack::new(10, 10);
        stack.push(skip(1));
        let undone = stack.pop_undo().unwrap();
        stack.push_redo(undone);
        assert!(stack.can_redo());

        stack.push(skip(2));
        assert!(!stack.can_redo());
        assert_eq!(stack.undo_len(), 1);
    }

    #[test]
    fn test_redo_keeps_redo_stack() {
        let mut stack = CommandStack::new(10, 10);
        stack.push(skip(1));
        stack.push(skip(2));
        let a = stack.pop_undo().unwrap();
        stack.push_redo(a);
        let b = stack.pop_undo().unwrap();
        stack.push_redo(b);

        let redone = stack.pop_redo().unwrap();
        stack.push_undo(redone);
        assert_eq!(stack.redo_len(), 1);
        assert_eq!(stack.undo_len(), 1);
    }

    #[test]
    fn test_oldest_entry_is_evicted() {
        let mut stack = CommandStack::new(3, 3);
        for n in 0..5 {
            stack.push(skip(n));
        }
        assert_eq!(stack.undo_len(), 3);

        let mut order = Vec::new();
        while let Some(cmd) = stack.pop_undo() {
            order.push(cmd.description());
        }
        assert_eq!(order, vec!["Skip 4.pdf", "Skip 3.pdf", "Skip 2.pdf"]);
    }

    #[test]
    fn test_descriptions() {
        let delta = FileDelta {
            file_id: "/d/a.pdf".into(),
            file_name: "a.pdf".into(),
            from_path: "/d/a.pdf".into(),
            to_path: "/docs/a.pdf".into(),
            original_status: FileStatus::Ready,
            original_destination: None,
            destination: Destination::folder("t", "Documents"),
        };
        assert_eq!(Command::Move(delta.clone()).description(), "Move a.pdf to Documents");

        let mut trashed = delta.clone();
        trashed.destination = Destination::Trash;
        assert_eq!(Command::Move(trashed).description(), "Delete a.pdf");

        let bulk = Command::BulkMove {
            deltas: vec![delta.clone(), delta],
        };
        assert_eq!(bulk.description(), "Organize 2 files");
        assert_eq!(bulk.file_ids().len(), 2);
    }
}
