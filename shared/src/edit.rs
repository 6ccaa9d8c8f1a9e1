use serde::{Serialize, Deserialize};

/// A single positional list edit.
/// Positions refer to the list as it stands after every earlier edit of the
/// same reconciliation pass has been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EditOp {
    Remove { position: usize },
    Add { position: usize },
    Update { position: usize },
    Move { from: usize, to: usize },
}

/// Consumer of the edits produced by one reconciliation pass.
///
/// Callbacks run synchronously, in emission order. `on_add_at` and
/// `on_update_at` also get the element that now sits at `position`.
pub trait EditSink<T> {
    fn on_remove_at(&mut self, position: usize);
    fn on_add_at(&mut self, position: usize, item: &T);
    fn on_update_at(&mut self, position: usize, item: &T);
    fn on_move_at(&mut self, from: usize, to: usize);
}

impl<T> EditSink<T> for Vec<EditOp> {
    fn on_remove_at(&mut self, position: usize) {
        self.push(EditOp::Remove { position });
    }

    fn on_add_at(&mut self, position: usize, _item: &T) {
        self.push(EditOp::Add { position });
    }

    fn on_update_at(&mut self, position: usize, _item: &T) {
        self.push(EditOp::Update { position });
    }

    fn on_move_at(&mut self, from: usize, to: usize) {
        self.push(EditOp::Move { from, to });
    }
}

/// A plain list kept in step with the edits it receives.
///
/// Out-of-range positions are ignored and counted, so a consumer that fell
/// out of sync can notice it instead of panicking.
#[derive(Debug, Clone)]
pub struct ListMirror<T> {
    rows: Vec<T>,
    rejected: usize,
}

impl<T> Default for ListMirror<T> {
    fn default() -> Self {
        Self { rows: Vec::new(), rejected: 0 }
    }
}

impl<T: Clone> ListMirror<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows, rejected: 0 }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    /// Number of edits that referenced a position outside the list
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

impl<T: Clone> EditSink<T> for ListMirror<T> {
    fn on_remove_at(&mut self, position: usize) {
        if position < self.rows.len() {
            self.rows.remove(position);
        } else {
            self.rejected += 1;
        }
    }

    fn on_add_at(&mut self, position: usize, item: &T) {
        if position <= self.rows.len() {
            self.rows.insert(position, item.clone());
        } else {
            self.rejected += 1;
        }
    }

    fn on_update_at(&mut self, position: usize, item: &T) {
        match self.rows.get_mut(position) {
            Some(row) => *row = item.clone(),
            None => self.rejected += 1,
        }
    }

    fn on_move_at(&mut self, from: usize, to: usize) {
        if from < self.rows.len() && to < self.rows.len() {
            let row = self.rows.remove(from);
            self.rows.insert(to, row);
        } else {
            self.rejected += 1;
        }
    }
}
