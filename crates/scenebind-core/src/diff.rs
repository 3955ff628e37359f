#![forbid(unsafe_code)]

//! Snapshot diffing for list controls.
//!
//! When a list binding has to resynchronise (the bound collection was
//! replaced wholesale) it compares the records it last pushed with the new
//! ones and issues the edits in between, so the control keeps rows that did
//! not change.
//!
//! The diff trims the common prefix and suffix and rewrites the middle:
//! overlapping positions become [`ListEdit::Set`], the remainder becomes
//! removals or insertions. Edits are meant to be applied in order.

/// One incremental edit of a displayed list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListEdit<T> {
    Insert { index: usize, item: T },
    Remove { index: usize },
    Set { index: usize, item: T },
}

/// Edits turning `old` into `new`, to be applied in order.
#[must_use]
pub fn diff_lists<T: PartialEq + Clone>(old: &[T], new: &[T]) -> Vec<ListEdit<T>> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    let overlap = old_mid.len().min(new_mid.len());

    let mut edits = Vec::new();
    for (offset, (before, after)) in old_mid.iter().zip(new_mid.iter()).enumerate() {
        if before != after {
            edits.push(ListEdit::Set {
                index: prefix + offset,
                item: after.clone(),
            });
        }
    }
    let at = prefix + overlap;
    for _ in overlap..old_mid.len() {
        edits.push(ListEdit::Remove { index: at });
    }
    for (offset, item) in new_mid[overlap..].iter().enumerate() {
        edits.push(ListEdit::Insert {
            index: at + offset,
            item: item.clone(),
        });
    }
    edits
}

/// Apply `edits` to `items`. Out-of-range edits are ignored.
pub fn apply_edits<T: Clone>(items: &mut Vec<T>, edits: &[ListEdit<T>]) {
    for edit in edits {
        match edit {
            ListEdit::Insert { index, item } if *index <= items.len() => {
                items.insert(*index, item.clone());
            }
            ListEdit::Remove { index } if *index < items.len() => {
                items.remove(*index);
            }
            ListEdit::Set { index, item } if *index < items.len() => {
                items[*index] = item.clone();
            }
            _ => {}
        }
    }
}
