//! Equality checks over a group of items

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CompareError {
    #[error("Need at least two items to compare, got {0}")]
    NotEnoughItems(usize),
}

pub type Result<T> = std::result::Result<T, CompareError>;

/// Compares a list of items against its first element
#[derive(Debug, Clone)]
pub struct ItemComparer<T> {
    items: Vec<T>,
}

impl<T> Default for ItemComparer<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: PartialEq> ItemComparer<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Replace the items being compared
    pub fn set_items(&mut self, items: impl IntoIterator<Item = T>) {
        self.items = items.into_iter().collect();
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Whether the first two items are equal
    pub fn compare_one(&self) -> Result<bool> {
        let (first, second) = self.first_pair()?;
        Ok(first == second)
    }

    /// Whether every item equals the first
    pub fn compare_group(&self) -> Result<bool> {
        let (first, _) = self.first_pair()?;
        Ok(self.items.iter().all(|item| item == first))
    }

    /// The first item when it differs from the second
    pub fn unequal_item(&self) -> Result<Option<&T>> {
        let (first, second) = self.first_pair()?;
        Ok((first != second).then_some(first))
    }

    /// Every item that differs from the first, in order
    pub fn unequal_items(&self) -> Result<Vec<&T>> {
        let (first, _) = self.first_pair()?;
        Ok(self.items.iter().filter(|item| *item != first).collect())
    }

    fn first_pair(&self) -> Result<(&T, &T)> {
        match self.items.as_slice() {
            [first, second, ..] => Ok((first, second)),
            _ => Err(CompareError::NotEnoughItems(self.items.len())),
        }
    }
}
