// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

//! Round-robin recipient queue
//!
//! The front of the queue is the next recipient to receive a donation.
//! [`RoundRobin::update`] re-derives the queue from a new candidate list while
//! keeping the relative order of the recipients that survive, so that the
//! fairness of the rotation is preserved across charity edits and restarts.

use serde::{Deserialize, Serialize};

use crate::Recipient;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("round-robin queue is empty")]
    Empty,
}

/// Round-robin queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundRobin<T = Recipient> {
    queue: Vec<T>,
}

impl<T> Default for RoundRobin<T> {
    fn default() -> Self {
        Self { queue: Vec::new() }
    }
}

impl<T> FromIterator<T> for RoundRobin<T>
where
    T: PartialEq,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut queue: Vec<T> = Vec::new();
        for item in iter.into_iter() {
            if !queue.contains(&item) {
                queue.push(item);
            }
        }
        Self { queue }
    }
}

impl<T> RoundRobin<T>
where
    T: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.queue.contains(item)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.queue.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.queue
    }

    /// Next recipient, without touching the queue
    pub fn front(&self) -> Option<&T> {
        self.queue.first()
    }

    /// Insert `item` at the front, only if not already queued
    pub fn push_front_unique(&mut self, item: T) -> &mut Self {
        if !self.queue.contains(&item) {
            self.queue.insert(0, item);
        }
        self
    }

    /// Keep only the queued items that are in `candidates` (order preserved),
    /// then push to the front every candidate not already queued.
    ///
    /// New candidates are pushed one at a time, in `candidates` order, so the
    /// last new candidate ends up at the very front.
    pub fn update<I>(&mut self, candidates: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
    {
        let candidates: Vec<T> = candidates.into_iter().collect();

        let old: Vec<T> = std::mem::take(&mut self.queue);
        for item in old.into_iter() {
            if candidates.contains(&item) && !self.queue.contains(&item) {
                self.queue.push(item);
            }
        }

        for item in candidates.into_iter() {
            self.push_front_unique(item);
        }

        self
    }

    /// Move an item to the back of the queue.
    ///
    /// With `None` the current front is moved. With `Some(item)` the first
    /// occurrence of `item` is removed (if any) and `item` is appended: the
    /// queue grows by one if `item` wasn't queued.
    pub fn to_back(&mut self, item: Option<T>) -> Result<&mut Self, Error> {
        match item {
            None => {
                if self.queue.is_empty() {
                    return Err(Error::Empty);
                }
                let front: T = self.queue.remove(0);
                self.queue.push(front);
            }
            Some(item) => {
                if let Some(pos) = self.queue.iter().position(|elem| elem == &item) {
                    self.queue.remove(pos);
                }
                self.queue.push(item);
            }
        }
        Ok(self)
    }

    /// Get the front and move it to the back.
    ///
    /// Return `None` (and leave the queue untouched) if the queue is empty.
    pub fn rotate(&mut self) -> Option<T> {
        let front: T = self.front().cloned()?;
        match self.to_back(None) {
            Ok(_) => Some(front),
            Err(Error::Empty) => None,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.queue
    }
}

impl<T> IntoIterator for RoundRobin<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.queue.into_iter()
    }
}
