//! An addressable priority queue implemented with a 4-ary heap.
//!
//! Insertion and popping the minimal element have `O(log n)` time complexity.
//! Checking the minimal element is `O(1)`. Keys of elements in the heap can
//! be increased or decreased. Contraction uses it for the node priorities and
//! the witness searches.
//!
//! # Examples
//!
//! ```
//! use route_engine::datastr::index_heap::{Indexing, IndexdMinHeap};
//!
//! #[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd)]
//! pub struct State {
//!     pub priority: i64,
//!     pub node: usize,
//! }
//!
//! // The `Indexing` trait maps elements to their slot so keys can be updated.
//! impl Indexing for State {
//!     fn as_index(&self) -> usize {
//!         self.node
//!     }
//! }
//!
//! let mut heap = IndexdMinHeap::new(3);
//! heap.push(State { node: 0, priority: 42 });
//! heap.push(State { node: 1, priority: -3 });
//! heap.push(State { node: 2, priority: 50000 });
//! assert_eq!(heap.peek().cloned(), Some(State { node: 1, priority: -3 }));
//! heap.update_key(State { node: 0, priority: -10 });
//! assert_eq!(heap.pop(), Some(State { node: 0, priority: -10 }));
//! ```

use std::cmp::min;

/// Maps heap elements to a unique index in `[0, max_index)`.
pub trait Indexing {
    fn as_index(&self) -> usize;
}

/// A min priority queue over elements with unique indices.
/// The elements are sorted ascending by the ordering defined by the `Ord` trait.
#[derive(Debug, Clone)]
pub struct IndexdMinHeap<T> {
    positions: Vec<usize>,
    data: Vec<T>,
}

const TREE_ARITY: usize = 4;
const INVALID_POSITION: usize = std::usize::MAX;

impl<T: Ord + Indexing> IndexdMinHeap<T> {
    /// Creates an empty heap for elements with indices in `[0, max_index)`.
    pub fn new(max_index: usize) -> IndexdMinHeap<T> {
        IndexdMinHeap {
            positions: vec![INVALID_POSITION; max_index],
            data: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_index(&self, id: usize) -> bool {
        self.positions[id] != INVALID_POSITION
    }

    pub fn get(&self, id: usize) -> Option<&T> {
        self.data.get(self.positions[id])
    }

    /// All elements in no particular order.
    pub fn elements(&self) -> &[T] {
        &self.data
    }

    /// Drops all items from the heap.
    pub fn clear(&mut self) {
        for element in &self.data {
            self.positions[element.as_index()] = INVALID_POSITION;
        }
        self.data.clear();
    }

    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let last = self.data.len() - 1;
        self.data.swap(0, last);
        let item = self.data.pop()?;
        self.positions[item.as_index()] = INVALID_POSITION;
        if !self.data.is_empty() {
            self.positions[self.data[0].as_index()] = 0;
            self.move_down_in_tree(0);
        }
        Some(item)
    }

    /// Pushes an item onto the heap.
    /// Panics if an element with the same index already exists.
    pub fn push(&mut self, element: T) {
        assert!(!self.contains_index(element.as_index()));
        let insert_position = self.len();
        self.positions[element.as_index()] = insert_position;
        self.data.push(element);
        self.move_up_in_tree(insert_position);
    }

    /// Insert the element or update the key of the contained element with the same index.
    pub fn push_or_update(&mut self, element: T) {
        if self.contains_index(element.as_index()) {
            self.update_key(element)
        } else {
            self.push(element)
        }
    }

    /// Updates the key of a contained element, in either direction.
    pub fn update_key(&mut self, element: T) {
        let position = self.positions[element.as_index()];
        let order = element.cmp(&self.data[position]);
        self.data[position] = element;
        match order {
            std::cmp::Ordering::Less => self.move_up_in_tree(position),
            std::cmp::Ordering::Greater => self.move_down_in_tree(position),
            std::cmp::Ordering::Equal => (),
        }
    }

    fn move_up_in_tree(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / TREE_ARITY;

            if self.data[parent] <= self.data[position] {
                break;
            }

            self.swap(parent, position);
            position = parent;
        }
    }

    fn move_down_in_tree(&mut self, mut position: usize) {
        let heap_size = self.len();
        while let Some(smallest_child) = Self::children_index_range(position, heap_size).min_by(|&a, &b| self.data[a].cmp(&self.data[b])) {
            if self.data[smallest_child] >= self.data[position] {
                return; // no child is smaller
            }

            self.swap(smallest_child, position);
            position = smallest_child;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.positions.swap(self.data[a].as_index(), self.data[b].as_index());
        self.data.swap(a, b);
    }

    fn children_index_range(parent_index: usize, heap_size: usize) -> std::ops::Range<usize> {
        let first_child = TREE_ARITY * parent_index + 1;
        let last_child = min(TREE_ARITY * parent_index + TREE_ARITY + 1, heap_size);
        first_child..last_child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug, Ord, PartialOrd)]
    struct Item {
        key: u32,
        id: usize,
    }

    impl Indexing for Item {
        fn as_index(&self) -> usize {
            self.id
        }
    }

    #[test]
    fn pops_in_order_after_random_updates() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut heap = IndexdMinHeap::new(100);
        let mut keys = vec![0; 100];

        for id in 0..100 {
            keys[id] = rng.gen_range(0..1000);
            heap.push(Item { key: keys[id], id });
        }
        for _ in 0..200 {
            let id = rng.gen_range(0..100);
            keys[id] = rng.gen_range(0..1000);
            heap.update_key(Item { key: keys[id], id });
        }

        let mut expected: Vec<Item> = (0..100).map(|id| Item { key: keys[id], id }).collect();
        expected.sort();
        let popped: Vec<Item> = std::iter::from_fn(|| heap.pop()).collect();
        assert_eq!(popped, expected);
        assert!(heap.is_empty());
    }

    #[test]
    fn contains_and_clear() {
        let mut heap = IndexdMinHeap::new(4);
        heap.push(Item { key: 3, id: 2 });
        heap.push_or_update(Item { key: 1, id: 2 });
        assert!(heap.contains_index(2));
        assert_eq!(heap.get(2), Some(&Item { key: 1, id: 2 }));
        assert_eq!(heap.len(), 1);
        heap.clear();
        assert!(!heap.contains_index(2));
        assert_eq!(heap.pop(), None);
    }
}
