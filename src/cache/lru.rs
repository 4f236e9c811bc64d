// lru.rs
use std::collections::HashMap;

/// Generic least-recently-used index over `(String, T)` pairs.
///
/// Nodes live in an arena of slots addressed by index, with a free-list
/// threading the vacant slots, so the doubly linked recency list never
/// holds a dangling link. Head is least recently used, tail most recently
/// used. All operations are O(1) except `remove_all`.
///
/// Not synchronized: the owning component serializes access.
pub struct LruIndex<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    map: HashMap<String, usize>,
}

struct Node<T> {
    key: String,
    payload: T,
    prev: Option<usize>,
    next: Option<usize>,
}

enum Slot<T> {
    Occupied(Node<T>),
    Vacant { next_free: Option<usize> },
}

impl<T> LruIndex<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            head: None,
            tail: None,
            map: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// If present, mark the entry most recently used and return its
    /// payload.
    pub fn touch(&mut self, key: &str) -> Option<T>
    where
        T: Clone,
    {
        let idx = *self.map.get(key)?;
        self.unlink(idx);
        self.push_tail(idx);
        Some(self.node(idx).payload.clone())
    }

    /// Add a new entry at the most-recently-used position.
    ///
    /// Inserting a key that is already present is a logic error: debug
    /// builds assert, release builds degrade to replacing the payload and
    /// refreshing recency.
    pub fn insert(&mut self, key: impl Into<String>, payload: T) {
        let key = key.into();
        if let Some(&idx) = self.map.get(&key) {
            debug_assert!(false, "duplicate insert for key {key}");
            self.node_mut(idx).payload = payload;
            self.unlink(idx);
            self.push_tail(idx);
            return;
        }

        let node = Node {
            key: key.clone(),
            payload,
            prev: None,
            next: None,
        };
        let idx = self.alloc(node);
        self.push_tail(idx);
        self.map.insert(key, idx);
    }

    /// Detach and return the least-recently-used entry.
    ///
    /// Panics when the index is empty; callers check `len()` first.
    pub fn evict_oldest(&mut self) -> (String, T) {
        let idx = self.head.expect("evict_oldest called on empty LruIndex");
        self.unlink(idx);
        let node = self.release(idx);
        self.map.remove(&node.key);
        (node.key, node.payload)
    }

    /// Detach a specific entry, wherever it sits in the recency order.
    pub fn remove(&mut self, key: &str) -> Option<T> {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        let node = self.release(idx);
        Some(node.payload)
    }

    /// Discard every entry. Backing resources (files) are the owner's
    /// responsibility.
    pub fn remove_all(&mut self) {
        self.slots.clear();
        self.map.clear();
        self.free_head = None;
        self.head = None;
        self.tail = None;
    }

    fn node(&self, idx: usize) -> &Node<T> {
        match &self.slots[idx] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("vacant slot reached through the list"),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<T> {
        match &mut self.slots[idx] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("vacant slot reached through the list"),
        }
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
        match self.free_head {
            Some(idx) => {
                self.free_head = match self.slots[idx] {
                    Slot::Vacant { next_free } => next_free,
                    Slot::Occupied(_) => unreachable!("occupied slot on free-list"),
                };
                self.slots[idx] = Slot::Occupied(node);
                idx
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                self.slots.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> Node<T> {
        let slot = std::mem::replace(
            &mut self.slots[idx],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(idx);
        match slot {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("released a vacant slot"),
        }
    }

    /// Detach a node from the recency list, nulling its links. Handles the
    /// four positions: sole node, head, tail, interior.
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        match (prev, next) {
            (None, None) => {
                debug_assert_eq!(self.head, Some(idx));
                debug_assert_eq!(self.tail, Some(idx));
                self.head = None;
                self.tail = None;
            }
            (None, Some(next)) => {
                debug_assert_eq!(self.head, Some(idx));
                debug_assert_eq!(self.node(next).prev, Some(idx));
                self.node_mut(next).prev = None;
                self.head = Some(next);
            }
            (Some(prev), None) => {
                debug_assert_eq!(self.tail, Some(idx));
                debug_assert_eq!(self.node(prev).next, Some(idx));
                self.node_mut(prev).next = None;
                self.tail = Some(prev);
            }
            (Some(prev), Some(next)) => {
                debug_assert_eq!(self.node(prev).next, Some(idx));
                debug_assert_eq!(self.node(next).prev, Some(idx));
                self.node_mut(prev).next = Some(next);
                self.node_mut(next).prev = Some(prev);
            }
        }

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    /// Append a detached node at the most-recently-used position.
    fn push_tail(&mut self, idx: usize) {
        match self.tail {
            Some(tail) => {
                self.node_mut(tail).next = Some(idx);
                self.node_mut(idx).prev = Some(tail);
                self.tail = Some(idx);
            }
            None => {
                debug_assert_eq!(self.head, None);
                self.head = Some(idx);
                self.tail = Some(idx);
            }
        }
    }
}

impl<T> Default for LruIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
