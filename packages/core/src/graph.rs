use std::collections::HashSet;
use std::ops::{Index, IndexMut};

use crate::object::{Handle, Object, Value};

/// Owner of every graph-participating [`Object`].
///
/// The arena is the identity space for one object graph: a [`Handle`] is
/// only meaningful for the arena that issued it. Encoding borrows an arena;
/// decoding produces a fresh one.
#[derive(Debug, Default, Clone)]
pub struct Arena {
    objects: Vec<Object>,
}

impl Arena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move an object into the arena and return its handle.
    pub fn insert(&mut self, object: Object) -> Handle {
        self.objects.push(object);
        Handle(self.objects.len() - 1)
    }

    pub fn get(&self, handle: Handle) -> Option<&Object> {
        self.objects.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Object> {
        self.objects.get_mut(handle.0)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        handle.0 < self.objects.len()
    }

    /// Total number of objects in the arena.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over all objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Object)> {
        self.objects.iter().enumerate().map(|(i, o)| (Handle(i), o))
    }

    /// All objects of a given structural type.
    pub fn by_type(&self, type_name: &str) -> Vec<Handle> {
        self.iter()
            .filter(|(_, o)| o.type_name() == type_name)
            .map(|(h, _)| h)
            .collect()
    }

    /// The first object whose identifier field equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<Handle> {
        self.iter().find(|(_, o)| o.id() == Some(id)).map(|(h, _)| h)
    }

    /// The objects `handle` directly references (outgoing edges), through
    /// lists and embedded objects, in field order. Repeated references are
    /// listed once.
    pub fn outgoing(&self, handle: Handle) -> Vec<Handle> {
        let Some(object) = self.get(handle) else {
            return vec![];
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for (_, value) in object.fields() {
            collect_refs(value, &mut seen, &mut out);
        }
        out
    }

    /// The objects that directly reference `handle` (incoming edges).
    pub fn incoming(&self, handle: Handle) -> Vec<Handle> {
        self.iter()
            .map(|(h, _)| h)
            .filter(|h| self.outgoing(*h).contains(&handle))
            .collect()
    }
}

impl Index<Handle> for Arena {
    type Output = Object;

    fn index(&self, handle: Handle) -> &Object {
        &self.objects[handle.0]
    }
}

impl IndexMut<Handle> for Arena {
    fn index_mut(&mut self, handle: Handle) -> &mut Object {
        &mut self.objects[handle.0]
    }
}

fn collect_refs(value: &Value, seen: &mut HashSet<Handle>, out: &mut Vec<Handle>) {
    match value {
        Value::Ref(h) => {
            if seen.insert(*h) {
                out.push(*h);
            }
        }
        Value::List(items) => {
            for item in items {
                collect_refs(item, seen, out);
            }
        }
        Value::Embedded(o) => {
            for (_, v) in o.fields() {
                collect_refs(v, seen, out);
            }
        }
        _ => {}
    }
}

// --- tests -------------------------------------------------------------------
