//! Reference counting over object graphs.
//!
//! The encoder asks one question of every shared-capable object it meets:
//! is this object reachable from more than one position in the root set?
//! Objects that are get an identifier and a top-level node; everything else
//! is inlined at its single reference site.
//!
//! Counting walks the graph from the roots. Each occurrence of the candidate
//! handle counts once and is not descended into. Every other object is
//! expanded at most once per walk, so cycles terminate and a repeated
//! sub-structure contributes only on its first visit. Because the set of
//! expanded objects is "everything reachable without passing through the
//! candidate", the count does not depend on traversal order.
//!
//! [`ReferenceAnalyzer`] differs from [`ref_count`] in one place: the
//! candidate itself is expanded on its first occurrence, so a reference back
//! to it through a cycle counts. Every reachable cycle then holds at least
//! one shared object, so inlining always stops at an identifier.

use std::collections::{HashMap, HashSet};

use crate::graph::Arena;
use crate::object::{Handle, Object, Value};

/// One entry of the encoder's root set.
#[derive(Debug, Clone, Copy)]
pub enum Root<'a> {
    /// An object in the arena; it has identity and can be shared.
    Handle(Handle),
    /// A free-standing value. It is treated as a private copy: nothing else
    /// can reference it, though its fields may reference arena objects.
    Value(&'a Object),
}

impl From<Handle> for Root<'_> {
    fn from(h: Handle) -> Self {
        Root::Handle(h)
    }
}

impl<'a> From<&'a Object> for Root<'a> {
    fn from(o: &'a Object) -> Self {
        Root::Value(o)
    }
}

/// Count the occurrences of `find` reachable from `container`.
///
/// The count is not capped: an object listed twelve times across three
/// sibling containers counts twelve.
pub fn ref_count(arena: &Arena, find: Handle, container: Root<'_>) -> usize {
    let mut counter = Counter::new(arena, find, usize::MAX, false);
    counter.visit_root(container);
    counter.count
}

/// Memoising multiple-reference check over a fixed root set.
///
/// The graph must not change while the analyzer is alive; encode borrows the
/// arena for the whole call, which guarantees that.
#[derive(Debug)]
pub struct ReferenceAnalyzer<'a> {
    arena: &'a Arena,
    roots: &'a [Root<'a>],
    cache: HashMap<Handle, bool>,
}

impl<'a> ReferenceAnalyzer<'a> {
    pub fn new(arena: &'a Arena, roots: &'a [Root<'a>]) -> Self {
        Self {
            arena,
            roots,
            cache: HashMap::new(),
        }
    }

    /// Whether `candidate` occurs at two or more positions in the root set.
    ///
    /// One walk covers all roots and shares its visited set, and stops as
    /// soon as the second occurrence is found.
    pub fn is_multiply_referenced(&mut self, candidate: Handle) -> bool {
        if let Some(&known) = self.cache.get(&candidate) {
            return known;
        }
        let mut counter = Counter::new(self.arena, candidate, 2, true);
        for root in self.roots {
            counter.visit_root(*root);
            if counter.done() {
                break;
            }
        }
        let multiple = counter.count >= 2;
        self.cache.insert(candidate, multiple);
        multiple
    }
}

struct Counter<'a> {
    arena: &'a Arena,
    find: Handle,
    stop_at: usize,
    /// Search inside `find` too, once.
    expand_find: bool,
    count: usize,
    visited: HashSet<Handle>,
    pending: Vec<Handle>,
}

impl<'a> Counter<'a> {
    fn new(arena: &'a Arena, find: Handle, stop_at: usize, expand_find: bool) -> Self {
        Self {
            arena,
            find,
            stop_at,
            expand_find,
            count: 0,
            visited: HashSet::new(),
            pending: Vec::new(),
        }
    }

    fn done(&self) -> bool {
        self.count >= self.stop_at
    }

    fn visit_root(&mut self, root: Root<'_>) {
        match root {
            Root::Handle(h) => self.reach(h),
            Root::Value(o) => self.scan_object(o),
        }
        self.drain();
    }

    fn drain(&mut self) {
        let arena = self.arena;
        while let Some(h) = self.pending.pop() {
            if self.done() {
                self.pending.clear();
                return;
            }
            // Handles that do not belong to the arena contribute nothing.
            if let Some(object) = arena.get(h) {
                self.scan_object(object);
            }
        }
    }

    fn reach(&mut self, h: Handle) {
        if h == self.find {
            self.count += 1;
            if self.expand_find && self.visited.insert(h) {
                self.pending.push(h);
            }
        } else if self.visited.insert(h) {
            self.pending.push(h);
        }
    }

    fn scan_object(&mut self, object: &Object) {
        for (_, value) in object.fields() {
            self.scan_value(value);
        }
    }

    fn scan_value(&mut self, value: &Value) {
        match value {
            Value::Ref(h) => self.reach(*h),
            Value::List(items) => {
                for item in items {
                    self.scan_value(item);
                }
            }
            Value::Embedded(o) => self.scan_object(o),
            _ => {}
        }
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDescriptor, FieldKind, TypeDescriptor};
    use std::sync::Arc;

    fn named(name: &str, refs: FieldKind) -> Arc<TypeDescriptor> {
        TypeDescriptor::new(name, format!("http://example.org/{name}"))
            .with_field(FieldDescriptor::new("name", "http://example.org/name", FieldKind::string()))
            .with_field(FieldDescriptor::new("refs", "http://example.org/refs", refs))
            .build()
    }

    fn obj(arena: &mut Arena, ty: &Arc<TypeDescriptor>, name: &str, refs: Value) -> Handle {
        let o = Object::new(ty.clone())
            .with("name", name)
            .unwrap()
            .with("refs", refs)
            .unwrap();
        arena.insert(o)
    }

    fn set_refs(arena: &mut Arena, h: Handle, refs: Value) {
        arena[h].set("refs", refs).unwrap();
    }

    struct Fixture {
        arena: Arena,
        o1: Handle,
        o3: Handle,
        o21: Handle,
        o22: Object,
        o31: Handle,
        o32: Handle,
        o33: Handle,
        o34: Handle,
        o35: Handle,
        o41: Handle,
        o42: Handle,
    }

    fn fixture() -> Fixture {
        let mut arena = Arena::new();

        let t1 = named("O1", FieldKind::list(FieldKind::reference("O1")));
        let o1 = obj(&mut arena, &t1, "o1", Value::Null);
        let o2 = obj(&mut arena, &t1, "o2", Value::Null);
        let o3 = obj(&mut arena, &t1, "o3", Value::Null);

        let t2 = named("O2", FieldKind::list(FieldKind::reference("O1")));
        let o21 = obj(&mut arena, &t2, "o21", Value::list([o1, o1, o2, o3]));
        let siblings: Vec<Value> = (1..=3)
            .map(|i| {
                let refs = Value::list([o1, o1, o1, o1, o2, o3]);
                Value::Embedded(Box::new(
                    Object::new(t2.clone())
                        .with("name", format!("o22-{i}"))
                        .unwrap()
                        .with("refs", refs)
                        .unwrap(),
                ))
            })
            .collect();
        let t22 = named("O22", FieldKind::list(FieldKind::Embedded("O2".into())));
        let o22 = Object::new(t22).with("refs", Value::List(siblings)).unwrap();

        let t3 = named("O3", FieldKind::list(FieldKind::reference("O3")));
        let o31 = obj(&mut arena, &t3, "o31", Value::Null);
        let o32 = obj(&mut arena, &t3, "o32", Value::list([o31]));
        let o33 = obj(&mut arena, &t3, "o33", Value::list([o32]));
        set_refs(&mut arena, o31, Value::list([o33]));
        let o34 = obj(&mut arena, &t3, "o34", Value::list([o31, o32]));
        let o35 = obj(&mut arena, &t3, "o35", Value::list([o31, o32, o31, o32]));

        let t4 = named("O4", FieldKind::Ref(crate::types::RefTarget::Any));
        let o41 = obj(&mut arena, &t4, "o41", Value::Null);
        let o42 = obj(&mut arena, &t4, "o42", Value::Ref(o41));

        Fixture {
            arena,
            o1,
            o3,
            o21,
            o22,
            o31,
            o32,
            o33,
            o34,
            o35,
            o41,
            o42,
        }
    }

    #[test]
    fn reference_counts() {
        let f = fixture();
        let cases: Vec<(&str, Handle, Root<'_>, usize)> = vec![
            ("none", f.o33, Root::Handle(f.o21), 0),
            ("interface", f.o41, Root::Handle(f.o42), 1),
            ("single", f.o3, Root::Handle(f.o21), 1),
            ("multiple", f.o1, Root::Handle(f.o21), 2),
            ("multiple 2", f.o1, Root::Value(&f.o22), 12),
            ("circular 1", f.o31, Root::Handle(f.o31), 1),
            ("circular 2", f.o32, Root::Handle(f.o31), 1),
            ("circular 3", f.o33, Root::Handle(f.o31), 1),
            ("circular multiple", f.o32, Root::Handle(f.o34), 2),
            ("circular multiple 2", f.o32, Root::Handle(f.o35), 3),
        ];
        for (name, find, container, expected) in cases {
            assert_eq!(
                ref_count(&f.arena, find, container),
                expected,
                "wrong reference count for case {name:?}"
            );
        }
    }

    #[test]
    fn analyzer_thresholds_at_two() {
        let f = fixture();
        let roots = [Root::Handle(f.o21)];
        let mut analyzer = ReferenceAnalyzer::new(&f.arena, &roots);
        assert!(analyzer.is_multiply_referenced(f.o1));
        assert!(!analyzer.is_multiply_referenced(f.o3));
        assert!(!analyzer.is_multiply_referenced(f.o33));
        // cached answer is stable
        assert!(analyzer.is_multiply_referenced(f.o1));
    }

    #[test]
    fn analyzer_shares_visited_set_across_roots() {
        let f = fixture();
        // o3 appears once under o21; listing o21 twice must not double it.
        let roots = [Root::Handle(f.o21), Root::Handle(f.o21)];
        let mut analyzer = ReferenceAnalyzer::new(&f.arena, &roots);
        assert!(!analyzer.is_multiply_referenced(f.o3));

        // two distinct roots that each reference o41 once
        let f2 = fixture();
        let roots = [Root::Handle(f2.o42), Root::Handle(f2.o41)];
        let mut analyzer = ReferenceAnalyzer::new(&f2.arena, &roots);
        assert!(analyzer.is_multiply_referenced(f2.o41));
    }

    #[test]
    fn cycles_terminate() {
        let f = fixture();
        let roots = [Root::Handle(f.o31)];
        let mut analyzer = ReferenceAnalyzer::new(&f.arena, &roots);
        assert!(!analyzer.is_multiply_referenced(f.o32));
        assert!(!analyzer.is_multiply_referenced(f.o33));
        assert!(!analyzer.is_multiply_referenced(f.o35));
    }

    #[test]
    fn root_reached_again_through_a_cycle_is_shared() {
        let f = fixture();
        // o31 -> o33 -> o32 -> o31: the root position plus o32's field
        let roots = [Root::Handle(f.o31)];
        let mut analyzer = ReferenceAnalyzer::new(&f.arena, &roots);
        assert!(analyzer.is_multiply_referenced(f.o31));
        // the plain count still stops at the root
        assert_eq!(ref_count(&f.arena, f.o31, Root::Handle(f.o31)), 1);

        // a root nothing points back to stays single
        let roots = [Root::Handle(f.o35)];
        let mut analyzer = ReferenceAnalyzer::new(&f.arena, &roots);
        assert!(!analyzer.is_multiply_referenced(f.o35));
    }

    #[test]
    fn cycle_entered_below_the_root_is_shared() {
        let mut arena = Arena::new();
        let t = named("Link", FieldKind::reference("Link"));
        let a = obj(&mut arena, &t, "a", Value::Null);
        let b = obj(&mut arena, &t, "b", Value::Ref(a));
        arena[a].set("refs", b).unwrap();
        let r = obj(&mut arena, &t, "r", Value::Ref(a));

        // r -> a -> b -> a: a has two incoming positions, b only one
        let roots = [Root::Handle(r)];
        let mut analyzer = ReferenceAnalyzer::new(&arena, &roots);
        assert!(analyzer.is_multiply_referenced(a));
        assert!(!analyzer.is_multiply_referenced(b));
        assert!(!analyzer.is_multiply_referenced(r));

        // a second root at b makes b shared as well
        let roots = [Root::Handle(r), Root::Handle(b)];
        let mut analyzer = ReferenceAnalyzer::new(&arena, &roots);
        assert!(analyzer.is_multiply_referenced(a));
        assert!(analyzer.is_multiply_referenced(b));
        assert_eq!(ref_count(&arena, a, Root::Handle(r)), 1);
    }
}
