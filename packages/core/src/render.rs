//! Human-readable text rendering of [`Object`]s and [`Arena`]s.
//!
//! The output is plain text for terminals and logs. It is not a canonical
//! format; only the JSON document produced by [`encode`](crate::encode) is
//! normative.

use std::collections::BTreeMap;

use crate::graph::Arena;
use crate::object::{Handle, Object, Value};
use crate::registry::Registry;

/// Render one arena object as indented plain text.
///
/// ```text
/// [Person] https://example.org/b
/// context: https://example.org/context.jsonld
///
///   name: "b"
///   knows: → #0, #2
///   address: {Address city: "Oslo"}
///
/// referenced by: #1, #2
/// ```
///
/// Unset fields are left out. Returns an empty string for a handle that
/// does not belong to `arena`.
pub fn render_object(registry: &Registry, arena: &Arena, handle: Handle) -> String {
    let Some(object) = arena.get(handle) else {
        return String::new();
    };
    let mut out = String::new();

    // header line
    match object.id() {
        Some(id) => out.push_str(&format!("[{}] {}\n", object.type_name(), id)),
        None => out.push_str(&format!("[{}] {}\n", object.type_name(), handle)),
    }
    if let Some(ctx) = registry.find_context_for(object.type_name()) {
        out.push_str(&format!("context: {}\n", ctx.url()));
    }

    let fields: Vec<String> = object
        .fields()
        .filter(|(f, v)| !f.is_id() && !v.is_empty())
        .map(|(f, v)| format!("  {}: {}\n", f.name, inline(v)))
        .collect();
    if !fields.is_empty() {
        out.push('\n');
        for line in fields {
            out.push_str(&line);
        }
    }

    let incoming = arena.incoming(handle);
    if !incoming.is_empty() {
        out.push('\n');
        out.push_str(&format!("referenced by: {}\n", handle_list(&incoming)));
    }

    out
}

/// Render an entire arena as a summary grouped by type.
///
/// ```text
/// Object graph  3 objects
/// ───────────────────────
///
/// ADDRESS (1)
///   #2  (no id)
///
/// PERSON (2)
///   #0  https://example.org/b  shared ×2
///   #1  (no id)
/// ```
///
/// An object is marked shared when more than one object points at it.
pub fn render_arena(arena: &Arena) -> String {
    let total = arena.len();
    let header = format!("Object graph  {} object{}", total, if total == 1 { "" } else { "s" });
    let rule = "─".repeat(header.chars().count());

    let mut out = format!("{}\n{}\n", header, rule);

    let mut groups: BTreeMap<&str, Vec<(Handle, &Object)>> = BTreeMap::new();
    for (h, o) in arena.iter() {
        groups.entry(o.type_name()).or_default().push((h, o));
    }

    for (type_name, objects) in groups {
        out.push('\n');
        out.push_str(&format!("{} ({})\n", type_name.to_uppercase(), objects.len()));
        for (h, o) in objects {
            let id = o.id().map(|id| truncate(id, 64)).unwrap_or_else(|| "(no id)".into());
            let referrers = arena.incoming(h).len();
            if referrers > 1 {
                out.push_str(&format!("  {}  {}  shared ×{}\n", h, id, referrers));
            } else {
                out.push_str(&format!("  {}  {}\n", h, id));
            }
        }
    }

    out
}

// --- helpers -----------------------------------------------------------------

fn inline(value: &Value) -> String {
    match value {
        Value::Ref(h) => format!("→ {h}"),
        Value::List(items) if items.iter().all(|v| matches!(v, Value::Ref(_))) => {
            let handles: Vec<Handle> = items.iter().filter_map(Value::as_handle).collect();
            format!("→ {}", handle_list(&handles))
        }
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(inline).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Embedded(o) => {
            let parts: Vec<String> = o
                .fields()
                .filter(|(_, v)| !v.is_empty())
                .map(|(f, v)| format!("{}: {}", f.name, inline(v)))
                .collect();
            if parts.is_empty() {
                format!("{{{}}}", o.type_name())
            } else {
                format!("{{{} {}}}", o.type_name(), parts.join(", "))
            }
        }
        Value::String(s) => format!("\"{}\"", truncate(s, 72)),
        other => other.to_string(),
    }
}

fn handle_list(handles: &[Handle]) -> String {
    handles
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max - 1).collect();
    format!("{cut}…")
}

// --- tests -------------------------------------------------------------------
