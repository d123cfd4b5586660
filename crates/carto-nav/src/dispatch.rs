//! String-keyed query dispatch for hosts that route commands generically.
//!
//! The CLI calls the typed query functions directly; embedding hosts go
//! through `run`, which returns every report as a JSON value. Unknown
//! commands and missing arguments come back as an error value, not an
//! `Err` — queries never abort the session.

use crate::QueryStatus;
use carto_core::config::QueryConfig;
use carto_core::graph::GraphStore;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};

/// Everything a query can read.
pub struct QueryContext<'a> {
    pub store: &'a GraphStore,
    pub exports: &'a BTreeMap<String, BTreeSet<String>>,
    pub config: &'a QueryConfig,
}

fn to_value<T: Serialize>(report: &T) -> Value {
    serde_json::to_value(report).unwrap_or_else(|_| json!({"status": "serialization_failed"}))
}

fn missing_arg(command: &str, what: &str) -> Value {
    json!({
        "status": "invalid_arguments",
        "command": command,
        "missing": what,
    })
}

/// Run one named query. `args` are positional, matching the CLI surface.
pub fn run(ctx: &QueryContext<'_>, command: &str, args: &[String]) -> Value {
    let arg = |i: usize| args.get(i).map(String::as_str);
    match command {
        "callers" => match arg(0) {
            Some(name) => to_value(&crate::neighbors::callers(ctx.store, name)),
            None => missing_arg(command, "name"),
        },
        "callees" => match arg(0) {
            Some(name) => to_value(&crate::neighbors::callees(ctx.store, name)),
            None => missing_arg(command, "name"),
        },
        "deps" => match arg(0) {
            Some(file) => to_value(&crate::deps::deps(ctx.store, file)),
            None => missing_arg(command, "file"),
        },
        "rdeps" => match arg(0) {
            Some(file) => to_value(&crate::deps::rdeps(ctx.store, file)),
            None => missing_arg(command, "file"),
        },
        "file" => match arg(0) {
            Some(file) => to_value(&crate::fetch::file_info(ctx.store, file)),
            None => missing_arg(command, "file"),
        },
        "entity" => match arg(0) {
            Some(name) => to_value(&crate::fetch::entity_info(ctx.store, name)),
            None => missing_arg(command, "name"),
        },
        "impact" => match arg(0) {
            Some(file) => to_value(&crate::impact::impact(
                ctx.store,
                file,
                arg(1),
                ctx.config.impact_depth,
            )),
            None => missing_arg(command, "file"),
        },
        "path" => match (arg(0), arg(1)) {
            (Some(source), Some(target)) => {
                to_value(&crate::paths::shortest_path(ctx.store, source, target))
            }
            _ => missing_arg(command, "source, target"),
        },
        "dead" => to_value(&crate::dead::dead(ctx.store, &ctx.config.entrypoint_patterns)),
        "cycles" => to_value(&crate::cycles::detect_cycles(ctx.store)),
        "search" => match arg(0) {
            Some(pattern) => to_value(&crate::search::search(ctx.store, pattern)),
            None => missing_arg(command, "pattern"),
        },
        "exports" => match arg(0) {
            Some(file) => {
                let names: Vec<&String> =
                    ctx.exports.get(file).map(|s| s.iter().collect()).unwrap_or_default();
                let status = if ctx.exports.contains_key(file) {
                    QueryStatus::Ok
                } else {
                    QueryStatus::NotFound
                };
                json!({"file": file, "status": to_value(&status), "exports": names})
            }
            None => missing_arg(command, "file"),
        },
        "summary" => to_value(&crate::summary::summarize(
            ctx.store,
            ctx.config.summary_top_k,
            &ctx.config.entrypoint_patterns,
        )),
        _ => json!({
            "status": "unknown_command",
            "command": command,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_edge, make_node};
    use carto_core::entity::EntityKind;
    use carto_core::graph::EdgeKind;

    fn context_parts() -> (GraphStore, BTreeMap<String, BTreeSet<String>>, QueryConfig) {
        let mut store = GraphStore::new();
        make_node(&mut store, "a.py", "util", EntityKind::Function);
        make_node(&mut store, "b.py", "go", EntityKind::Function);
        make_edge(&mut store, ("b.py", "go"), ("a.py", "util"), EdgeKind::Calls);
        let mut exports = BTreeMap::new();
        exports.insert("a.py".to_string(), BTreeSet::from(["util".to_string()]));
        (store, exports, QueryConfig::default())
    }

    #[test]
    fn test_dispatch_callers() {
        let (store, exports, config) = context_parts();
        let ctx = QueryContext {
            store: &store,
            exports: &exports,
            config: &config,
        };
        let value = run(&ctx, "callers", &["util".to_string()]);
        assert_eq!(value["status"], "ok");
        assert_eq!(value["references"][0]["node"], "b.py::go");
    }

    #[test]
    fn test_dispatch_exports_and_unknown() {
        let (store, exports, config) = context_parts();
        let ctx = QueryContext {
            store: &store,
            exports: &exports,
            config: &config,
        };
        let value = run(&ctx, "exports", &["a.py".to_string()]);
        assert_eq!(value["exports"][0], "util");
        let value = run(&ctx, "frobnicate", &[]);
        assert_eq!(value["status"], "unknown_command");
    }

    #[test]
    fn test_dispatch_missing_argument() {
        let (store, exports, config) = context_parts();
        let ctx = QueryContext {
            store: &store,
            exports: &exports,
            config: &config,
        };
        let value = run(&ctx, "callers", &[]);
        assert_eq!(value["status"], "invalid_arguments");
    }
}
