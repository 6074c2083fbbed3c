//! Line-oriented net text format: reader and dumper.
//!
//! One cell per non-empty line, `<KindName> <var>...` with one variable
//! per port slot. A variable's first occurrence opens a dangling port
//! (stored as a self-loop), its second occurrence closes the wire by
//! cross-linking both ends. Using a variable more than twice is undefined.

use fxhash::FxHashMap;
use thiserror::Error;

use crate::encoding::{is_air, is_settled, pack_info};
use crate::kind::KindRegistry;
use crate::mem::Memory;
use crate::port::Port;

/// Errors raised while loading net text. Both are fatal: a partially
/// loaded net is never returned.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("line {line}: unknown kind `{name}`")]
    UnknownKind { line: usize, name: String },

    #[error("line {line}: wrong arity on `{name}`: {found} ports instead of {expected}")]
    ArityMismatch {
        line: usize,
        name: String,
        expected: u8,
        found: usize,
    },
}

/// Builds a fresh [`Memory`] from net text. The pending redex list is left
/// empty; seed it with [`scan_all`] before reducing.
///
/// [`scan_all`]: crate::engine::scan_all
pub fn parse_net(src: &str, registry: &KindRegistry) -> Result<Memory, NetError> {
    let mut mem = Memory::new();
    let mut dangling: FxHashMap<&str, Port> = FxHashMap::default();

    for (idx, raw) in src.lines().enumerate() {
        let line = idx + 1;
        let mut words = raw.split_whitespace();
        let Some(name) = words.next() else { continue };
        let vars: Vec<&str> = words.collect();

        let kind = registry.id(name).ok_or_else(|| NetError::UnknownKind {
            line,
            name: name.to_string(),
        })?;
        let arity = registry.arity(kind);
        if vars.len() != arity as usize {
            return Err(NetError::ArityMismatch {
                line,
                name: name.to_string(),
                expected: arity,
                found: vars.len(),
            });
        }

        let addr = mem.alloc(arity as u32 + 1);
        mem.set_info(addr, pack_info(kind));
        for (slot, var) in vars.iter().enumerate() {
            let here = Port::new(addr, slot as u8);
            if let Some(&other) = dangling.get(var) {
                mem.store(other, here);
                mem.set_port(addr, slot as u8, other);
            } else {
                dangling.insert(var, here);
                mem.set_port(addr, slot as u8, here);
            }
        }
    }

    Ok(mem)
}

/// Renders every non-Air cell as one line: pending marker, address, the
/// reserved settled flag, kind name, then per port either `@` for a
/// self-loop or a base-26 alphabetic label assigned per wire.
pub fn dump(mem: &Memory, registry: &KindRegistry) -> String {
    let mut lines = Vec::new();
    let mut names: FxHashMap<Port, String> = FxHashMap::default();
    let mut count = 0usize;

    let mut addr = 0u32;
    while (addr as usize) < mem.len_words() {
        let info = mem.info(addr);
        let kind = mem.kind_at(addr);
        let arity = registry.arity(kind);
        if !is_air(kind) {
            let marker = if mem.red.contains(&addr) { '#' } else { '|' };
            let settled = if is_settled(info) { '-' } else { ' ' };
            let mut line = format!("{}{:>4} |{} {:<5}", marker, addr, settled, registry.name(kind));
            for slot in 0..arity {
                let here = Port::new(addr, slot);
                let target = mem.port(addr, slot);
                let label = if target == here {
                    "@".to_string()
                } else if let Some(existing) = names.get(&here) {
                    existing.clone()
                } else {
                    let fresh = wire_label(count);
                    count += 1;
                    fresh
                };
                names.insert(target, label.clone());
                line.push(' ');
                line.push_str(&format!("{:<4}", label));
            }
            lines.push(line);
        }
        addr += 1 + arity as u32;
    }

    lines.join("\n")
}

/// Short alphabetic label for the `n`-th distinct wire: a, b, .., z, aa, ..
fn wire_label(mut n: usize) -> String {
    let mut label = String::new();
    n += 1;
    while n > 0 {
        n -= 1;
        label.push((b'a' + (n % 26) as u8) as char);
        n /= 26;
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::KindRegistry;

    fn test_registry() -> KindRegistry {
        let mut registry = KindRegistry::new();
        registry.declare("Con", 3).unwrap();
        registry
    }

    #[test]
    fn wires_cross_link_on_second_occurrence() {
        let registry = test_registry();
        let mem = parse_net("Con x a b\nCon x c d", &registry).unwrap();
        let first = 0u32;
        let second = 4u32;
        // `x` ties the two principal ports together.
        assert_eq!(mem.port(first, 0), Port::new(second, 0));
        assert_eq!(mem.port(second, 0), Port::new(first, 0));
        // Single-occurrence variables stay dangling as self-loops.
        assert_eq!(mem.port(first, 1), Port::new(first, 1));
        assert_eq!(mem.port(second, 2), Port::new(second, 2));
    }

    #[test]
    fn arity_mismatch_is_fatal() {
        let registry = test_registry();
        let err = parse_net("Con a a", &registry).unwrap_err();
        match err {
            NetError::ArityMismatch {
                line,
                name,
                expected,
                found,
            } => {
                assert_eq!(line, 1);
                assert_eq!(name, "Con");
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected arity mismatch, got {:?}", other),
        }
    }

    #[test]
    fn unknown_kind_is_fatal() {
        let registry = test_registry();
        assert!(matches!(
            parse_net("Ghost a", &registry),
            Err(NetError::UnknownKind { .. })
        ));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let registry = test_registry();
        let mem = parse_net("\nCon a a b\n\n", &registry).unwrap();
        assert_eq!(mem.len_words(), 4);
    }

    #[test]
    fn dump_labels_wires_and_self_loops() {
        let registry = test_registry();
        let mem = parse_net("Con x a a\nCon x b b", &registry).unwrap();
        let text = dump(&mem, &registry);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        // Both ends of `x` carry the same label, the tight aux loops are
        // plain wires between two ports of the same cell.
        assert!(lines[0].contains("Con"));
        let first_label = lines[0].split_whitespace().nth(4).unwrap();
        assert_eq!(lines[1].split_whitespace().nth(4).unwrap(), first_label);
    }

    #[test]
    fn wire_labels_extend_past_z() {
        assert_eq!(wire_label(0), "a");
        assert_eq!(wire_label(25), "z");
        assert_eq!(wire_label(26), "aa");
    }
}
