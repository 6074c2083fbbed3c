//! End-to-end reduction tests: DSL → compiled rules → loaded net →
//! generations of rewrites.

use tangle_net::encoding::is_air;
use tangle_net::{compile, dump, parse_net, CompiledRules, Engine, Memory, NetError};

fn compile_src(src: &str) -> CompiledRules {
    let _ = env_logger::builder().is_test(true).try_init();
    let statements = tangle_ir::parse(src).expect("DSL parse failed");
    compile(&statements).expect("rule compilation failed")
}

/// The canonical interaction-combinator duplication rule.
const DUP_CON: &str = "\
    (kind Con 3)\n\
    (kind Dup 3)\n\
    (rule Dup Con (Con <1 x y) (Con <2 z w) (Dup 1> x z) (Dup 2> y w))";

/// Duplication plus full erasure: Era consumes Con and Dup, and two
/// erasers meeting annihilate outright (an empty-template rule).
const DUP_CON_ERA: &str = "\
    (kind Con 3)\n\
    (kind Dup 3)\n\
    (rule Dup Con (Con <1 x y) (Con <2 z w) (Dup 1> x z) (Dup 2> y w))\n\
    (rule Era Con (Era 1>) (Era 2>))\n\
    (rule Era Dup (Era 1>) (Era 2>))\n\
    (rule Era Era)";

/// One Dup-Con redex with every free wire capped by an eraser.
const DUP_CON_NET: &str = "\
    Dup x p q\n\
    Con x s r\n\
    Era p\n\
    Era q\n\
    Era s\n\
    Era r";

/// Sorted multiset of directed edges `(kind, slot) -> (kind, slot)`,
/// which is equal for structurally isomorphic nets regardless of cell
/// addresses or wire labels.
fn edge_multiset(mem: &Memory, rules: &CompiledRules) -> Vec<(String, u8, String, u8)> {
    let registry = rules.registry();
    let mut edges = Vec::new();
    let mut addr = 0u32;
    while (addr as usize) < mem.len_words() {
        let kind = mem.kind_at(addr);
        let arity = registry.arity(kind);
        if !is_air(kind) {
            for slot in 0..arity {
                let target = mem.port(addr, slot);
                edges.push((
                    registry.name(kind).to_string(),
                    slot,
                    registry.name(mem.kind_at(target.addr())).to_string(),
                    target.slot(),
                ));
            }
        }
        addr += 1 + arity as u32;
    }
    edges.sort();
    edges
}

fn live_cells(mem: &Memory, rules: &CompiledRules) -> Vec<String> {
    let registry = rules.registry();
    let mut names = Vec::new();
    let mut addr = 0u32;
    while (addr as usize) < mem.len_words() {
        let kind = mem.kind_at(addr);
        if !is_air(kind) {
            names.push(registry.name(kind).to_string());
        }
        addr += 1 + registry.arity(kind) as u32;
    }
    names.sort();
    names
}

#[test]
fn duplication_spawns_new_redexes_in_one_generation() {
    let rules = compile_src(DUP_CON);
    let mem = parse_net(DUP_CON_NET, rules.registry()).unwrap();
    let mut engine = Engine::new(mem, &rules);

    // Seed exactly one end of the single redex.
    engine.memory_mut().red.push(0);
    let processed = engine.step();

    assert_eq!(processed, 1);
    assert_eq!(engine.rewrites(), 1);

    // The rewrite replaced the pair with two Con and two Dup cells, each
    // principal-to-principal with one of the erasers: both ends of all
    // four new redexes must be pending.
    let red = &engine.memory().red;
    assert_eq!(red.len(), 8);
    for new_cell in [16u32, 20, 24, 28] {
        assert!(red.contains(&new_cell), "new cell {} not pending", new_cell);
    }
    for eraser in [8u32, 10, 12, 14] {
        assert!(red.contains(&eraser), "eraser {} not pending", eraser);
    }

    let cells = live_cells(engine.memory(), &rules);
    assert_eq!(
        cells,
        vec!["Con", "Con", "Dup", "Dup", "Era", "Era", "Era", "Era"]
    );
}

#[test]
fn unmatched_pairs_are_stuck_not_errors() {
    // No Era rules: the four Era redexes created by duplication have no
    // dispatch entry and must simply stay unreduced.
    let rules = compile_src(DUP_CON);
    let mem = parse_net(DUP_CON_NET, rules.registry()).unwrap();
    let mut engine = Engine::new(mem, &rules);
    engine.scan_all();

    let generations = engine.run(None);
    assert_eq!(generations, 2);

    // Stuck cells survive, and a fresh scan re-discovers the stuck
    // redexes from both ends.
    let cells = live_cells(engine.memory(), &rules);
    assert_eq!(cells.len(), 8);
    engine.scan_all();
    assert_eq!(engine.memory().red.len(), 8);
}

#[test]
fn counter_ticks_per_processed_entry_not_per_rewrite() {
    let rules = compile_src(DUP_CON);
    let mem = parse_net(DUP_CON_NET, rules.registry()).unwrap();
    let mut engine = Engine::new(mem, &rules);
    engine.scan_all();

    // Both ends of the Dup-Con redex are pending; the second entry finds
    // Air and fires nothing, but still counts.
    assert_eq!(engine.memory().red.len(), 2);
    engine.step();
    assert_eq!(engine.rewrites(), 2);
}

#[test]
fn closed_net_reduces_to_nothing() {
    let rules = compile_src(DUP_CON_ERA);
    let mem = parse_net(DUP_CON_NET, rules.registry()).unwrap();
    let mut engine = Engine::new(mem, &rules);
    engine.scan_all();

    let generations = engine.run(Some(64));
    assert!(generations < 64, "reduction did not converge");
    assert!(engine.is_quiescent());
    assert!(live_cells(engine.memory(), &rules).is_empty());
    assert_eq!(dump(engine.memory(), rules.registry()), "");

    // Quiescence means no missed redex anywhere in memory.
    engine.scan_all();
    assert!(engine.memory().red.is_empty());
}

#[test]
fn erasure_cascade_frees_every_cell() {
    let rules = compile_src("(kind Con 3)");
    // A three-cell tree whose root principal port dangles, i.e. is a
    // self-loop: the eraser marker.
    let net = "Con r a b\nCon a x y\nCon b z w";
    let mem = parse_net(net, rules.registry()).unwrap();
    let mut engine = Engine::new(mem, &rules);
    engine.scan_all();
    assert_eq!(engine.memory().red, vec![0]);

    let generations = engine.run(None);
    // Root, then both children, then the stale self-loop entries fizzle.
    assert_eq!(generations, 3);
    assert!(live_cells(engine.memory(), &rules).is_empty());
    // All three size-4 slots went back to their bucket.
    assert_eq!(engine.memory().free_count(4), 3);
}

#[test]
fn mirrored_orientation_produces_isomorphic_net() {
    let rules = compile_src(DUP_CON_ERA);

    // The same net written with the active pair's roles swapped, so the
    // first processed redex runs the mirrored procedure.
    let mirrored = "\
        Con x s r\n\
        Dup x p q\n\
        Era s\n\
        Era r\n\
        Era p\n\
        Era q";

    let mem_a = parse_net(DUP_CON_NET, rules.registry()).unwrap();
    let mem_b = parse_net(mirrored, rules.registry()).unwrap();

    let mut engine_a = Engine::new(mem_a, &rules);
    let mut engine_b = Engine::new(mem_b, &rules);
    engine_a.scan_all();
    engine_b.scan_all();
    engine_a.step();
    engine_b.step();

    assert_eq!(
        edge_multiset(engine_a.memory(), &rules),
        edge_multiset(engine_b.memory(), &rules)
    );
}

#[test]
fn net_arity_mismatch_fails_fatally() {
    let rules = compile_src("(kind Add 2)");
    let err = parse_net("Add a a b\nEra b", rules.registry()).unwrap_err();
    match err {
        NetError::ArityMismatch {
            line,
            name,
            expected,
            found,
        } => {
            assert_eq!(line, 1);
            assert_eq!(name, "Add");
            assert_eq!(expected, 2);
            assert_eq!(found, 3);
        }
        other => panic!("expected arity mismatch, got {:?}", other),
    }
}

#[test]
fn reused_storage_keeps_its_footprint() {
    let rules = compile_src(DUP_CON);
    let mem = parse_net(DUP_CON_NET, rules.registry()).unwrap();
    let before = mem.len_words();
    let mut engine = Engine::new(mem, &rules);
    engine.scan_all();
    engine.run(None);

    // Duplication allocates four fresh size-4 cells (the free lists were
    // empty) and hands the consumed pair's storage back to its bucket.
    assert_eq!(engine.memory().len_words(), before + 16);
    assert_eq!(engine.memory().free_count(4), 2);
}
