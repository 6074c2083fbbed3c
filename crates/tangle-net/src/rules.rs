//! The rule compiler.
//!
//! Consumes parsed DSL statements and produces the completed kind registry
//! plus a dispatch table: one specialized rewrite procedure per ordered
//! pair of active kinds, and one erasure procedure per user kind. Rules are
//! compiled ahead of reduction into plain function values invoked through
//! indirect calls; nothing is synthesized at reduction time.
//!
//! Every declared rule is also compiled in its mirrored orientation (roles
//! of the two active cells swapped) unless both sides share a kind, so the
//! reduction engine never has to normalize pair order.

use fxhash::{FxHashMap, FxHashSet};
use log::debug;
use thiserror::Error;

use tangle_ir::{RuleDecl, Statement};

use crate::encoding::{air_for_arity, pack_info, MAX_ARITY};
use crate::engine::{attach, check_redex, Redex};
use crate::kind::{KindId, KindRegistry, FIRST_USER};
use crate::mem::Memory;
use crate::port::Port;

/// Errors raised while compiling kind and rule declarations. All of these
/// fire before any reduction happens; a compiled rule set cannot fail at
/// rewrite time.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("kind `{name}` declares arity {arity}, at most {} is supported", MAX_ARITY)]
    ArityTooLarge { name: String, arity: u8 },

    #[error("rule `{left}-{right}` references undeclared kind `{name}`")]
    UndeclaredKind {
        left: String,
        right: String,
        name: String,
    },

    #[error("rule `{left}-{right}`: template for `{kind}` names {found} ports, kind has arity {expected}")]
    TemplateArityMismatch {
        left: String,
        right: String,
        kind: String,
        expected: u8,
        found: usize,
    },

    #[error("rule `{left}-{right}`: variable `{var}` must appear exactly twice to form a wire")]
    UnbalancedVariable {
        left: String,
        right: String,
        var: String,
    },

    #[error("rule `{left}-{right}`: slot {slot} of the {side} active cell is bound more than once")]
    DuplicateExternal {
        left: String,
        right: String,
        side: &'static str,
        slot: u8,
    },

    #[error("rule `{left}-{right}`: slot {slot} of the {side} active cell is never wired")]
    UnwiredExternal {
        left: String,
        right: String,
        side: &'static str,
        slot: u8,
    },

    #[error("rule `{left}-{right}`: external slot {slot} is outside the active cell's arity {arity}")]
    ExternalOutOfRange {
        left: String,
        right: String,
        slot: u8,
        arity: u8,
    },
}

/// A rewrite procedure for an ordered active pair, `(memory, left, right)`.
pub type PairFn = Box<dyn Fn(&mut Memory, u32, u32) -> bool + Send + Sync>;
/// An erasure procedure for a self-looped cell, `(memory, addr)`.
pub type EraseFn = Box<dyn Fn(&mut Memory, u32) -> bool + Send + Sync>;

/// How a template variable binds a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarRef<'a> {
    /// `<N`: pass-through to slot N of the left active cell.
    Left(u8),
    /// `N>`: pass-through to slot N of the right active cell.
    Right(u8),
    /// An internal wire, identified by name.
    Name(&'a str),
}

impl<'a> VarRef<'a> {
    fn classify(var: &'a str) -> Self {
        if let Some(rest) = var.strip_prefix('<') {
            if let Ok(slot) = rest.parse() {
                return VarRef::Left(slot);
            }
        }
        if let Some(rest) = var.strip_suffix('>') {
            if let Ok(slot) = rest.parse() {
                return VarRef::Right(slot);
            }
        }
        VarRef::Name(var)
    }

    /// Swaps the external sides, for the mirrored rule orientation.
    fn flipped(self) -> Self {
        match self {
            VarRef::Left(slot) => VarRef::Right(slot),
            VarRef::Right(slot) => VarRef::Left(slot),
            name => name,
        }
    }
}

/// Where a port of a freshly written cell, or a repointed Air aux slot,
/// ends up after the rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkTarget {
    /// Port `slot` of the `cell`-th new cell.
    Cell { cell: usize, slot: u8 },
    /// The neighbor captured from aux slot `slot` of the left active cell.
    Left { slot: u8 },
    /// The neighbor captured from aux slot `slot` of the right active cell.
    Right { slot: u8 },
}

#[derive(Debug, Clone)]
struct CellPlan {
    kind: KindId,
    arity: u8,
    ports: Vec<LinkTarget>,
}

/// The fully resolved wiring plan for one rule orientation.
#[derive(Debug, Clone)]
struct PairPlan {
    left_arity: u8,
    right_arity: u8,
    cells: Vec<CellPlan>,
    /// Targets for aux slots 1.. of the left cell once it turns to Air.
    left_wires: Vec<LinkTarget>,
    /// Targets for aux slots 1.. of the right cell once it turns to Air.
    right_wires: Vec<LinkTarget>,
}

/// The immutable output of rule compilation: the completed registry, the
/// pair dispatch table and the per-kind erasure table.
pub struct CompiledRules {
    registry: KindRegistry,
    total: usize,
    /// Indexed by `right_id * total + left_id`.
    dispatch: Vec<Option<PairFn>>,
    /// Indexed by kind id; only user kinds have an entry.
    erasure: Vec<Option<EraseFn>>,
}

/// Compiles a statement list into a rule set ready for reduction.
///
/// Kinds are registered in a first pass, so rules may reference kinds
/// declared later in the source.
pub fn compile(statements: &[Statement<'_>]) -> Result<CompiledRules, RuleError> {
    let mut registry = KindRegistry::new();
    for statement in statements {
        if let Statement::Kind(decl) = statement {
            registry.declare(decl.name, decl.arity)?;
        }
    }

    let total = registry.len();
    let mut dispatch: Vec<Option<PairFn>> = (0..total * total).map(|_| None).collect();
    let mut erasure: Vec<Option<EraseFn>> = (0..total).map(|_| None).collect();

    // Erasure procedures exist for user kinds only: erasing Air is a no-op
    // and the built-ins never self-annihilate.
    for kind in registry.iter().skip(FIRST_USER as usize) {
        let arity = kind.arity;
        erasure[kind.id as usize] = Some(Box::new(move |mem, addr| apply_erase(arity, mem, addr)));
    }

    let mut rule_count = 0usize;
    for statement in statements {
        if let Statement::Rule(rule) = statement {
            compile_rule(rule, &registry, total, &mut dispatch)?;
            rule_count += 1;
        }
    }
    debug!(
        "compiled {} rules over {} kinds ({} user)",
        rule_count,
        total,
        total - FIRST_USER as usize
    );

    Ok(CompiledRules {
        registry,
        total,
        dispatch,
        erasure,
    })
}

impl std::fmt::Debug for CompiledRules {
    // The dispatch closures are opaque; summarize the table occupancy.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRules")
            .field("total_kinds", &self.total)
            .field(
                "pair_procedures",
                &self.dispatch.iter().filter(|p| p.is_some()).count(),
            )
            .field(
                "erasure_procedures",
                &self.erasure.iter().filter(|p| p.is_some()).count(),
            )
            .finish_non_exhaustive()
    }
}

impl CompiledRules {
    /// The completed kind registry.
    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Total number of kinds the dispatch table was sized for.
    pub fn total_kinds(&self) -> usize {
        self.total
    }

    /// Whether a rewrite procedure exists for the ordered pair.
    pub fn has_pair(&self, left: KindId, right: KindId) -> bool {
        self.dispatch[right as usize * self.total + left as usize].is_some()
    }

    /// Whether an erasure procedure exists for `kind`.
    pub fn has_erasure(&self, kind: KindId) -> bool {
        self.erasure
            .get(kind as usize)
            .map_or(false, Option::is_some)
    }

    /// Applies the compiled procedure for a confirmed redex. Returns false
    /// when no procedure matches, which leaves the pair stuck; that is a
    /// legitimate terminal configuration, not an error.
    pub fn rewrite(&self, mem: &mut Memory, redex: Redex) -> bool {
        match redex {
            Redex::Erase(addr) => {
                let kind = mem.kind_at(addr);
                match self.erasure.get(kind as usize).and_then(Option::as_ref) {
                    Some(proc_) => proc_(mem, addr),
                    None => false,
                }
            }
            Redex::Pair(a, b) => {
                let left = mem.kind_at(a) as usize;
                let right = mem.kind_at(b) as usize;
                if left >= self.total || right >= self.total {
                    return false;
                }
                match &self.dispatch[right * self.total + left] {
                    Some(proc_) => proc_(mem, a, b),
                    None => false,
                }
            }
        }
    }
}

fn compile_rule(
    rule: &RuleDecl<'_>,
    registry: &KindRegistry,
    total: usize,
    dispatch: &mut [Option<PairFn>],
) -> Result<(), RuleError> {
    let undeclared = |name: &str| RuleError::UndeclaredKind {
        left: rule.left.to_string(),
        right: rule.right.to_string(),
        name: name.to_string(),
    };
    let left_id = registry.id(rule.left).ok_or_else(|| undeclared(rule.left))?;
    let right_id = registry
        .id(rule.right)
        .ok_or_else(|| undeclared(rule.right))?;

    // Classify template variables once; the mirrored orientation reuses
    // them with the external sides swapped.
    let mut cells: Vec<(KindId, u8, Vec<VarRef<'_>>)> = Vec::with_capacity(rule.cells.len());
    for template in &rule.cells {
        let kind = registry
            .id(template.kind)
            .ok_or_else(|| undeclared(template.kind))?;
        let arity = registry.arity(kind);
        if template.vars.len() != arity as usize {
            return Err(RuleError::TemplateArityMismatch {
                left: rule.left.to_string(),
                right: rule.right.to_string(),
                kind: template.kind.to_string(),
                expected: arity,
                found: template.vars.len(),
            });
        }
        let vars = template.vars.iter().map(|v| VarRef::classify(v)).collect();
        cells.push((kind, arity, vars));
    }

    for flipped in [false, true] {
        if flipped && left_id == right_id {
            continue;
        }
        let (l, r) = if flipped {
            (right_id, left_id)
        } else {
            (left_id, right_id)
        };
        let oriented: Vec<(KindId, u8, Vec<VarRef<'_>>)> = if flipped {
            cells
                .iter()
                .map(|(kind, arity, vars)| {
                    (*kind, *arity, vars.iter().map(|v| v.flipped()).collect())
                })
                .collect()
        } else {
            cells.clone()
        };

        let plan = resolve_links(rule, &oriented, registry.arity(l), registry.arity(r))?;
        let key = r as usize * total + l as usize;
        if dispatch[key].is_some() {
            debug!(
                "rule {}-{} overrides an earlier rule for the same pair",
                registry.name(l),
                registry.name(r)
            );
        }
        dispatch[key] = Some(Box::new(move |mem, a, b| apply_pair(&plan, mem, a, b)));
    }
    Ok(())
}

/// Walks the template cells left to right and resolves every symbolic
/// variable into a [`LinkTarget`]. A variable seen twice splices the two
/// half-links into one internal wire; `<N` / `N>` bind a port to the
/// corresponding neighbor of the active pair, resolved at rewrite time.
fn resolve_links(
    rule: &RuleDecl<'_>,
    cells: &[(KindId, u8, Vec<VarRef<'_>>)],
    left_arity: u8,
    right_arity: u8,
) -> Result<PairPlan, RuleError> {
    let err_side = |side: &'static str, slot: u8, dup: bool| {
        let (left, right) = (rule.left.to_string(), rule.right.to_string());
        if dup {
            RuleError::DuplicateExternal {
                left,
                right,
                side,
                slot,
            }
        } else {
            RuleError::UnwiredExternal {
                left,
                right,
                side,
                slot,
            }
        }
    };

    let mut ports: Vec<Vec<Option<LinkTarget>>> = cells
        .iter()
        .map(|(_, arity, _)| vec![None; *arity as usize])
        .collect();
    let mut left_wires: Vec<Option<LinkTarget>> =
        vec![None; (left_arity as usize).saturating_sub(1)];
    let mut right_wires: Vec<Option<LinkTarget>> =
        vec![None; (right_arity as usize).saturating_sub(1)];

    // Internal variables with one end seen so far, plus their first-seen
    // order so an unclosed variable is reported deterministically.
    let mut open: FxHashMap<&str, (usize, u8)> = FxHashMap::default();
    let mut open_order: Vec<&str> = Vec::new();
    // Internal variables already spliced; a third use is an error.
    let mut closed: FxHashSet<&str> = FxHashSet::default();

    for (i, (_, _, vars)) in cells.iter().enumerate() {
        for (s, var) in vars.iter().enumerate() {
            let slot = s as u8;
            match *var {
                VarRef::Left(ext) => {
                    if ext == 0 || ext >= left_arity {
                        return Err(RuleError::ExternalOutOfRange {
                            left: rule.left.to_string(),
                            right: rule.right.to_string(),
                            slot: ext,
                            arity: left_arity,
                        });
                    }
                    let wire = &mut left_wires[ext as usize - 1];
                    if wire.is_some() {
                        return Err(err_side("left", ext, true));
                    }
                    *wire = Some(LinkTarget::Cell { cell: i, slot });
                    ports[i][s] = Some(LinkTarget::Left { slot: ext });
                }
                VarRef::Right(ext) => {
                    if ext == 0 || ext >= right_arity {
                        return Err(RuleError::ExternalOutOfRange {
                            left: rule.left.to_string(),
                            right: rule.right.to_string(),
                            slot: ext,
                            arity: right_arity,
                        });
                    }
                    let wire = &mut right_wires[ext as usize - 1];
                    if wire.is_some() {
                        return Err(err_side("right", ext, true));
                    }
                    *wire = Some(LinkTarget::Cell { cell: i, slot });
                    ports[i][s] = Some(LinkTarget::Right { slot: ext });
                }
                VarRef::Name(name) => {
                    if let Some((j, t)) = open.remove(name) {
                        ports[i][s] = Some(LinkTarget::Cell { cell: j, slot: t });
                        ports[j][t as usize] = Some(LinkTarget::Cell { cell: i, slot });
                        closed.insert(name);
                    } else if closed.contains(name) {
                        return Err(RuleError::UnbalancedVariable {
                            left: rule.left.to_string(),
                            right: rule.right.to_string(),
                            var: name.to_string(),
                        });
                    } else {
                        open.insert(name, (i, slot));
                        open_order.push(name);
                    }
                }
            }
        }
    }

    // Report the first variable that never got its second end.
    if let Some(name) = open_order.into_iter().find(|name| open.contains_key(*name)) {
        return Err(RuleError::UnbalancedVariable {
            left: rule.left.to_string(),
            right: rule.right.to_string(),
            var: name.to_string(),
        });
    }

    let unwrap_wires = |wires: Vec<Option<LinkTarget>>, side: &'static str| {
        wires
            .into_iter()
            .enumerate()
            .map(|(i, wire)| wire.ok_or_else(|| err_side(side, i as u8 + 1, false)))
            .collect::<Result<Vec<_>, _>>()
    };
    let left_wires = unwrap_wires(left_wires, "left")?;
    let right_wires = unwrap_wires(right_wires, "right")?;

    let cells = cells
        .iter()
        .zip(ports)
        .map(|((kind, arity, _), resolved)| CellPlan {
            kind: *kind,
            arity: *arity,
            // Every slot was assigned above: externals directly, internals
            // when their second end spliced the wire.
            ports: resolved.into_iter().map(Option::unwrap).collect(),
        })
        .collect();

    Ok(PairPlan {
        left_arity,
        right_arity,
        cells,
        left_wires,
        right_wires,
    })
}

/// The compiled rewrite procedure for one ordered kind pair. `a` and `b`
/// are known to form a redex of the matching kinds.
fn apply_pair(plan: &PairPlan, mem: &mut Memory, a: u32, b: u32) -> bool {
    // Capture both cells' aux neighbors before any mutation clobbers them.
    let a_out: Vec<Port> = (1..plan.left_arity).map(|s| mem.port(a, s)).collect();
    let b_out: Vec<Port> = (1..plan.right_arity).map(|s| mem.port(b, s)).collect();

    let fresh: Vec<u32> = plan
        .cells
        .iter()
        .map(|cell| mem.alloc(cell.arity as u32 + 1))
        .collect();

    let resolve = |target: LinkTarget| -> Port {
        match target {
            LinkTarget::Cell { cell, slot } => Port::new(fresh[cell], slot),
            LinkTarget::Left { slot } => a_out[slot as usize - 1],
            LinkTarget::Right { slot } => b_out[slot as usize - 1],
        }
    };

    for (i, cell) in plan.cells.iter().enumerate() {
        mem.set_info(fresh[i], pack_info(cell.kind));
        for (s, &target) in cell.ports.iter().enumerate() {
            mem.set_port(fresh[i], s as u8, resolve(target));
        }
    }

    // The old pair becomes Air placeholders of the original size, with aux
    // slots repointed at the rewrite's external targets: a pointer still
    // chasing the dead cells resolves through one extra hop.
    mem.set_info(a, pack_info(air_for_arity(plan.left_arity)));
    mem.set_info(b, pack_info(air_for_arity(plan.right_arity)));
    for (s, &target) in plan.left_wires.iter().enumerate() {
        mem.set_port(a, s as u8 + 1, resolve(target));
    }
    for (s, &target) in plan.right_wires.iter().enumerate() {
        mem.set_port(b, s as u8 + 1, resolve(target));
    }

    // Path-compress the neighbors' back pointers, then the new-cell ports
    // wired straight to a neighbor; either may still see a placeholder
    // from an interleaved rewrite.
    for &port in a_out.iter().chain(&b_out) {
        attach(mem, port);
    }
    for (i, cell) in plan.cells.iter().enumerate() {
        for (s, target) in cell.ports.iter().enumerate() {
            if !matches!(target, LinkTarget::Cell { .. }) {
                attach(mem, Port::new(fresh[i], s as u8));
            }
        }
    }

    for (cell, &addr) in plan.cells.iter().zip(&fresh) {
        // An arity-0 cell has no principal port to examine; reading slot 0
        // would hit the next cell's info word.
        if cell.arity > 0 {
            check_redex(mem, addr);
        }
    }
    for &port in a_out.iter().chain(&b_out) {
        check_redex(mem, port.addr());
    }

    mem.free(a, plan.left_arity as u32 + 1);
    mem.free(b, plan.right_arity as u32 + 1);
    true
}

/// The compiled erasure procedure for a user kind whose principal port
/// loops back to itself. Each neighbor's matching slot is overwritten with
/// a self-loop, the eraser marker the next generation picks up, so erasure
/// cascades outward one hop at a time.
fn apply_erase(arity: u8, mem: &mut Memory, addr: u32) -> bool {
    let outs: Vec<Port> = (1..arity).map(|s| mem.port(addr, s)).collect();
    mem.set_info(addr, pack_info(air_for_arity(arity)));
    for &port in &outs {
        mem.store(port, port);
    }
    for &port in &outs {
        check_redex(mem, port.addr());
    }
    mem.free(addr, arity as u32 + 1);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{ERA, ROT};

    fn compile_src(src: &str) -> Result<CompiledRules, RuleError> {
        let statements = tangle_ir::parse(src).expect("DSL parse failed");
        compile(&statements)
    }

    const DUP_CON: &str = "\
        (kind Con 3)\n\
        (kind Dup 3)\n\
        (rule Dup Con (Con <1 x y) (Con <2 z w) (Dup 1> x z) (Dup 2> y w))";

    #[test]
    fn compiles_both_orientations() {
        let rules = compile_src(DUP_CON).unwrap();
        let registry = rules.registry();
        let con = registry.id("Con").unwrap();
        let dup = registry.id("Dup").unwrap();
        assert!(rules.has_pair(dup, con));
        assert!(rules.has_pair(con, dup));
        assert!(!rules.has_pair(con, con));
    }

    #[test]
    fn symmetric_rule_gets_single_orientation() {
        let rules = compile_src(
            "(kind Con 3)\n(rule Con Con (Con <1 a b) (Con <2 c d) (Con 1> a c) (Con 2> b d))",
        )
        .unwrap();
        let con = rules.registry().id("Con").unwrap();
        assert!(rules.has_pair(con, con));
    }

    #[test]
    fn erasure_only_for_user_kinds() {
        let rules = compile_src(DUP_CON).unwrap();
        let con = rules.registry().id("Con").unwrap();
        assert!(rules.has_erasure(con));
        assert!(!rules.has_erasure(ERA));
        assert!(!rules.has_erasure(ROT));
        assert!(!rules.has_erasure(0));
    }

    #[test]
    fn rules_may_reference_later_kinds() {
        let rules = compile_src(
            "(rule Dup Con (Con <1 x y) (Con <2 z w) (Dup 1> x z) (Dup 2> y w))\n\
             (kind Con 3)\n\
             (kind Dup 3)",
        )
        .unwrap();
        let con = rules.registry().id("Con").unwrap();
        let dup = rules.registry().id("Dup").unwrap();
        assert!(rules.has_pair(dup, con));
    }

    #[test]
    fn undeclared_kind_is_fatal() {
        let err = compile_src("(kind Con 3)\n(rule Con Ghost (Con <1 1> x x))").unwrap_err();
        assert!(matches!(err, RuleError::UndeclaredKind { ref name, .. } if name == "Ghost"));
    }

    #[test]
    fn template_arity_must_match_kind() {
        let err = compile_src("(kind Con 3)\n(rule Con Con (Con <1 x))").unwrap_err();
        assert!(matches!(err, RuleError::TemplateArityMismatch { .. }));
    }

    #[test]
    fn lone_internal_variable_is_fatal() {
        // `lone` and `extra` both miss their second end; the first-seen one
        // is the one reported.
        let err = compile_src(
            "(kind Con 3)\n(rule Con Con (Con <1 a b) (Con <2 c lone) (Con 1> a c) (Con 2> b extra))",
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::UnbalancedVariable { ref var, .. } if var == "lone"));
    }

    #[test]
    fn unwired_external_is_fatal() {
        // Slot 2 of the left cell is never mentioned.
        let err = compile_src(
            "(kind Con 3)\n(kind One 2)\n(rule Con One (One <1 a) (One a b) (One 1> b))",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RuleError::UnwiredExternal { side: "left", slot: 2, .. }
        ));
    }

    #[test]
    fn debug_output_summarizes_tables() {
        let rules = compile_src(DUP_CON).unwrap();
        let text = format!("{:?}", rules);
        assert!(text.contains("total_kinds: 20"));
        assert!(text.contains("pair_procedures: 2"));
    }

    #[test]
    fn template_may_allocate_arity_zero_cells() {
        use crate::engine::Engine;
        use crate::text::parse_net;

        let rules = compile_src("(kind A 1)\n(kind Nil 0)\n(rule A A (Nil))").unwrap();
        let mem = parse_net("A x\nA x", rules.registry()).unwrap();
        let mut engine = Engine::new(mem, &rules);
        engine.scan_all();
        engine.step();

        // The fresh constant was written after the consumed pair and, having
        // no ports, is never enqueued.
        let nil = rules.registry().id("Nil").unwrap();
        assert_eq!(engine.memory().kind_at(4), nil);
        assert!(engine.memory().red.is_empty());
    }

    #[test]
    fn external_slot_zero_is_rejected() {
        let err = compile_src("(kind One 2)\n(rule One One (One <0 a) (One a <1))").unwrap_err();
        assert!(matches!(err, RuleError::ExternalOutOfRange { slot: 0, .. }));
    }
}
