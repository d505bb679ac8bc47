use accel_ir::{self as ir, Guard, PortComp, PortRef};
use accel_utils::math;
use itertools::Itertools;
use std::collections::HashMap;

/// Largest disjunctive normal form the prover expands. Guards that need more
/// clauses are treated as possibly overlapping.
pub const MAX_CLAUSES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Operand {
    Port(PortRef),
    Const(u64),
}

/// A comparison `lhs op rhs` with a non-constant port on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Atom {
    op: PortComp,
    lhs: PortRef,
    rhs: Operand,
}

/// A conjunction of atoms.
type Clause = Vec<Atom>;

/// Orderings between two values allowed by a comparison, as a bitmask over
/// `{less, equal, greater}`.
fn relation(op: PortComp) -> u8 {
    const LT: u8 = 0b001;
    const EQ: u8 = 0b010;
    const GT: u8 = 0b100;
    match op {
        PortComp::Lt => LT,
        PortComp::Eq => EQ,
        PortComp::Gt => GT,
        PortComp::Leq => LT | EQ,
        PortComp::Geq => GT | EQ,
        PortComp::Neq => LT | GT,
    }
}

/// Values a port may still take within one conjunction.
#[derive(Debug, Clone)]
struct Range {
    lo: u64,
    hi: u64,
    excluded: Vec<u64>,
}

impl Range {
    fn new(max: u64) -> Self {
        Self {
            lo: 0,
            hi: max,
            excluded: vec![],
        }
    }

    /// Narrow the range with `port op v`. Returns false once the range is
    /// empty.
    fn constrain(&mut self, op: PortComp, v: u64) -> bool {
        match op {
            PortComp::Eq => {
                self.lo = self.lo.max(v);
                self.hi = self.hi.min(v);
            }
            PortComp::Neq => self.excluded.push(v),
            PortComp::Lt => match v.checked_sub(1) {
                Some(v) => self.hi = self.hi.min(v),
                None => return false,
            },
            PortComp::Leq => self.hi = self.hi.min(v),
            PortComp::Gt => match v.checked_add(1) {
                Some(v) => self.lo = self.lo.max(v),
                None => return false,
            },
            PortComp::Geq => self.lo = self.lo.max(v),
        }
        self.lo <= self.hi
    }

    fn feasible(&self) -> bool {
        if self.lo > self.hi {
            return false;
        }
        let holes = self
            .excluded
            .iter()
            .filter(|v| (self.lo..=self.hi).contains(*v))
            .unique()
            .count() as u128;
        holes < (self.hi - self.lo) as u128 + 1
    }
}

/// Proves that two guards of a component are never true in the same cycle.
///
/// Both guards are expanded into disjunctive normal form and every pair of
/// clauses is refuted separately. Comparisons against constants are tracked
/// as value ranges per port, comparisons between two ports are tracked as the
/// set of orderings they allow. Anything the prover cannot refute counts as
/// overlapping, so a `true` answer is always sound.
pub struct GuardExclusion<'a> {
    comp: &'a ir::Component,
}

impl<'a> GuardExclusion<'a> {
    pub fn new(comp: &'a ir::Component) -> Self {
        Self { comp }
    }

    /// Returns true only if `g1` and `g2` can never both hold.
    pub fn exclusive(&self, g1: &Guard, g2: &Guard) -> bool {
        let (Some(left), Some(right)) =
            (self.dnf(g1, false), self.dnf(g2, false))
        else {
            return false;
        };
        if left.len().saturating_mul(right.len()) > MAX_CLAUSES {
            return false;
        }
        left.iter()
            .cartesian_product(right.iter())
            .all(|(l, r)| !self.satisfiable(l.iter().chain(r.iter())))
    }

    /// Returns true only if `guard` can never hold.
    pub fn unsatisfiable(&self, guard: &Guard) -> bool {
        self.dnf(guard, false)
            .is_some_and(|clauses| clauses.iter().all(|c| !self.satisfiable(c.iter())))
    }

    fn operand(&self, port: &PortRef) -> Operand {
        match self.comp.constant_value(port) {
            Some((val, _)) => Operand::Const(val),
            None => Operand::Port(*port),
        }
    }

    fn max_value(&self, port: &PortRef) -> u64 {
        self.comp
            .port_def(port)
            .map(|(width, _)| math::mask(width))
            .unwrap_or(u64::MAX)
    }

    /// Disjunctive normal form of a single comparison.
    fn compare(&self, op: PortComp, lhs: Operand, rhs: Operand) -> Vec<Clause> {
        let atom = match (lhs, rhs) {
            (Operand::Const(l), Operand::Const(r)) => {
                return if op.eval(l, r) { vec![vec![]] } else { vec![] };
            }
            (Operand::Port(lhs), rhs) => Atom { op, lhs, rhs },
            (Operand::Const(l), Operand::Port(rhs)) => Atom {
                op: op.flip(),
                lhs: rhs,
                rhs: Operand::Const(l),
            },
        };
        vec![vec![atom]]
    }

    /// Disjunctive normal form of `guard`, or of its negation when `negated`
    /// is set. `None` if the expansion grows past [MAX_CLAUSES].
    fn dnf(&self, guard: &Guard, negated: bool) -> Option<Vec<Clause>> {
        match (guard, negated) {
            (Guard::True, false) => Some(vec![vec![]]),
            (Guard::True, true) => Some(vec![]),
            (Guard::Not(inner), _) => self.dnf(inner, !negated),
            (Guard::Or(l, r), false) | (Guard::And(l, r), true) => {
                let mut clauses = self.dnf(l, negated)?;
                clauses.extend(self.dnf(r, negated)?);
                (clauses.len() <= MAX_CLAUSES).then_some(clauses)
            }
            (Guard::And(l, r), false) | (Guard::Or(l, r), true) => {
                let left = self.dnf(l, negated)?;
                let right = self.dnf(r, negated)?;
                if left.len().saturating_mul(right.len()) > MAX_CLAUSES {
                    return None;
                }
                Some(
                    left.iter()
                        .cartesian_product(right.iter())
                        .map(|(a, b)| a.iter().chain(b.iter()).copied().collect())
                        .collect(),
                )
            }
            (Guard::Port(p), _) => {
                let expect = if negated { 0 } else { 1 };
                Some(self.compare(
                    PortComp::Eq,
                    self.operand(p),
                    Operand::Const(expect),
                ))
            }
            (Guard::CompOp(op, l, r), _) => {
                let op = if negated { op.negate() } else { *op };
                Some(self.compare(op, self.operand(l), self.operand(r)))
            }
        }
    }

    /// Can every atom of the conjunction hold at once?
    fn satisfiable<'b, I>(&self, atoms: I) -> bool
    where
        I: Iterator<Item = &'b Atom>,
    {
        let mut ranges: HashMap<PortRef, Range> = HashMap::new();
        let mut orderings: HashMap<(PortRef, PortRef), u8> = HashMap::new();
        for atom in atoms {
            match atom.rhs {
                Operand::Const(v) => {
                    let range = ranges
                        .entry(atom.lhs)
                        .or_insert_with(|| Range::new(self.max_value(&atom.lhs)));
                    if !range.constrain(atom.op, v) {
                        return false;
                    }
                }
                Operand::Port(rhs) => {
                    // Orient every pair the same way.
                    let (key, op) = if atom.lhs <= rhs {
                        ((atom.lhs, rhs), atom.op)
                    } else {
                        ((rhs, atom.lhs), atom.op.flip())
                    };
                    let allowed = if key.0 == key.1 {
                        relation(op) & relation(PortComp::Eq)
                    } else {
                        let entry = orderings.entry(key).or_insert(0b111);
                        *entry &= relation(op);
                        *entry
                    };
                    if allowed == 0 {
                        return false;
                    }
                }
            }
        }
        ranges.values().all(Range::feasible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_ir::{Builder, Component, LibrarySignatures, PortDef};

    fn component() -> Component {
        Component::new(
            "main",
            vec![
                PortDef::input("x", 2),
                PortDef::input("y", 2),
                PortDef::input("p", 1),
            ],
        )
    }

    #[test]
    fn complementary_ports() {
        let comp = component();
        let prover = GuardExclusion::new(&comp);
        let p = Guard::port(PortRef::this("p"));
        let go = Guard::port(PortRef::this("go"));
        assert!(prover.exclusive(&p, &!p.clone()));
        assert!(!prover.exclusive(&p, &go));
        assert!(prover.exclusive(&(p.clone() & go.clone()), &!go.clone()));
        assert!(!prover.exclusive(&Guard::True, &p));
    }

    #[test]
    fn constant_comparisons() {
        let lib = LibrarySignatures::default();
        let mut comp = component();
        let mut b = Builder::new(&mut comp, &lib);
        let c1 = b.constant(1, 2).unwrap();
        let c2 = b.constant(2, 2).unwrap();
        let c3 = b.constant(3, 2).unwrap();
        let x = PortRef::this("x");
        let eq = |c| Guard::comp(PortComp::Eq, x, c);

        let prover = GuardExclusion::new(&comp);
        assert!(prover.exclusive(&eq(c1), &eq(c2)));
        assert!(!prover.exclusive(&eq(c1), &eq(c1)));
        let lt = Guard::comp(PortComp::Lt, x, c2);
        let gt = Guard::comp(PortComp::Gt, x, c1);
        assert!(prover.exclusive(&lt, &!lt.clone()));
        assert!(prover.exclusive(&lt, &gt));
        let below3 = Guard::comp(PortComp::Lt, x, c3);
        assert!(!prover.exclusive(&below3, &gt));
        // A 2-bit port above 2 that is not 3 does not exist.
        let tight = Guard::comp(PortComp::Gt, x, c2)
            & Guard::comp(PortComp::Neq, x, c3);
        assert!(prover.unsatisfiable(&tight));
        // Constant on the left is flipped.
        let flipped = Guard::comp(PortComp::Lt, c2, x);
        assert!(prover.exclusive(&flipped, &lt));
    }

    #[test]
    fn port_orderings() {
        let comp = component();
        let prover = GuardExclusion::new(&comp);
        let (x, y) = (PortRef::this("x"), PortRef::this("y"));
        let lt = Guard::comp(PortComp::Lt, x, y);
        assert!(prover.exclusive(&lt, &Guard::comp(PortComp::Lt, y, x)));
        assert!(prover.exclusive(&lt, &Guard::comp(PortComp::Eq, y, x)));
        assert!(!prover.exclusive(&lt, &Guard::comp(PortComp::Leq, x, y)));
        assert!(prover.unsatisfiable(&Guard::comp(PortComp::Neq, x, x)));
    }
}
