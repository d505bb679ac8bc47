use crate::PortRef;
use std::ops::{BitAnd, BitOr, Not};

/// Comparison operations that can be performed between ports by [Guard::CompOp].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortComp {
    /// p1 == p2
    Eq,
    /// p1 != p2
    Neq,
    /// p1 > p2
    Gt,
    /// p1 < p2
    Lt,
    /// p1 >= p2
    Geq,
    /// p1 <= p2
    Leq,
}

impl PortComp {
    /// The comparison that holds exactly when `self` does not.
    pub fn negate(&self) -> Self {
        match self {
            PortComp::Eq => PortComp::Neq,
            PortComp::Neq => PortComp::Eq,
            PortComp::Gt => PortComp::Leq,
            PortComp::Lt => PortComp::Geq,
            PortComp::Geq => PortComp::Lt,
            PortComp::Leq => PortComp::Gt,
        }
    }

    /// The comparison with its operands swapped: `a op b == b op.flip() a`.
    pub fn flip(&self) -> Self {
        match self {
            PortComp::Eq => PortComp::Eq,
            PortComp::Neq => PortComp::Neq,
            PortComp::Gt => PortComp::Lt,
            PortComp::Lt => PortComp::Gt,
            PortComp::Geq => PortComp::Leq,
            PortComp::Leq => PortComp::Geq,
        }
    }

    pub fn eval(&self, l: u64, r: u64) -> bool {
        match self {
            PortComp::Eq => l == r,
            PortComp::Neq => l != r,
            PortComp::Gt => l > r,
            PortComp::Lt => l < r,
            PortComp::Geq => l >= r,
            PortComp::Leq => l <= r,
        }
    }

    pub fn op_str(&self) -> &'static str {
        match self {
            PortComp::Eq => "==",
            PortComp::Neq => "!=",
            PortComp::Gt => ">",
            PortComp::Lt => "<",
            PortComp::Geq => ">=",
            PortComp::Leq => "<=",
        }
    }
}

/// An assignment guard. Reads ports of the enclosing component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Guard {
    /// Represents `c1 || c2`.
    Or(Box<Guard>, Box<Guard>),
    /// Represents `c1 && c2`.
    And(Box<Guard>, Box<Guard>),
    /// Represents `!c1`
    Not(Box<Guard>),
    #[default]
    /// The constant true
    True,
    /// Comparison operator.
    CompOp(PortComp, PortRef, PortRef),
    /// Uses the value on a 1-bit port as the condition.
    Port(PortRef),
}

impl Guard {
    /// Returns true definitely `Guard::True`.
    pub fn is_true(&self) -> bool {
        match self {
            Guard::True => true,
            Guard::Not(g) => g.is_false(),
            _ => false,
        }
    }

    /// Returns true if definitely `!Guard::True`.
    pub fn is_false(&self) -> bool {
        match self {
            Guard::Not(g) => g.is_true(),
            _ => false,
        }
    }

    pub fn port(p: PortRef) -> Self {
        Guard::Port(p)
    }

    pub fn comp(op: PortComp, l: PortRef, r: PortRef) -> Self {
        Guard::CompOp(op, l, r)
    }

    pub fn and(self, rhs: Guard) -> Self {
        if rhs.is_true() {
            self
        } else if self.is_true() {
            rhs
        } else if self == rhs {
            self
        } else {
            Guard::And(Box::new(self), Box::new(rhs))
        }
    }

    pub fn or(self, rhs: Guard) -> Self {
        if self.is_true() || rhs.is_true() {
            Guard::True
        } else if self.is_false() {
            rhs
        } else if rhs.is_false() || self == rhs {
            self
        } else {
            Guard::Or(Box::new(self), Box::new(rhs))
        }
    }

    /// Disjunction of all the guards; false when there are none.
    pub fn any<I: IntoIterator<Item = Guard>>(guards: I) -> Self {
        guards
            .into_iter()
            .reduce(Guard::or)
            .unwrap_or_else(|| !Guard::True)
    }

    /// Binding strength used to decide where parentheses are needed when
    /// printing.
    pub fn precedence(&self) -> u8 {
        match self {
            Guard::Or(..) => 0,
            Guard::And(..) => 1,
            Guard::CompOp(..) => 2,
            Guard::Not(_) => 3,
            Guard::True | Guard::Port(_) => 4,
        }
    }

    /// All the ports read by this guard.
    pub fn all_ports(&self) -> Vec<PortRef> {
        let mut ports = vec![];
        self.collect_ports(&mut ports);
        ports
    }

    fn collect_ports(&self, acc: &mut Vec<PortRef>) {
        match self {
            Guard::Or(l, r) | Guard::And(l, r) => {
                l.collect_ports(acc);
                r.collect_ports(acc);
            }
            Guard::Not(g) => g.collect_ports(acc),
            Guard::True => {}
            Guard::CompOp(_, l, r) => {
                acc.push(*l);
                acc.push(*r);
            }
            Guard::Port(p) => acc.push(*p),
        }
    }

    /// Evaluate the guard with `read` providing port values.
    pub fn eval<F>(&self, read: &F) -> bool
    where
        F: Fn(&PortRef) -> u64,
    {
        match self {
            Guard::Or(l, r) => l.eval(read) || r.eval(read),
            Guard::And(l, r) => l.eval(read) && r.eval(read),
            Guard::Not(g) => !g.eval(read),
            Guard::True => true,
            Guard::CompOp(op, l, r) => op.eval(read(l), read(r)),
            Guard::Port(p) => read(p) != 0,
        }
    }
}

/// Construct guards from ports
impl From<PortRef> for Guard {
    fn from(port: PortRef) -> Self {
        Guard::Port(port)
    }
}

impl Not for Guard {
    type Output = Guard;

    fn not(self) -> Self {
        match self {
            Guard::CompOp(op, lhs, rhs) => Guard::CompOp(op.negate(), lhs, rhs),
            Guard::Not(expr) => *expr,
            _ => Guard::Not(Box::new(self)),
        }
    }
}

impl BitAnd for Guard {
    type Output = Self;

    fn bitand(self, other: Self) -> Self::Output {
        self.and(other)
    }
}

impl BitOr for Guard {
    type Output = Self;

    fn bitor(self, other: Self) -> Self::Output {
        self.or(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellIdx, PortRef};

    fn p(name: &str) -> PortRef {
        PortRef::cell(CellIdx::from(0_u32), name)
    }

    #[test]
    fn simplifications() {
        let g = Guard::port(p("a"));
        assert_eq!(g.clone() & Guard::True, g);
        assert_eq!(Guard::True | g.clone(), Guard::True);
        assert_eq!(!!g.clone(), g);
        assert!(Guard::any(vec![]).is_false());
        assert_eq!(
            !Guard::comp(PortComp::Lt, p("a"), p("b")),
            Guard::comp(PortComp::Geq, p("a"), p("b"))
        );
    }

    #[test]
    fn evaluation() {
        let g = Guard::comp(PortComp::Gt, p("a"), p("b")) & !Guard::port(p("c"));
        let read = |port: &PortRef| match port.port.as_str() {
            "a" => 7,
            "b" => 3,
            _ => 0,
        };
        assert!(g.eval(&read));
        assert_eq!(g.all_ports().len(), 3);
    }
}
