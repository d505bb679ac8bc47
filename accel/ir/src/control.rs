use crate::{CellIdx, CombGroupIdx, GroupIdx, Id, PortRef};

/// Data for the `seq` control statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seq {
    /// List of `Control` statements to run in sequence.
    pub stmts: Vec<Control>,
}

/// Data for the `par` control statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Par {
    /// List of `Control` statements to run in parallel.
    pub stmts: Vec<Control>,
}

/// Data for the `if` control statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    /// Port that connects the conditional check.
    pub port: PortRef,
    /// Optional combinational group attached using `with`.
    pub cond: Option<CombGroupIdx>,
    /// Control for the true branch.
    pub tbranch: Box<Control>,
    /// Control for the false branch.
    pub fbranch: Box<Control>,
}

/// Data for the `while` control statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct While {
    /// Port that connects the conditional check.
    pub port: PortRef,
    /// Group that makes the signal on the conditional port valid.
    pub cond: Option<CombGroupIdx>,
    /// Control for the loop body.
    pub body: Box<Control>,
}

/// Data for the `enable` control statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enable {
    /// The group to run.
    pub group: GroupIdx,
}

/// Data for an `invoke` control statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoke {
    /// Cell that is being invoked.
    pub comp: CellIdx,
    /// Mapping from name of input ports in `comp` to the port connected to it.
    pub inputs: Vec<(Id, PortRef)>,
    /// Mapping from name of output ports in `comp` to the port they drive
    /// while the invoke is active.
    pub outputs: Vec<(Id, PortRef)>,
    /// Cells passed by reference, from the name of the reference cell inside
    /// the invoked component to the cell lent by the parent.
    pub ref_cells: Vec<(Id, CellIdx)>,
}

/// Data for the `empty` control statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Empty;

/// Control AST nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Represents sequential composition of control statements.
    Seq(Seq),
    /// Represents parallel composition of control statements.
    Par(Par),
    /// Standard imperative if statement
    If(If),
    /// Standard imperative while statement
    While(While),
    /// Invoke a sub-component with the given port assignments
    Invoke(Invoke),
    /// Runs the control for a list of subcomponents.
    Enable(Enable),
    /// Control statement that does nothing.
    Empty(Empty),
}

impl Default for Control {
    fn default() -> Self {
        Control::Empty(Empty)
    }
}

impl Control {
    /// Convience constructor for empty.
    pub fn empty() -> Self {
        Control::Empty(Empty)
    }

    /// Convience constructor for seq.
    pub fn seq(stmts: Vec<Control>) -> Self {
        Control::Seq(Seq { stmts })
    }

    /// Convience constructor for par.
    pub fn par(stmts: Vec<Control>) -> Self {
        Control::Par(Par { stmts })
    }

    /// Convience constructor for enable.
    pub fn enable(group: GroupIdx) -> Self {
        Control::Enable(Enable { group })
    }

    /// Convience constructor for if
    pub fn if_(
        port: PortRef,
        cond: Option<CombGroupIdx>,
        tbranch: Control,
        fbranch: Control,
    ) -> Self {
        Control::If(If {
            port,
            cond,
            tbranch: Box::new(tbranch),
            fbranch: Box::new(fbranch),
        })
    }

    /// Convience constructor for while
    pub fn while_(
        port: PortRef,
        cond: Option<CombGroupIdx>,
        body: Control,
    ) -> Self {
        Control::While(While {
            port,
            cond,
            body: Box::new(body),
        })
    }

    /// Convience constructor for invoke.
    pub fn invoke(comp: CellIdx, inputs: Vec<(Id, PortRef)>) -> Self {
        Control::Invoke(Invoke {
            comp,
            inputs,
            outputs: vec![],
            ref_cells: vec![],
        })
    }

    /// Attach reference cell bindings to an invoke. Does nothing for other
    /// control statements.
    pub fn with_ref_cells(mut self, refs: Vec<(Id, CellIdx)>) -> Self {
        if let Control::Invoke(inv) = &mut self {
            inv.ref_cells = refs;
        }
        self
    }

    /// Attach output bindings to an invoke. Does nothing for other control
    /// statements.
    pub fn with_outputs(mut self, outputs: Vec<(Id, PortRef)>) -> Self {
        if let Control::Invoke(inv) = &mut self {
            inv.outputs = outputs;
        }
        self
    }

    /// Returns true if this control statement never enables anything.
    pub fn is_empty(&self) -> bool {
        match self {
            Control::Empty(_) => true,
            Control::Seq(Seq { stmts }) | Control::Par(Par { stmts }) => {
                stmts.iter().all(Control::is_empty)
            }
            _ => false,
        }
    }

    /// Calls `f` on every control node of the tree, parents first.
    pub fn for_each<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Control),
    {
        f(self);
        match self {
            Control::Seq(Seq { stmts }) | Control::Par(Par { stmts }) => {
                for stmt in stmts {
                    stmt.for_each(f);
                }
            }
            Control::If(If {
                tbranch, fbranch, ..
            }) => {
                tbranch.for_each(f);
                fbranch.for_each(f);
            }
            Control::While(While { body, .. }) => body.for_each(f),
            Control::Invoke(_) | Control::Enable(_) | Control::Empty(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness() {
        let e = Control::seq(vec![Control::empty(), Control::par(vec![])]);
        assert!(e.is_empty());
        let g = Control::seq(vec![
            Control::empty(),
            Control::enable(GroupIdx::from(0_u32)),
        ]);
        assert!(!g.is_empty());
        let mut count = 0;
        g.for_each(&mut |_| count += 1);
        assert_eq!(count, 3);
    }
}
