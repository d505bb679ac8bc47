//! Execution state of control programs.
//!
//! A running control program is a tree of [ExecNode]s mirroring the active
//! part of the [ir::Control] tree. Each cycle the leaves of the tree decide
//! which groups, condition groups and invokes are active; after the clock
//! edge the tree advances using the values sampled during the cycle.
use super::{
    simulator::Simulator,
    structures::{CellSlot, InstanceIdx, PortMap},
};
use crate::errors::SimResult;
use accel_ir::{self as ir, CombGroupIdx, Control, GetName, GroupIdx, PortRef};
use accel_utils::Error;
use ahash::AHashSet;

#[derive(Debug)]
pub(super) enum ExecNode<'a> {
    Enable {
        inst: InstanceIdx,
        group: GroupIdx,
    },
    Seq {
        inst: InstanceIdx,
        stmts: &'a [Control],
        idx: usize,
        child: Box<ExecNode<'a>>,
    },
    /// Finished children are `None`.
    Par {
        children: Vec<Option<ExecNode<'a>>>,
    },
    /// `branch` is `None` during the cycle the condition is sampled.
    If {
        inst: InstanceIdx,
        ctrl: &'a ir::If,
        branch: Option<Box<ExecNode<'a>>>,
    },
    /// `body` is `None` during the cycles the condition is sampled.
    While {
        inst: InstanceIdx,
        ctrl: &'a ir::While,
        body: Option<Box<ExecNode<'a>>>,
    },
    /// `body` is the control program of the invoked instance, `None` when it
    /// has nothing to run.
    Invoke {
        inst: InstanceIdx,
        ctrl: &'a ir::Invoke,
        callee: InstanceIdx,
        body: Option<Box<ExecNode<'a>>>,
    },
}

/// What the control program activates in one cycle.
#[derive(Debug, Default)]
pub(super) struct Leaves<'a> {
    pub groups: Vec<(InstanceIdx, GroupIdx)>,
    pub conds: Vec<(InstanceIdx, Option<CombGroupIdx>)>,
    /// `(parent, invoke, callee)`
    pub invokes: Vec<(InstanceIdx, &'a ir::Invoke, InstanceIdx)>,
}

/// Groups and invokes that observed their completion this cycle.
#[derive(Debug, Default)]
pub(super) struct Finishing {
    pub groups: AHashSet<(InstanceIdx, GroupIdx)>,
    /// Callee instances of finishing invokes.
    pub invokes: AHashSet<InstanceIdx>,
    /// The whole program finishes.
    pub top: bool,
}

impl Finishing {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.invokes.is_empty() && !self.top
    }
}

impl<'a> Simulator<'a> {
    /// Build the execution state for `control` running in `inst`. Returns
    /// `None` for control that never enables anything.
    pub(super) fn start(
        &mut self,
        inst: InstanceIdx,
        control: &'a Control,
    ) -> SimResult<Option<ExecNode<'a>>> {
        Ok(Some(match control {
            Control::Empty(_) => return Ok(None),
            // sequences and pars of empty statements
            _ if control.is_empty() => return Ok(None),
            Control::Enable(ir::Enable { group }) => {
                log::trace!(
                    "{}: enable {}",
                    self.instances[inst].comp.name(),
                    self.instances[inst].comp.groups[*group].name()
                );
                ExecNode::Enable {
                    inst,
                    group: *group,
                }
            }
            Control::Seq(ir::Seq { stmts }) => {
                return self.start_seq(inst, stmts, 0);
            }
            Control::Par(ir::Par { stmts }) => {
                let mut children = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    if let Some(child) = self.start(inst, stmt)? {
                        children.push(Some(child));
                    }
                }
                ExecNode::Par { children }
            }
            Control::If(ctrl) => ExecNode::If {
                inst,
                ctrl,
                branch: None,
            },
            Control::While(ctrl) => ExecNode::While {
                inst,
                ctrl,
                body: None,
            },
            Control::Invoke(ctrl) => self.start_invoke(inst, ctrl)?,
        }))
    }

    /// Start the first statement at or after `from` that does something.
    fn start_seq(
        &mut self,
        inst: InstanceIdx,
        stmts: &'a [Control],
        from: usize,
    ) -> SimResult<Option<ExecNode<'a>>> {
        for (idx, stmt) in stmts.iter().enumerate().skip(from) {
            if let Some(child) = self.start(inst, stmt)? {
                return Ok(Some(ExecNode::Seq {
                    inst,
                    stmts,
                    idx,
                    child: Box::new(child),
                }));
            }
        }
        Ok(None)
    }

    /// Bind the by-reference cells of the callee and start its control
    /// program.
    fn start_invoke(
        &mut self,
        inst: InstanceIdx,
        ctrl: &'a ir::Invoke,
    ) -> SimResult<ExecNode<'a>> {
        let parent = &self.instances[inst];
        let Some(CellSlot::Child(callee)) = parent.slot(ctrl.comp).cloned() else {
            return Err(Error::malformed_control(format!(
                "`{}' invokes a cell that is not a component instance",
                parent.comp.name()
            ))
            .into());
        };
        let comp = self.instances[callee].comp;
        for (inner, outer) in &ctrl.ref_cells {
            let cell = comp
                .find_cell(*inner)
                .ok_or_else(|| Error::undefined(*inner, "reference cell"))?;
            self.ref_bindings.insert((callee, cell), (inst, *outer));
        }
        log::debug!("invoke {}", self.instances[callee].path);
        let body = self.start(callee, &comp.control)?.map(Box::new);
        Ok(ExecNode::Invoke {
            inst,
            ctrl,
            callee,
            body,
        })
    }

    fn release(&mut self, callee: InstanceIdx, ctrl: &ir::Invoke) {
        let comp = self.instances[callee].comp;
        for (inner, _) in &ctrl.ref_cells {
            if let Some(cell) = comp.find_cell(*inner) {
                self.ref_bindings.remove(&(callee, cell));
            }
        }
    }

    fn cond(&self, inst: InstanceIdx, port: &PortRef, values: &PortMap) -> bool {
        self.resolve(inst, port)
            .is_some_and(|idx| values.read_bool(idx))
    }

    fn group_done(&self, inst: InstanceIdx, group: GroupIdx, values: &PortMap) -> bool {
        self.instances[inst]
            .hole(group, ir::DONE.into())
            .is_some_and(|idx| values.read_bool(idx))
    }

    /// Gather what `node` activates in the current cycle.
    pub(super) fn collect(&self, node: &ExecNode<'a>, leaves: &mut Leaves<'a>) {
        match node {
            ExecNode::Enable { inst, group } => leaves.groups.push((*inst, *group)),
            ExecNode::Seq { child, .. } => self.collect(child, leaves),
            ExecNode::Par { children } => {
                for child in children.iter().flatten() {
                    self.collect(child, leaves);
                }
            }
            ExecNode::If {
                inst,
                ctrl,
                branch: None,
            } => leaves.conds.push((*inst, ctrl.cond)),
            ExecNode::While {
                inst,
                ctrl,
                body: None,
            } => leaves.conds.push((*inst, ctrl.cond)),
            ExecNode::If {
                branch: Some(body), ..
            }
            | ExecNode::While {
                body: Some(body), ..
            } => self.collect(body, leaves),
            ExecNode::Invoke {
                inst,
                ctrl,
                callee,
                body,
            } => {
                leaves.invokes.push((*inst, *ctrl, *callee));
                if let Some(body) = body {
                    self.collect(body, leaves);
                }
            }
        }
    }

    /// Does `node` complete in the cycle whose settled values are `values`?
    pub(super) fn finishes(&self, node: &ExecNode<'a>, values: &PortMap) -> bool {
        match node {
            ExecNode::Enable { inst, group } => self.group_done(*inst, *group, values),
            ExecNode::Seq {
                stmts, idx, child, ..
            } => {
                self.finishes(child, values)
                    && stmts[idx + 1..].iter().all(Control::is_empty)
            }
            ExecNode::Par { children } => children
                .iter()
                .flatten()
                .all(|child| self.finishes(child, values)),
            ExecNode::If {
                inst,
                ctrl,
                branch: None,
            } => {
                if self.cond(*inst, &ctrl.port, values) {
                    ctrl.tbranch.is_empty()
                } else {
                    ctrl.fbranch.is_empty()
                }
            }
            ExecNode::If {
                branch: Some(branch),
                ..
            } => self.finishes(branch, values),
            ExecNode::While {
                inst,
                ctrl,
                body: None,
            } => !self.cond(*inst, &ctrl.port, values),
            ExecNode::While { body: Some(_), .. } => false,
            ExecNode::Invoke { body, .. } => body
                .as_ref()
                .is_none_or(|body| self.finishes(body, values)),
        }
    }

    /// Gather the groups and invokes that complete this cycle.
    pub(super) fn collect_finishing(
        &self,
        node: &ExecNode<'a>,
        values: &PortMap,
        out: &mut Finishing,
    ) {
        match node {
            ExecNode::Enable { inst, group } => {
                if self.group_done(*inst, *group, values) {
                    out.groups.insert((*inst, *group));
                }
            }
            ExecNode::Seq { child, .. } => self.collect_finishing(child, values, out),
            ExecNode::Par { children } => {
                for child in children.iter().flatten() {
                    self.collect_finishing(child, values, out);
                }
            }
            ExecNode::If { branch: None, .. } | ExecNode::While { body: None, .. } => {}
            ExecNode::If {
                branch: Some(body), ..
            }
            | ExecNode::While {
                body: Some(body), ..
            } => self.collect_finishing(body, values, out),
            ExecNode::Invoke { callee, body, .. } => {
                if let Some(body) = body {
                    self.collect_finishing(body, values, out);
                }
                if self.finishes(node, values) {
                    out.invokes.insert(*callee);
                }
            }
        }
    }

    /// Move `node` past the cycle whose settled values are `values`. Returns
    /// `None` once the node has completed.
    pub(super) fn advance(
        &mut self,
        node: ExecNode<'a>,
        values: &PortMap,
    ) -> SimResult<Option<ExecNode<'a>>> {
        Ok(match node {
            ExecNode::Enable { inst, group } => {
                (!self.group_done(inst, group, values))
                    .then_some(ExecNode::Enable { inst, group })
            }
            ExecNode::Seq {
                inst,
                stmts,
                idx,
                child,
            } => match self.advance(*child, values)? {
                Some(child) => Some(ExecNode::Seq {
                    inst,
                    stmts,
                    idx,
                    child: Box::new(child),
                }),
                None => self.start_seq(inst, stmts, idx + 1)?,
            },
            ExecNode::Par { children } => {
                let mut next = Vec::with_capacity(children.len());
                for child in children {
                    next.push(match child {
                        Some(child) => self.advance(child, values)?,
                        None => None,
                    });
                }
                if next.iter().all(Option::is_none) {
                    None
                } else {
                    Some(ExecNode::Par { children: next })
                }
            }
            ExecNode::If {
                inst,
                ctrl,
                branch: None,
            } => {
                let taken = if self.cond(inst, &ctrl.port, values) {
                    &ctrl.tbranch
                } else {
                    &ctrl.fbranch
                };
                self.start(inst, taken)?.map(|branch| ExecNode::If {
                    inst,
                    ctrl,
                    branch: Some(Box::new(branch)),
                })
            }
            ExecNode::If {
                inst,
                ctrl,
                branch: Some(branch),
            } => self.advance(*branch, values)?.map(|branch| ExecNode::If {
                inst,
                ctrl,
                branch: Some(Box::new(branch)),
            }),
            ExecNode::While {
                inst,
                ctrl,
                body: None,
            } => {
                if self.cond(inst, &ctrl.port, values) {
                    let body = self.start(inst, &ctrl.body)?.map(Box::new);
                    Some(ExecNode::While { inst, ctrl, body })
                } else {
                    None
                }
            }
            ExecNode::While {
                inst,
                ctrl,
                body: Some(body),
            } => {
                // the condition is sampled again once the body completes
                let body = self.advance(*body, values)?.map(Box::new);
                Some(ExecNode::While { inst, ctrl, body })
            }
            ExecNode::Invoke {
                inst,
                ctrl,
                callee,
                body,
            } => {
                let body = match body {
                    Some(body) => self.advance(*body, values)?,
                    None => None,
                };
                match body {
                    Some(body) => Some(ExecNode::Invoke {
                        inst,
                        ctrl,
                        callee,
                        body: Some(Box::new(body)),
                    }),
                    None => {
                        self.release(callee, ctrl);
                        None
                    }
                }
            }
        })
    }
}
