//! Implements a formatter for the in-memory representation of Components.
//! The printing operation doesn't perform any mutation to the Component.
use crate::{self as ir, GetName};
use itertools::Itertools;
use std::io;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    /// Formats port definitions in signatures
    fn format_ports<'a, I>(ports: I) -> String
    where
        I: Iterator<Item = &'a ir::PortDef>,
    {
        ports
            .map(|p| format!("{}: {}", p.name, p.width))
            .collect_vec()
            .join(", ")
    }

    /// Prints out the program context.
    pub fn write_context<F: io::Write>(
        ctx: &ir::Context,
        f: &mut F,
    ) -> io::Result<()> {
        for comp in ctx.components.values() {
            Self::write_component(comp, f)?;
            writeln!(f)?
        }
        Ok(())
    }

    /// Formats and writes the Component to the formatter.
    pub fn write_component<F: io::Write>(
        comp: &ir::Component,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(
            f,
            "component {}({}) -> ({}) {{",
            comp.name,
            Self::format_ports(comp.inputs()),
            Self::format_ports(comp.outputs()),
        )?;
        for set in &comp.exclusive_inputs {
            writeln!(f, "  // exclusive: {}", set.iter().join(", "))?;
        }

        // Add the cells
        writeln!(f, "  cells {{")?;
        for cell in comp.cells.values() {
            Self::write_cell(cell, 4, f)?;
        }
        writeln!(f, "  }}")?;

        // Add the wires
        writeln!(f, "  wires {{")?;
        for (idx, group) in comp.groups.iter() {
            Self::write_group(comp, idx, group, 4, f)?;
            writeln!(f)?;
        }
        for comb_group in comp.comb_groups.values() {
            Self::write_comb_group(comp, comb_group, 4, f)?;
            writeln!(f)?;
        }
        // Write the continuous assignments
        for assign in &comp.continuous_assignments {
            Self::write_assignment(comp, assign, 4, f)?;
            writeln!(f)?;
        }
        writeln!(f, "  }}")?;

        // Add the control program.
        if comp.control.is_empty() {
            writeln!(f, "\n  control {{}}")?;
        } else {
            writeln!(f, "\n  control {{")?;
            Self::write_control(comp, &comp.control, 4, f)?;
            writeln!(f, "  }}")?;
        }

        write!(f, "}}")
    }

    /// Format and write a cell.
    pub fn write_cell<F: io::Write>(
        cell: &ir::Cell,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        let attrs = match (cell.is_external(), cell.is_reference()) {
            (true, _) => "@external ",
            (false, true) => "ref ",
            (false, false) => "",
        };
        match &cell.prototype {
            ir::CellType::Primitive {
                name,
                param_binding,
                ..
            } => {
                writeln!(
                    f,
                    "{}{attrs}{} = {}({});",
                    " ".repeat(indent_level),
                    cell.name(),
                    name,
                    param_binding.iter().map(|(_, v)| v).join(", ")
                )
            }
            ir::CellType::Component { name } => writeln!(
                f,
                "{}{attrs}{} = {}();",
                " ".repeat(indent_level),
                cell.name(),
                name
            ),
            ir::CellType::Constant { .. } => Ok(()),
        }
    }

    /// Format and write an assignment.
    pub fn write_assignment<F: io::Write>(
        comp: &ir::Component,
        assign: &ir::Assignment,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        write!(f, "{}", " ".repeat(indent_level))?;
        write!(f, "{} = ", comp.port_name(&assign.dst))?;
        if !assign.guard.is_true() {
            write!(f, "{} ? ", Self::guard_str(comp, &assign.guard))?;
        }
        write!(f, "{};", comp.port_name(&assign.src))
    }

    /// Convinience method to get string representation of [ir::Assignment].
    pub fn assignment_to_str(
        comp: &ir::Component,
        assign: &ir::Assignment,
    ) -> String {
        let mut buf = Vec::new();
        Self::write_assignment(comp, assign, 0, &mut buf).ok();
        String::from_utf8_lossy(buf.as_slice()).to_string()
    }

    /// Convinience method to get string representation of [ir::Control].
    pub fn control_to_str(comp: &ir::Component, control: &ir::Control) -> String {
        let mut buf = Vec::new();
        Self::write_control(comp, control, 0, &mut buf).ok();
        String::from_utf8_lossy(buf.as_slice()).to_string()
    }

    /// Format and write a combinational group.
    pub fn write_comb_group<F: io::Write>(
        comp: &ir::Component,
        group: &ir::CombGroup,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(
            f,
            "{}comb group {} {{",
            " ".repeat(indent_level),
            group.name()
        )?;
        for assign in &group.assignments {
            Self::write_assignment(comp, assign, indent_level + 2, f)?;
            writeln!(f)?;
        }
        write!(f, "{}}}", " ".repeat(indent_level))
    }

    /// Format and write a group.
    pub fn write_group<F: io::Write>(
        comp: &ir::Component,
        _idx: ir::GroupIdx,
        group: &ir::Group,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "{}group {} {{", " ".repeat(indent_level), group.name())?;
        for assign in &group.assignments {
            Self::write_assignment(comp, assign, indent_level + 2, f)?;
            writeln!(f)?;
        }
        write!(f, "{}}}", " ".repeat(indent_level))
    }

    /// Format and write a control program
    pub fn write_control<F: io::Write>(
        comp: &ir::Component,
        control: &ir::Control,
        indent_level: usize,
        f: &mut F,
    ) -> io::Result<()> {
        write!(f, "{}", " ".repeat(indent_level))?;
        match control {
            ir::Control::Enable(ir::Enable { group }) => {
                writeln!(f, "{};", comp.groups[*group].name())
            }
            ir::Control::Invoke(ir::Invoke {
                comp: cell,
                inputs,
                outputs,
                ref_cells,
            }) => {
                write!(f, "invoke {}", comp.cells[*cell].name())?;
                if !ref_cells.is_empty() {
                    write!(
                        f,
                        "[{}]",
                        ref_cells
                            .iter()
                            .map(|(inner, outer)| format!(
                                "{inner} = {}",
                                comp.cells[*outer].name()
                            ))
                            .join(", ")
                    )?;
                }
                let bindings = |binds: &[(ir::Id, ir::PortRef)]| {
                    binds
                        .iter()
                        .map(|(arg, port)| {
                            format!("{arg} = {}", comp.port_name(port))
                        })
                        .join(", ")
                };
                writeln!(f, "({})({});", bindings(inputs), bindings(outputs))
            }
            ir::Control::Seq(ir::Seq { stmts }) => {
                writeln!(f, "seq {{")?;
                for stmt in stmts {
                    Self::write_control(comp, stmt, indent_level + 2, f)?;
                }
                writeln!(f, "{}}}", " ".repeat(indent_level))
            }
            ir::Control::Par(ir::Par { stmts }) => {
                writeln!(f, "par {{")?;
                for stmt in stmts {
                    Self::write_control(comp, stmt, indent_level + 2, f)?;
                }
                writeln!(f, "{}}}", " ".repeat(indent_level))
            }
            ir::Control::If(ir::If {
                port,
                cond,
                tbranch,
                fbranch,
            }) => {
                write!(f, "if {} ", comp.port_name(port))?;
                if let Some(c) = cond {
                    write!(f, "with {} ", comp.comb_groups[*c].name())?;
                }
                writeln!(f, "{{")?;
                Self::write_control(comp, tbranch, indent_level + 2, f)?;
                write!(f, "{}}}", " ".repeat(indent_level))?;
                if fbranch.is_empty() {
                    writeln!(f)
                } else {
                    writeln!(f, " else {{")?;
                    Self::write_control(comp, fbranch, indent_level + 2, f)?;
                    writeln!(f, "{}}}", " ".repeat(indent_level))
                }
            }
            ir::Control::While(ir::While { port, cond, body }) => {
                write!(f, "while {} ", comp.port_name(port))?;
                if let Some(c) = cond {
                    write!(f, "with {} ", comp.comb_groups[*c].name())?;
                }
                writeln!(f, "{{")?;
                Self::write_control(comp, body, indent_level + 2, f)?;
                writeln!(f, "{}}}", " ".repeat(indent_level))
            }
            ir::Control::Empty(_) => writeln!(f),
        }
    }

    /// Generate a String-based representation for a guard.
    pub fn guard_str(comp: &ir::Component, guard: &ir::Guard) -> String {
        let wrap = |inner: &ir::Guard, parent: &ir::Guard| {
            if inner.precedence() < parent.precedence() {
                format!("({})", Self::guard_str(comp, inner))
            } else {
                Self::guard_str(comp, inner)
            }
        };
        match guard {
            ir::Guard::And(l, r) => {
                format!("{} & {}", wrap(l, guard), wrap(r, guard))
            }
            ir::Guard::Or(l, r) => {
                format!("{} | {}", wrap(l, guard), wrap(r, guard))
            }
            ir::Guard::CompOp(op, l, r) => format!(
                "{} {} {}",
                comp.port_name(l),
                op.op_str(),
                comp.port_name(r)
            ),
            ir::Guard::Not(g) => format!("!{}", wrap(g, guard)),
            ir::Guard::Port(p) => comp.port_name(p),
            ir::Guard::True => "1'b1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Builder, Component, Control, Guard, LibrarySignatures, PortComp, PortDef, PortRef, Printer};

    #[test]
    fn prints_groups_and_control() {
        let lib = LibrarySignatures::default();
        let mut comp = Component::new("main", vec![PortDef::input("x", 4)]);
        let mut b = Builder::new(&mut comp, &lib);
        let r = b.add_primitive("r", "std_reg", &[4]).unwrap();
        let one = b.constant(1, 1).unwrap();
        let three = b.constant(3, 4).unwrap();
        let g = b.add_group("store");
        b.group_assign(g, PortRef::cell(r, "in"), PortRef::this("x"), Guard::True)
            .unwrap();
        b.group_assign(
            g,
            PortRef::cell(r, "write_en"),
            one,
            !Guard::comp(PortComp::Eq, PortRef::this("x"), three)
                & Guard::port(PortRef::this("go")),
        )
        .unwrap();
        b.group_done(g, PortRef::cell(r, "done"), Guard::True).unwrap();
        b.set_control(Control::seq(vec![Control::enable(g)]));

        let mut buf = Vec::new();
        Printer::write_component(&comp, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("component main(x: 4) -> () {"));
        assert!(text.contains("r = std_reg(4);"));
        assert!(text.contains("r.write_en = x != 4'd3 & go ? 1'd1;"));
        assert!(text.contains("store[done] = r.done;"));
        assert!(text.contains("seq {\n      store;\n    }"));
    }
}
