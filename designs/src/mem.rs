use accel_ir::{
    Builder, CellIdx, GetName, GroupIdx, Guard, PortComp, PortRef,
};
use accel_utils::{AccelResult, Error, bits_needed_for};

/// Add a `seq_mem_d1` cell called exactly `name` with `size` entries of
/// `width` bits. The address port is as narrow as the size allows, but
/// never narrower than one bit.
pub fn build_mem(
    b: &mut Builder,
    name: &str,
    width: u64,
    size: u64,
    external: bool,
    reference: bool,
) -> AccelResult<CellIdx> {
    let cell = b.add_primitive(
        name,
        "seq_mem_d1",
        &[width, size, bits_needed_for(size)],
    )?;
    if b.component.cells[cell].name() != name {
        return Err(Error::already_bound(name.into(), "memory"));
    }
    if external {
        b.external(cell);
    }
    if reference {
        b.reference(cell);
    }
    Ok(cell)
}

/// Implement a look-up table as a wire driven by one assignment per entry,
/// each guarded by `key` being equal to the entry's index. The assignments
/// go into `group`, or become continuous when there is none. Returns the
/// wire; its `out` port carries the looked-up value.
pub fn build_lut(
    b: &mut Builder,
    name: &str,
    table: &[u64],
    width: u64,
    key: PortRef,
    group: Option<GroupIdx>,
) -> AccelResult<CellIdx> {
    let wire = b.add_primitive(format!("{name}_lut"), "std_wire", &[width])?;
    let key_size = bits_needed_for(table.len() as u64);
    for (idx, val) in table.iter().enumerate() {
        let idx = b.constant(idx as u64, key_size)?;
        let val = b.constant(*val, width)?;
        let guard = Guard::comp(PortComp::Eq, key, idx);
        let dst = PortRef::cell(wire, "in");
        match group {
            Some(g) => b.group_assign(g, dst, val, guard)?,
            None => b.continuous_assign(dst, val, guard)?,
        }
    }
    log::debug!("{name}: {} entry look-up table", table.len());
    Ok(wire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_ir::{Component, Context, Control, LibrarySignatures, PortDef};
    use accel_opt::passes::WellFormed;

    #[test]
    fn index_width_follows_size() {
        let lib = LibrarySignatures::default();
        let mut comp = Component::new("main", vec![]);
        let mut b = Builder::new(&mut comp, &lib);
        let one = build_mem(&mut b, "one", 32, 1, true, false).unwrap();
        let many = build_mem(&mut b, "many", 6, 4096, true, false).unwrap();
        let err = build_mem(&mut b, "many", 6, 4096, true, false).unwrap_err();
        assert_eq!(err.kind(), "already-bound");
        assert_eq!(comp.cells[one].find("addr0").unwrap().width, 1);
        assert_eq!(comp.cells[many].find("addr0").unwrap().width, 12);
        assert!(comp.cells[many].is_external());
    }

    #[test]
    fn lut_entries_are_exclusive() {
        let lib = LibrarySignatures::default();
        let mut comp = Component::new("main", vec![PortDef::input("key", 2)]);
        let mut b = Builder::new(&mut comp, &lib);
        let out = b.add_primitive("out", "std_reg", &[8]).unwrap();
        let g = b.add_group("lookup");
        let lut = build_lut(&mut b, "shape", &[1, 2, 3], 8, PortRef::this("key"), Some(g))
            .unwrap();
        let one = b.constant(1, 1).unwrap();
        b.group_assign(g, PortRef::cell(out, "in"), PortRef::cell(lut, "out"), Guard::True)
            .unwrap();
        b.group_assign(g, PortRef::cell(out, "write_en"), one, Guard::True)
            .unwrap();
        b.group_done(g, PortRef::cell(out, "done"), Guard::True).unwrap();
        b.set_control(Control::enable(g));
        assert_eq!(comp.groups[g].assignments.len(), 6);

        let mut ctx = Context::new("main");
        ctx.add_component(comp).unwrap();
        WellFormed::validate(&ctx).unwrap();
    }
}
