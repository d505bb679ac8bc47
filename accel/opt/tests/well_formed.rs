use accel_ir::{
    Builder, CellIdx, Component, Context, Control, Guard, LibrarySignatures,
    PortComp, PortDef, PortRef,
};
use accel_opt::passes::WellFormed;
use accel_utils::AccelResult;

/// A `main` component with an 8-bit register `r` and a group `write` that
/// stores `value` into it.
fn base() -> (Component, CellIdx, accel_ir::GroupIdx) {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![PortDef::input("value", 8)]);
    let mut b = Builder::new(&mut comp, &lib);
    let r = b.add_primitive("r", "std_reg", &[8]).unwrap();
    let one = b.constant(1, 1).unwrap();
    let g = b.add_group("write");
    b.group_assign(g, PortRef::cell(r, "in"), PortRef::this("value"), Guard::True)
        .unwrap();
    b.group_assign(g, PortRef::cell(r, "write_en"), one, Guard::True)
        .unwrap();
    b.group_done(g, PortRef::cell(r, "done"), Guard::True).unwrap();
    b.set_control(Control::enable(g));
    (comp, r, g)
}

fn validate(comps: Vec<Component>) -> AccelResult<()> {
    let mut ctx = Context::new("main");
    for comp in comps {
        ctx.add_component(comp)?;
    }
    WellFormed::validate(&ctx)
}

fn kind(res: AccelResult<()>) -> &'static str {
    res.unwrap_err().kind()
}

#[test]
fn accepts_simple_design() {
    let (comp, _, _) = base();
    validate(vec![comp]).unwrap();
}

#[test]
fn rejects_missing_entrypoint() {
    let (mut comp, _, _) = base();
    comp.name = "other".into();
    assert_eq!(kind(validate(vec![comp])), "undefined");
}

#[test]
fn rejects_two_unguarded_drivers() {
    let lib = LibrarySignatures::default();
    let (mut comp, r, g) = base();
    let mut b = Builder::new(&mut comp, &lib);
    let zero = b.constant(0, 8).unwrap();
    b.group_assign(g, PortRef::cell(r, "in"), zero, Guard::True)
        .unwrap();
    assert_eq!(kind(validate(vec![comp])), "conflicting-drivers");
}

#[test]
fn accepts_exclusive_lookup_table() {
    let lib = LibrarySignatures::default();
    let (mut comp, _, _) = base();
    let mut b = Builder::new(&mut comp, &lib);
    let sel = b.add_primitive("sel", "std_reg", &[2]).unwrap();
    let lut = b.add_primitive("lut", "std_wire", &[8]).unwrap();
    for (key, val) in [(0, 10), (1, 20), (2, 30), (3, 40)] {
        let key = b.constant(key, 2).unwrap();
        let val = b.constant(val, 8).unwrap();
        b.continuous_assign(
            PortRef::cell(lut, "in"),
            val,
            Guard::comp(PortComp::Eq, PortRef::cell(sel, "out"), key),
        )
        .unwrap();
    }
    validate(vec![comp]).unwrap();
}

#[test]
fn rejects_overlapping_lookup_table() {
    let lib = LibrarySignatures::default();
    let (mut comp, _, _) = base();
    let mut b = Builder::new(&mut comp, &lib);
    let sel = b.add_primitive("sel", "std_reg", &[2]).unwrap();
    let lut = b.add_primitive("lut", "std_wire", &[8]).unwrap();
    let two = b.constant(2, 2).unwrap();
    let a = b.constant(10, 8).unwrap();
    let c = b.constant(20, 8).unwrap();
    let sel_out = PortRef::cell(sel, "out");
    b.continuous_assign(
        PortRef::cell(lut, "in"),
        a,
        Guard::comp(PortComp::Lt, sel_out, two),
    )
    .unwrap();
    b.continuous_assign(
        PortRef::cell(lut, "in"),
        c,
        Guard::comp(PortComp::Leq, sel_out, two),
    )
    .unwrap();
    assert_eq!(kind(validate(vec![comp])), "conflicting-drivers");
}

#[test]
fn rejects_par_writers_of_same_port() {
    let lib = LibrarySignatures::default();
    let (mut comp, r, g) = base();
    let mut b = Builder::new(&mut comp, &lib);
    let zero = b.constant(0, 8).unwrap();
    let one = b.constant(1, 1).unwrap();
    let clear = b.add_group("clear");
    b.group_assign(clear, PortRef::cell(r, "in"), zero, Guard::True)
        .unwrap();
    b.group_assign(clear, PortRef::cell(r, "write_en"), one, Guard::True)
        .unwrap();
    b.group_done(clear, PortRef::cell(r, "done"), Guard::True)
        .unwrap();
    b.set_control(Control::par(vec![Control::enable(g), Control::enable(clear)]));
    assert_eq!(kind(validate(vec![comp.clone()])), "conflicting-drivers");

    // The same groups in sequence are fine.
    comp.control = Control::seq(vec![Control::enable(g), Control::enable(clear)]);
    validate(vec![comp]).unwrap();
}

#[test]
fn rejects_group_without_done() {
    let lib = LibrarySignatures::default();
    let (mut comp, r, _) = base();
    let mut b = Builder::new(&mut comp, &lib);
    let g = b.add_group("nodone");
    b.group_assign(g, PortRef::cell(r, "in"), PortRef::this("value"), Guard::True)
        .unwrap();
    assert_eq!(kind(validate(vec![comp])), "malformed-structure");
}

#[test]
fn rejects_combinational_cycle() {
    let lib = LibrarySignatures::default();
    let (mut comp, _, _) = base();
    let mut b = Builder::new(&mut comp, &lib);
    let add = b.add_primitive("add", "std_add", &[8]).unwrap();
    b.continuous_assign(PortRef::cell(add, "left"), PortRef::this("value"), Guard::True)
        .unwrap();
    b.continuous_assign(PortRef::cell(add, "right"), PortRef::cell(add, "out"), Guard::True)
        .unwrap();
    assert_eq!(kind(validate(vec![comp])), "combinational-cycle");
}

#[test]
fn rejects_wide_condition() {
    let (mut comp, r, g) = base();
    comp.control = Control::while_(PortRef::cell(r, "out"), None, Control::enable(g));
    assert_eq!(kind(validate(vec![comp])), "width-mismatch");
}

#[test]
fn rejects_external_outside_entrypoint() {
    let lib = LibrarySignatures::default();
    let (main, _, _) = base();
    let mut child = Component::new("child", vec![]);
    let mut b = Builder::new(&mut child, &lib);
    let mem = b.add_primitive("mem", "seq_mem_d1", &[8, 4, 2]).unwrap();
    b.external(mem);
    assert_eq!(kind(validate(vec![main, child])), "malformed-structure");
}

/// A callee with two exclusive 1-bit mode inputs and a by-reference memory.
fn callee() -> Component {
    let lib = LibrarySignatures::default();
    let mut child = Component::new(
        "child",
        vec![
            PortDef::input("set", 1),
            PortDef::input("clear", 1),
            PortDef::input("data", 8),
        ],
    );
    child.add_exclusive_inputs(vec!["set", "clear"]);
    let mut b = Builder::new(&mut child, &lib);
    let mem = b.add_primitive("mem", "seq_mem_d1", &[8, 4, 2]).unwrap();
    b.reference(mem);
    child
}

/// `main` with an instance of `child` and a memory to lend to it.
fn caller(bind: impl FnOnce(&mut Builder, CellIdx, CellIdx) -> Control) -> Component {
    let lib = LibrarySignatures::default();
    let child = callee();
    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &lib);
    let inst = b.add_component("c", "child", child.signature());
    let mem = b.add_primitive("m", "seq_mem_d1", &[8, 4, 2]).unwrap();
    let control = bind(&mut b, inst, mem);
    b.set_control(control);
    main
}

#[test]
fn accepts_single_mode_invoke() {
    let main = caller(|b, inst, mem| {
        let one = b.constant(1, 1).unwrap();
        let zero = b.constant(0, 1).unwrap();
        let data = b.constant(5, 8).unwrap();
        Control::invoke(
            inst,
            vec![("set".into(), one), ("clear".into(), zero), ("data".into(), data)],
        )
        .with_ref_cells(vec![("mem".into(), mem)])
    });
    validate(vec![main, callee()]).unwrap();
}

#[test]
fn rejects_multi_mode_invoke() {
    let main = caller(|b, inst, mem| {
        let one = b.constant(1, 1).unwrap();
        Control::invoke(inst, vec![("set".into(), one), ("clear".into(), one)])
            .with_ref_cells(vec![("mem".into(), mem)])
    });
    assert_eq!(kind(validate(vec![main, callee()])), "malformed-control");
}

#[test]
fn rejects_unbound_ref_cell() {
    let main = caller(|_, inst, _| Control::invoke(inst, vec![]));
    assert_eq!(kind(validate(vec![main, callee()])), "malformed-control");
}

#[test]
fn rejects_bad_invoke_bindings() {
    let main = caller(|b, inst, mem| {
        let v = b.constant(5, 4).unwrap();
        Control::invoke(inst, vec![("data".into(), v)])
            .with_ref_cells(vec![("mem".into(), mem)])
    });
    assert_eq!(kind(validate(vec![main, callee()])), "width-mismatch");

    let main = caller(|b, inst, mem| {
        let v = b.constant(5, 8).unwrap();
        Control::invoke(inst, vec![("bogus".into(), v)])
            .with_ref_cells(vec![("mem".into(), mem)])
    });
    assert_eq!(kind(validate(vec![main, callee()])), "undefined");
}

#[test]
fn rejects_lending_wrong_cell_type() {
    let lib = LibrarySignatures::default();
    let child = callee();
    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &lib);
    let inst = b.add_component("c", "child", child.signature());
    let small = b.add_primitive("m", "seq_mem_d1", &[8, 2, 1]).unwrap();
    b.set_control(
        Control::invoke(inst, vec![]).with_ref_cells(vec![("mem".into(), small)]),
    );
    assert_eq!(kind(validate(vec![main, child])), "malformed-control");
}

/// A component `name` with an 8-bit input `x` and output `y`. With
/// `registered` set, `y` is the output of a register loaded from `x`;
/// otherwise `y` is `x` plus one.
fn passthrough(name: &str, registered: bool) -> Component {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new(
        name,
        vec![PortDef::input("x", 8), PortDef::output("y", 8)],
    );
    let mut b = Builder::new(&mut comp, &lib);
    if registered {
        let r = b.add_primitive("r", "std_reg", &[8]).unwrap();
        let one = b.constant(1, 1).unwrap();
        let load = b.add_group("load");
        b.group_assign(load, PortRef::cell(r, "in"), PortRef::this("x"), Guard::True)
            .unwrap();
        b.group_assign(load, PortRef::cell(r, "write_en"), one, Guard::True)
            .unwrap();
        b.group_done(load, PortRef::cell(r, "done"), Guard::True)
            .unwrap();
        b.continuous_assign(PortRef::this("y"), PortRef::cell(r, "out"), Guard::True)
            .unwrap();
        b.set_control(Control::enable(load));
    } else {
        let add = b.add_primitive("add", "std_add", &[8]).unwrap();
        let one = b.constant(1, 8).unwrap();
        b.continuous_assign(PortRef::cell(add, "left"), PortRef::this("x"), Guard::True)
            .unwrap();
        b.continuous_assign(PortRef::cell(add, "right"), one, Guard::True)
            .unwrap();
        b.continuous_assign(PortRef::this("y"), PortRef::cell(add, "out"), Guard::True)
            .unwrap();
    }
    comp
}

/// `main` feeding the output of an instance of `callee` back into its input
/// through a wire.
fn feedback(callee: &Component) -> Component {
    let lib = LibrarySignatures::default();
    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &lib);
    let p = b.add_component("p", callee.name, callee.signature());
    let w = b.add_primitive("w", "std_wire", &[8]).unwrap();
    b.continuous_assign(PortRef::cell(w, "in"), PortRef::cell(p, "y"), Guard::True)
        .unwrap();
    b.continuous_assign(PortRef::cell(p, "x"), PortRef::cell(w, "out"), Guard::True)
        .unwrap();
    main
}

#[test]
fn rejects_cycle_through_instance() {
    let callee = passthrough("pass", false);
    let main = feedback(&callee);
    assert_eq!(kind(validate(vec![main, callee])), "combinational-cycle");

    // A register inside the callee breaks the loop.
    let callee = passthrough("pass", true);
    let main = feedback(&callee);
    validate(vec![main, callee]).unwrap();
}

#[test]
fn rejects_cycle_through_nested_instances() {
    let lib = LibrarySignatures::default();
    let inner = passthrough("pass", false);
    let mut wrapper = Component::new(
        "wrapper",
        vec![PortDef::input("x", 8), PortDef::output("y", 8)],
    );
    let mut b = Builder::new(&mut wrapper, &lib);
    let i = b.add_component("inner", inner.name, inner.signature());
    b.continuous_assign(PortRef::cell(i, "x"), PortRef::this("x"), Guard::True)
        .unwrap();
    b.continuous_assign(PortRef::this("y"), PortRef::cell(i, "y"), Guard::True)
        .unwrap();
    let main = feedback(&wrapper);
    assert_eq!(
        kind(validate(vec![main, wrapper, inner])),
        "combinational-cycle"
    );
}

#[test]
fn rejects_cycle_through_invoke_bindings() {
    let lib = LibrarySignatures::default();
    let callee = passthrough("pass", false);
    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &lib);
    let p = b.add_component("p", callee.name, callee.signature());
    let w = b.add_primitive("w", "std_wire", &[8]).unwrap();
    b.set_control(
        Control::invoke(p, vec![("x".into(), PortRef::cell(w, "out"))])
            .with_outputs(vec![("y".into(), PortRef::cell(w, "in"))]),
    );
    assert_eq!(kind(validate(vec![main, callee])), "combinational-cycle");
}

#[test]
fn rejects_cycle_between_par_group_and_condition() {
    let lib = LibrarySignatures::default();
    let (mut comp, _, write) = base();
    let mut b = Builder::new(&mut comp, &lib);
    let add = b.add_primitive("add", "std_add", &[8]).unwrap();
    let w = b.add_primitive("w", "std_wire", &[8]).unwrap();
    let lt = b.add_primitive("lt", "std_lt", &[8]).unwrap();
    let acc = b.add_primitive("acc", "std_reg", &[8]).unwrap();
    let one = b.constant(1, 1).unwrap();

    let sum = b.add_group("sum");
    b.group_assign(sum, PortRef::cell(add, "left"), PortRef::cell(w, "out"), Guard::True)
        .unwrap();
    b.group_assign(sum, PortRef::cell(add, "right"), PortRef::this("value"), Guard::True)
        .unwrap();
    b.group_assign(sum, PortRef::cell(acc, "in"), PortRef::cell(add, "out"), Guard::True)
        .unwrap();
    b.group_assign(sum, PortRef::cell(acc, "write_en"), one, Guard::True)
        .unwrap();
    b.group_done(sum, PortRef::cell(acc, "done"), Guard::True)
        .unwrap();

    let cond = b.add_comb_group("cond");
    b.comb_assign(cond, PortRef::cell(w, "in"), PortRef::cell(add, "out"), Guard::True)
        .unwrap();
    b.comb_assign(cond, PortRef::cell(lt, "left"), PortRef::cell(w, "out"), Guard::True)
        .unwrap();
    b.comb_assign(cond, PortRef::cell(lt, "right"), PortRef::this("value"), Guard::True)
        .unwrap();

    let stmts = || {
        vec![
            Control::enable(sum),
            Control::while_(PortRef::cell(lt, "out"), Some(cond), Control::enable(write)),
        ]
    };
    comp.control = Control::par(stmts());
    assert_eq!(kind(validate(vec![comp.clone()])), "combinational-cycle");

    // Never active together in sequence.
    comp.control = Control::seq(stmts());
    validate(vec![comp]).unwrap();
}
