use accel_ir::{
    Builder, CellIdx, Component, Context, Control, GroupIdx, Guard,
    LibrarySignatures, PortDef, PortRef,
};
use accel_sim::{MemoryData, SimConfig, SimError, Simulator};
use proptest::prelude::*;

/// Add a group that stores the constant `val` into the 8-bit register `reg`.
fn store(b: &mut Builder, reg: CellIdx, val: u64) -> GroupIdx {
    let val = b.constant(val, 8).unwrap();
    let one = b.constant(1, 1).unwrap();
    let g = b.add_group("store");
    b.group_assign(g, PortRef::cell(reg, "in"), val, Guard::True)
        .unwrap();
    b.group_assign(g, PortRef::cell(reg, "write_en"), one, Guard::True)
        .unwrap();
    b.group_done(g, PortRef::cell(reg, "done"), Guard::True).unwrap();
    g
}

fn context(comp: Component) -> Context {
    let mut ctx = Context::new("main");
    ctx.add_component(comp).unwrap();
    ctx
}

/// Two registers written by `compose` of one store group each.
fn two_stores(compose: fn(Vec<Control>) -> Control) -> Context {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![]);
    let mut b = Builder::new(&mut comp, &lib);
    let a = b.add_primitive("a", "std_reg", &[8]).unwrap();
    let c = b.add_primitive("c", "std_reg", &[8]).unwrap();
    let sa = store(&mut b, a, 5);
    let sc = store(&mut b, c, 7);
    b.set_control(compose(vec![Control::enable(sa), Control::enable(sc)]));
    context(comp)
}

/// Run `ctx` and return the cycle count and the values of `a` and `c`.
fn run_stores(ctx: &Context) -> (u64, (u64, u64)) {
    let mut sim = Simulator::new(ctx, SimConfig::default()).unwrap();
    let cycles = sim.run().unwrap();
    (cycles, (sim.register("a").unwrap(), sim.register("c").unwrap()))
}

#[test]
fn seq_and_par_agree() {
    let (cycles, forward) = run_stores(&two_stores(Control::seq));
    assert_eq!(cycles, 4);
    let (cycles, backward) = run_stores(&two_stores(|stmts| {
        Control::seq(stmts.into_iter().rev().collect())
    }));
    assert_eq!(cycles, 4);
    let (cycles, par) = run_stores(&two_stores(Control::par));
    assert_eq!(cycles, 2);

    assert_eq!(forward, (5, 7));
    assert_eq!(par, forward);
    assert_eq!(par, backward);
}

#[test]
fn false_loop_condition_exits_after_one_cycle() {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![]);
    let mut b = Builder::new(&mut comp, &lib);
    let r = b.add_primitive("r", "std_reg", &[8]).unwrap();
    let flag = b.add_primitive("flag", "std_reg", &[1]).unwrap();
    let body = store(&mut b, r, 3);
    b.set_control(Control::while_(
        PortRef::cell(flag, "out"),
        None,
        Control::enable(body),
    ));
    let ctx = context(comp);
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
    assert_eq!(sim.run().unwrap(), 1);
    assert_eq!(sim.register("r").unwrap(), 0);
}

#[test]
fn empty_control_takes_no_cycles() {
    let ctx = context(Component::new("main", vec![]));
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
    assert_eq!(sim.run().unwrap(), 0);
}

#[test]
fn if_takes_the_sampled_branch() {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![]);
    let mut b = Builder::new(&mut comp, &lib);
    let r = b.add_primitive("r", "std_reg", &[8]).unwrap();
    let lt = b.add_primitive("lt", "std_lt", &[8]).unwrap();
    let small = store(&mut b, r, 1);
    let big = store(&mut b, r, 2);
    let cond = b.add_comb_group("cond");
    let three = b.constant(3, 8).unwrap();
    let four = b.constant(4, 8).unwrap();
    b.comb_assign(cond, PortRef::cell(lt, "left"), four, Guard::True)
        .unwrap();
    b.comb_assign(cond, PortRef::cell(lt, "right"), three, Guard::True)
        .unwrap();
    b.set_control(Control::if_(
        PortRef::cell(lt, "out"),
        Some(cond),
        Control::enable(small),
        Control::enable(big),
    ));
    let ctx = context(comp);
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
    // one cycle for the condition, two for the store
    assert_eq!(sim.run().unwrap(), 3);
    assert_eq!(sim.register("r").unwrap(), 2);
}

/// Sums the four entries of the external memory `data` into `acc`.
fn summer() -> Context {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![]);
    let mut b = Builder::new(&mut comp, &lib);
    let data = b.add_primitive("data", "seq_mem_d1", &[8, 4, 2]).unwrap();
    b.external(data);
    let i = b.add_primitive("i", "std_reg", &[3]).unwrap();
    let acc = b.add_primitive("acc", "std_reg", &[8]).unwrap();
    let lt = b.add_primitive("lt", "std_lt", &[3]).unwrap();
    let add = b.add_primitive("add", "std_add", &[8]).unwrap();
    let incr = b.add_primitive("incr", "std_add", &[3]).unwrap();
    let slice = b.add_primitive("slice", "std_slice", &[3, 2]).unwrap();
    let one = b.constant(1, 1).unwrap();
    let i_one = b.constant(1, 3).unwrap();
    let four = b.constant(4, 3).unwrap();

    let read = b.add_group("read");
    for (dst, src) in [
        (PortRef::cell(slice, "in"), PortRef::cell(i, "out")),
        (PortRef::cell(data, "addr0"), PortRef::cell(slice, "out")),
        (PortRef::cell(data, "read_en"), one),
    ] {
        b.group_assign(read, dst, src, Guard::True).unwrap();
    }
    b.group_done(read, PortRef::cell(data, "read_done"), Guard::True)
        .unwrap();

    let accum = b.add_group("accum");
    for (dst, src) in [
        (PortRef::cell(add, "left"), PortRef::cell(acc, "out")),
        (PortRef::cell(add, "right"), PortRef::cell(data, "out")),
        (PortRef::cell(acc, "in"), PortRef::cell(add, "out")),
        (PortRef::cell(acc, "write_en"), one),
    ] {
        b.group_assign(accum, dst, src, Guard::True).unwrap();
    }
    b.group_done(accum, PortRef::cell(acc, "done"), Guard::True)
        .unwrap();

    let step = b.add_group("step");
    for (dst, src) in [
        (PortRef::cell(incr, "left"), PortRef::cell(i, "out")),
        (PortRef::cell(incr, "right"), i_one),
        (PortRef::cell(i, "in"), PortRef::cell(incr, "out")),
        (PortRef::cell(i, "write_en"), one),
    ] {
        b.group_assign(step, dst, src, Guard::True).unwrap();
    }
    b.group_done(step, PortRef::cell(i, "done"), Guard::True)
        .unwrap();

    let cond = b.add_comb_group("cond");
    b.comb_assign(cond, PortRef::cell(lt, "left"), PortRef::cell(i, "out"), Guard::True)
        .unwrap();
    b.comb_assign(cond, PortRef::cell(lt, "right"), four, Guard::True)
        .unwrap();
    b.set_control(Control::while_(
        PortRef::cell(lt, "out"),
        Some(cond),
        Control::seq(vec![
            Control::enable(read),
            Control::enable(accum),
            Control::enable(step),
        ]),
    ));
    context(comp)
}

#[test]
fn sums_loaded_memory() {
    let ctx = summer();
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
    let mut data = MemoryData::new();
    data.insert("data", vec![1, 2, 3, 4], 8);
    sim.load_data(&data).unwrap();
    // four iterations of one condition cycle and three two-cycle groups,
    // then the final condition check
    assert_eq!(sim.run().unwrap(), 29);
    assert_eq!(sim.register("acc").unwrap(), 10);
    assert_eq!(sim.register("i").unwrap(), 4);
    assert_eq!(sim.write_counts("data").unwrap(), &[0, 0, 0, 0]);

    let dump = sim.dump_memories(false);
    let entry = dump.get("data").unwrap();
    assert_eq!(entry.data, vec![1, 2, 3, 4]);
    assert_eq!(entry.format.width, 8);
}

#[test]
fn short_data_is_zero_padded() {
    let ctx = summer();
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
    let mut data = MemoryData::new();
    data.insert("data", vec![9], 8);
    sim.load_data(&data).unwrap();
    sim.run().unwrap();
    assert_eq!(sim.memory("data").unwrap(), vec![9, 0, 0, 0]);
    assert_eq!(sim.register("acc").unwrap(), 9);
}

#[test]
fn rejects_bad_data() {
    let ctx = summer();
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();

    let mut data = MemoryData::new();
    data.insert("nope", vec![1], 8);
    let err = sim.load_data(&data).unwrap_err();
    assert!(matches!(&*err, SimError::UnknownMemory(name) if name == "nope"));

    // only external memories are visible to data files
    let mut data = MemoryData::new();
    data.insert("acc", vec![1], 8);
    assert!(matches!(*sim.load_data(&data).unwrap_err(), SimError::UnknownMemory(_)));

    let mut data = MemoryData::new();
    data.insert("data", vec![1, 2, 3, 4, 5], 8);
    assert!(matches!(
        *sim.load_data(&data).unwrap_err(),
        SimError::IncorrectMemorySize { size: 4, given: 5, .. }
    ));

    let json = r#"{ "data": { "data": [1],
        "format": { "numeric_type": "bitnum", "is_signed": true, "width": 8 } } }"#;
    let data = MemoryData::from_reader(json.as_bytes()).unwrap();
    assert!(matches!(
        *sim.load_data(&data).unwrap_err(),
        SimError::UnsupportedFormat { .. }
    ));
}

#[test]
fn out_of_range_address_is_reported() {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![]);
    let mut b = Builder::new(&mut comp, &lib);
    // three entries addressed by two bits
    let mem = b.add_primitive("mem", "seq_mem_d1", &[8, 3, 2]).unwrap();
    let three = b.constant(3, 2).unwrap();
    let one = b.constant(1, 1).unwrap();
    let g = b.add_group("peek");
    b.group_assign(g, PortRef::cell(mem, "addr0"), three, Guard::True)
        .unwrap();
    b.group_assign(g, PortRef::cell(mem, "read_en"), one, Guard::True)
        .unwrap();
    b.group_done(g, PortRef::cell(mem, "read_done"), Guard::True)
        .unwrap();
    b.set_control(Control::enable(g));
    let ctx = context(comp);
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
    assert!(matches!(
        *sim.run().unwrap_err(),
        SimError::InvalidMemoryAccess { addr: 3, size: 3, .. }
    ));
}

#[test]
fn runaway_loop_stalls() {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![]);
    let mut b = Builder::new(&mut comp, &lib);
    let r = b.add_primitive("r", "std_reg", &[8]).unwrap();
    let forever = b.constant(1, 1).unwrap();
    let body = store(&mut b, r, 1);
    b.set_control(Control::while_(forever, None, Control::enable(body)));
    let ctx = context(comp);
    let config = SimConfig::builder().max_cycles(10).build();
    let mut sim = Simulator::new(&ctx, config).unwrap();
    assert!(matches!(*sim.run().unwrap_err(), SimError::Stalled { cycles: 10 }));
    assert_eq!(sim.cycles(), 10);
}

#[test]
fn simultaneous_drivers_conflict() {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![]);
    let mut b = Builder::new(&mut comp, &lib);
    let r = b.add_primitive("r", "std_reg", &[8]).unwrap();
    let first = store(&mut b, r, 1);
    let second = store(&mut b, r, 2);
    b.set_control(Control::par(vec![
        Control::enable(first),
        Control::enable(second),
    ]));
    let ctx = context(comp);

    // rejected up front by the legality checks
    let err = Simulator::new(&ctx, SimConfig::default()).err().unwrap();
    assert!(matches!(*err, SimError::Design(_)));

    let config = SimConfig::builder().skip_verification(true).build();
    let mut sim = Simulator::new(&ctx, config).unwrap();
    let err = sim.run().unwrap_err();
    let SimError::ConflictingAssignments(conflict) = err.into_inner() else {
        panic!("expected a conflict");
    };
    assert_eq!(conflict.port, "r.in");
}

#[test]
fn invoke_passes_inputs_and_outputs() {
    let lib = LibrarySignatures::default();

    // `double` latches twice its input
    let mut double =
        Component::new("double", vec![PortDef::input("x", 8), PortDef::output("y", 8)]);
    let mut b = Builder::new(&mut double, &lib);
    let r = b.add_primitive("r", "std_reg", &[8]).unwrap();
    let add = b.add_primitive("add", "std_add", &[8]).unwrap();
    let one = b.constant(1, 1).unwrap();
    let g = b.add_group("latch");
    for (dst, src) in [
        (PortRef::cell(add, "left"), PortRef::this("x")),
        (PortRef::cell(add, "right"), PortRef::this("x")),
        (PortRef::cell(r, "in"), PortRef::cell(add, "out")),
        (PortRef::cell(r, "write_en"), one),
    ] {
        b.group_assign(g, dst, src, Guard::True).unwrap();
    }
    b.group_done(g, PortRef::cell(r, "done"), Guard::True).unwrap();
    b.continuous_assign(PortRef::this("y"), PortRef::cell(r, "out"), Guard::True)
        .unwrap();
    b.set_control(Control::enable(g));

    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &lib);
    let inst = b.add_component("d", "double", double.signature());
    let result = b.add_primitive("result", "std_reg", &[8]).unwrap();
    let x = b.constant(21, 8).unwrap();
    let copy = b.add_group("copy");
    let one = b.constant(1, 1).unwrap();
    for (dst, src) in [
        (PortRef::cell(result, "in"), PortRef::cell(inst, "y")),
        (PortRef::cell(result, "write_en"), one),
    ] {
        b.group_assign(copy, dst, src, Guard::True).unwrap();
    }
    b.group_done(copy, PortRef::cell(result, "done"), Guard::True)
        .unwrap();
    b.set_control(Control::seq(vec![
        Control::invoke(inst, vec![("x".into(), x)]),
        Control::enable(copy),
    ]));

    let mut ctx = Context::new("main");
    ctx.add_component(double).unwrap();
    ctx.add_component(main).unwrap();
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
    sim.run().unwrap();
    assert_eq!(sim.register("d.r").unwrap(), 42);
    assert_eq!(sim.register("result").unwrap(), 42);
}

/// `r := slice(pad(a) + b)`: an 8-bit sum widened to 12 bits and cut back
/// to 8.
fn adder(a: u64, b_val: u64) -> Context {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new("main", vec![]);
    let mut b = Builder::new(&mut comp, &lib);
    let r = b.add_primitive("r", "std_reg", &[8]).unwrap();
    let pad = b.add_primitive("pad", "std_pad", &[8, 12]).unwrap();
    let add = b.add_primitive("add", "std_add", &[12]).unwrap();
    let slice = b.add_primitive("slice", "std_slice", &[12, 8]).unwrap();
    let a = b.constant(a, 8).unwrap();
    let b_val = b.constant(b_val, 12).unwrap();
    let one = b.constant(1, 1).unwrap();
    let g = b.add_group("sum");
    for (dst, src) in [
        (PortRef::cell(pad, "in"), a),
        (PortRef::cell(add, "left"), PortRef::cell(pad, "out")),
        (PortRef::cell(add, "right"), b_val),
        (PortRef::cell(slice, "in"), PortRef::cell(add, "out")),
        (PortRef::cell(r, "in"), PortRef::cell(slice, "out")),
        (PortRef::cell(r, "write_en"), one),
    ] {
        b.group_assign(g, dst, src, Guard::True).unwrap();
    }
    b.group_done(g, PortRef::cell(r, "done"), Guard::True).unwrap();
    b.set_control(Control::enable(g));
    context(comp)
}

proptest! {
    #[test]
    fn arithmetic_wraps_to_the_port_width(a in 0..256_u64, b in 0..4096_u64) {
        let ctx = adder(a, b);
        let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
        prop_assert_eq!(sim.run().unwrap(), 2);
        prop_assert_eq!(sim.register("r").unwrap(), ((a + b) % 4096) % 256);
    }
}
