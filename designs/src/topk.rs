//! A tracker of the sum of the K largest values pushed into it.
//!
//! The tracker keeps K candidate registers in no particular order. Pushing a
//! value computes the minimum candidate and its index with a left-to-right
//! reduction, and when the pushed value is larger, overwrites exactly that
//! candidate. The sum of the candidates is computed continuously and exposed
//! on the `sum` output.
//!
//! Candidates start at zero, so a slot that was never written cannot be told
//! apart from one holding a pushed zero. The sum is unaffected by this.
use crate::{MemoryInit, mem::build_mem, padded};
use accel_ir::{
    Builder, CellIdx, Component, Context, Control, Guard, LibrarySignatures,
    PortDef, PortRef, build_assignments, structure,
};
use accel_utils::{AccelResult, Error, bits_for_value, bits_needed_for};

/// Name of the tracker component.
pub const TOP_K: &str = "top_k";

#[derive(Debug, Clone, Copy)]
pub struct TopKConfig {
    /// Number of values tracked.
    pub k: usize,
    /// Width of the pushed values and of the sum.
    pub width: u64,
}

impl Default for TopKConfig {
    fn default() -> Self {
        Self { k: 3, width: 32 }
    }
}

/// Build the `top_k` component: input `value`, output `sum`. Invoking it
/// pushes `value`.
pub fn build_top_k(lib: &LibrarySignatures, config: &TopKConfig) -> AccelResult<Component> {
    let TopKConfig { k, width } = *config;
    if k == 0 {
        return Err(Error::capacity("a top-k tracker needs at least one slot"));
    }
    let idx_width = bits_needed_for(k as u64);
    let mut comp = Component::new(
        TOP_K,
        vec![PortDef::input("value", width), PortDef::output("sum", width)],
    );
    let mut b = Builder::new(&mut comp, lib);

    let slots = (0..k)
        .map(|i| b.add_primitive(format!("slot{i}"), "std_reg", &[width]))
        .collect::<AccelResult<Vec<_>>>()?;

    let sum = build_sum(&mut b, &slots, width)?;
    b.continuous_assign(PortRef::this("sum"), sum, Guard::True)?;

    let (min, min_idx) = build_argmin(&mut b, &slots, width, idx_width)?;

    structure!(b;
        let gt = prim std_gt(width);
        let signal_on = constant(1, 1);
    );
    let compare = b.add_comb_group("compare");
    b.comb_assign(compare, PortRef::cell(gt, "left"), PortRef::this("value"), Guard::True)?;
    b.comb_assign(compare, PortRef::cell(gt, "right"), min, Guard::True)?;

    // One-hot write of the minimum slot.
    let replace = b.add_group("replace");
    for (i, slot) in slots.iter().copied().enumerate() {
        let eq = b.add_primitive(format!("is_min{i}"), "std_eq", &[idx_width])?;
        let idx = b.add_constant(i as u64, idx_width)?;
        let selected = Guard::port(PortRef::cell(eq, "out"));
        let assigns = build_assignments!(b;
            slot["in"] = ? this["value"];
            slot["write_en"] = selected ? signal_on["out"];
            eq["right"] = ? idx["out"];
        );
        b.extend_group(replace, assigns);
        b.group_assign(replace, PortRef::cell(eq, "left"), min_idx, Guard::True)?;
    }
    let written = Guard::any(slots.iter().map(|s| Guard::port(PortRef::cell(*s, "done"))));
    b.group_done(replace, PortRef::cell(signal_on, "out"), written)?;

    b.set_control(Control::if_(
        PortRef::cell(gt, "out"),
        Some(compare),
        Control::enable(replace),
        Control::empty(),
    ));
    log::debug!("{TOP_K}: built with k={k}, width={width}");
    Ok(comp)
}

/// Continuous adder chain over the slots. Returns the port carrying the sum.
fn build_sum(b: &mut Builder, slots: &[CellIdx], width: u64) -> AccelResult<PortRef> {
    let mut acc = PortRef::cell(slots[0], "out");
    for (i, slot) in slots.iter().enumerate().skip(1) {
        let add = b.add_primitive(format!("sum{i}"), "std_add", &[width])?;
        b.continuous_assign(PortRef::cell(add, "left"), acc, Guard::True)?;
        b.continuous_assign(PortRef::cell(add, "right"), PortRef::cell(*slot, "out"), Guard::True)?;
        acc = PortRef::cell(add, "out");
    }
    Ok(acc)
}

/// Continuous left-to-right minimum reduction over the slots. A slot only
/// replaces the running minimum when it is strictly smaller, so ties keep
/// the earlier index. Returns the ports carrying the minimum and its index.
fn build_argmin(
    b: &mut Builder,
    slots: &[CellIdx],
    width: u64,
    idx_width: u64,
) -> AccelResult<(PortRef, PortRef)> {
    let mut min = PortRef::cell(slots[0], "out");
    let mut min_idx = b.constant(0, idx_width)?;
    for (i, slot) in slots.iter().copied().enumerate().skip(1) {
        let lt = b.add_primitive(format!("lt{i}"), "std_lt", &[width])?;
        let min_wire = b.add_primitive(format!("min{i}"), "std_wire", &[width])?;
        let idx_wire = b.add_primitive(format!("min_idx{i}"), "std_wire", &[idx_width])?;
        let idx = b.constant(i as u64, idx_width)?;
        let smaller = Guard::port(PortRef::cell(lt, "out"));
        let not_smaller = !smaller.clone();

        b.continuous_assign(PortRef::cell(lt, "left"), PortRef::cell(slot, "out"), Guard::True)?;
        b.continuous_assign(PortRef::cell(lt, "right"), min, Guard::True)?;
        b.continuous_assign(PortRef::cell(min_wire, "in"), PortRef::cell(slot, "out"), smaller.clone())?;
        b.continuous_assign(PortRef::cell(min_wire, "in"), min, not_smaller.clone())?;
        b.continuous_assign(PortRef::cell(idx_wire, "in"), idx, smaller)?;
        b.continuous_assign(PortRef::cell(idx_wire, "in"), min_idx, not_smaller)?;

        min = PortRef::cell(min_wire, "out");
        min_idx = PortRef::cell(idx_wire, "out");
    }
    Ok((min, min_idx))
}

/// Control that pushes `value` into the tracker instance `cell`.
pub fn push(cell: CellIdx, value: PortRef) -> Control {
    Control::invoke(cell, vec![("value".into(), value)])
}

/// Capacity of the streaming driver's memories.
pub const STREAM_SIZE: u64 = 1024;

/// A driver that pushes every value of the external memory `values` (with
/// `count` valid entries) into a tracker and records the tracker's sum after
/// each push in `sums`.
pub fn build_streaming(config: &TopKConfig) -> AccelResult<Context> {
    let width = config.width;
    let mut ctx = Context::new("main");
    let top_k = build_top_k(&ctx.lib, config)?;
    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &ctx.lib);
    let idx_width = bits_for_value(STREAM_SIZE);
    let addr_width = bits_needed_for(STREAM_SIZE);

    let values = build_mem(&mut b, "values", width, STREAM_SIZE, true, false)?;
    let count = build_mem(&mut b, "count", idx_width, 1, true, false)?;
    let sums = build_mem(&mut b, "sums", width, STREAM_SIZE, true, false)?;
    let tracker = b.add_component("tracker", top_k.name, top_k.signature());

    structure!(b;
        let count_reg = prim std_reg(idx_width);
        let value = prim std_reg(width);
        let idx = prim std_reg(idx_width);
        let idx_add = prim std_add(idx_width);
        let idx_lt = prim std_lt(idx_width);
        let addr = prim std_slice(idx_width, addr_width);
        let hi = constant(1, 1);
        let one = constant(1, idx_width);
        let addr_zero = constant(0, 1);
    );

    let read_count = b.add_group("read_count");
    let read_done = Guard::port(PortRef::cell(count, "read_done"));
    let assigns = build_assignments!(b;
        count["read_en"] = ? hi["out"];
        count["addr0"] = ? addr_zero["out"];
        count_reg["write_en"] = read_done ? hi["out"];
        count_reg["in"] = ? count["out"];
    );
    b.extend_group(read_count, assigns);
    b.group_done(read_count, PortRef::cell(count_reg, "done"), Guard::True)?;

    let in_range = b.add_comb_group("in_range");
    let assigns = build_assignments!(b;
        idx_lt["left"] = ? idx["out"];
        idx_lt["right"] = ? count_reg["out"];
    );
    b.extend_comb_group(in_range, assigns);

    let read_value = b.add_group("read_value");
    let read_done = Guard::port(PortRef::cell(values, "read_done"));
    let assigns = build_assignments!(b;
        addr["in"] = ? idx["out"];
        values["addr0"] = ? addr["out"];
        values["read_en"] = ? hi["out"];
        value["write_en"] = read_done ? hi["out"];
        value["in"] = ? values["out"];
    );
    b.extend_group(read_value, assigns);
    b.group_done(read_value, PortRef::cell(value, "done"), Guard::True)?;

    let record_sum = b.add_group("record_sum");
    let assigns = build_assignments!(b;
        addr["in"] = ? idx["out"];
        sums["addr0"] = ? addr["out"];
        sums["in"] = ? tracker["sum"];
        sums["write_en"] = ? hi["out"];
    );
    b.extend_group(record_sum, assigns);
    b.group_done(record_sum, PortRef::cell(sums, "write_done"), Guard::True)?;

    let incr_idx = b.add_group("incr_idx");
    let assigns = build_assignments!(b;
        idx_add["left"] = ? idx["out"];
        idx_add["right"] = ? one["out"];
        idx["in"] = ? idx_add["out"];
        idx["write_en"] = ? hi["out"];
    );
    b.extend_group(incr_idx, assigns);
    b.group_done(incr_idx, PortRef::cell(idx, "done"), Guard::True)?;

    b.set_control(Control::seq(vec![
        Control::enable(read_count),
        Control::while_(
            PortRef::cell(idx_lt, "out"),
            Some(in_range),
            Control::seq(vec![
                Control::enable(read_value),
                push(tracker, PortRef::cell(value, "out")),
                Control::enable(record_sum),
                Control::enable(incr_idx),
            ]),
        ),
    ]));

    ctx.add_component(top_k)?;
    ctx.add_component(main)?;
    Ok(ctx)
}

/// Encode whitespace-separated values for the streaming driver.
pub fn streaming_inputs(text: &str, width: u64) -> AccelResult<Vec<MemoryInit>> {
    let values = text
        .split_whitespace()
        .map(|v| {
            v.parse::<u64>()
                .map_err(|e| Error::invalid_file(format!("`{v}`: {e}")))
        })
        .collect::<AccelResult<Vec<_>>>()?;
    let count = values.len() as u64;
    Ok(vec![
        MemoryInit::new("values", padded(values, STREAM_SIZE)?, width),
        MemoryInit::new("count", vec![count], bits_for_value(STREAM_SIZE)),
        MemoryInit::new("sums", vec![0; STREAM_SIZE as usize], width),
    ])
}
