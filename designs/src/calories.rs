//! Sum of the three largest calorie groups.
//!
//! Inputs are the external memories `calories` (the values strung
//! together), `markers` (1 where a value starts a new group) and `count`
//! (number of valid values). Each finished group total is pushed into a
//! top-k tracker whose sum ends up in `answer`.
use crate::{
    MemoryInit,
    mem::build_mem,
    padded,
    topk::{TopKConfig, build_top_k, push},
};
use accel_ir::{
    Builder, Component, Context, Control, Guard, PortRef, build_assignments,
    structure,
};
use accel_utils::{AccelResult, Error, bits_needed_for};

pub const WIDTH: u64 = 32;
pub const MAX_SIZE: u64 = 4096;

/// Encode one value per line, with blank lines between groups.
pub fn inputs(text: &str) -> AccelResult<Vec<MemoryInit>> {
    let mut calories = vec![];
    let mut markers = vec![];
    let mut first = true;
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            first = true;
            continue;
        }
        let value = line
            .parse::<u32>()
            .map_err(|e| Error::invalid_file(format!("`{line}`: {e}")))?;
        calories.push(u64::from(value));
        markers.push(u64::from(first));
        first = false;
    }
    let count = calories.len() as u64;
    Ok(vec![
        MemoryInit::new("calories", padded(calories, MAX_SIZE)?, WIDTH),
        MemoryInit::new("markers", padded(markers, MAX_SIZE)?, 1),
        MemoryInit::new("count", vec![count], WIDTH),
        MemoryInit::new("answer", vec![0], WIDTH),
    ])
}

pub fn build() -> AccelResult<Context> {
    let mut ctx = Context::new("main");
    let top_k = build_top_k(&ctx.lib, &TopKConfig { k: 3, width: WIDTH })?;
    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &ctx.lib);
    let addr_width = bits_needed_for(MAX_SIZE);

    let calories = build_mem(&mut b, "calories", WIDTH, MAX_SIZE, true, false)?;
    let markers = build_mem(&mut b, "markers", 1, MAX_SIZE, true, false)?;
    let count = build_mem(&mut b, "count", WIDTH, 1, true, false)?;
    let answer = build_mem(&mut b, "answer", WIDTH, 1, true, false)?;
    let tracker = b.add_component("tracker", top_k.name, top_k.signature());

    structure!(b;
        let count_reg = prim std_reg(WIDTH);
        let idx = prim std_reg(WIDTH);
        let idx_add = prim std_add(WIDTH);
        let idx_lt = prim std_lt(WIDTH);
        let addr = prim std_slice(WIDTH, addr_width);
        let total = prim std_reg(WIDTH);
        let total_add = prim std_add(WIDTH);
        let hi = constant(1, 1);
        let zero = constant(0, WIDTH);
        let one = constant(1, WIDTH);
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

    // Read the value and its marker together.
    let read_value = b.add_group("read_value");
    let assigns = build_assignments!(b;
        addr["in"] = ? idx["out"];
        calories["addr0"] = ? addr["out"];
        calories["read_en"] = ? hi["out"];
        markers["addr0"] = ? addr["out"];
        markers["read_en"] = ? hi["out"];
    );
    b.extend_group(read_value, assigns);
    let both_read = Guard::port(PortRef::cell(calories, "read_done"))
        & Guard::port(PortRef::cell(markers, "read_done"));
    b.group_done(read_value, PortRef::cell(hi, "out"), both_read)?;

    let reset_total = b.add_group("reset_total");
    let assigns = build_assignments!(b;
        total["in"] = ? zero["out"];
        total["write_en"] = ? hi["out"];
    );
    b.extend_group(reset_total, assigns);
    b.group_done(reset_total, PortRef::cell(total, "done"), Guard::True)?;

    let add_value = b.add_group("add_value");
    let assigns = build_assignments!(b;
        total_add["left"] = ? total["out"];
        total_add["right"] = ? calories["out"];
        total["in"] = ? total_add["out"];
        total["write_en"] = ? hi["out"];
    );
    b.extend_group(add_value, assigns);
    b.group_done(add_value, PortRef::cell(total, "done"), Guard::True)?;

    let incr_idx = b.add_group("incr_idx");
    let assigns = build_assignments!(b;
        idx_add["left"] = ? idx["out"];
        idx_add["right"] = ? one["out"];
        idx["in"] = ? idx_add["out"];
        idx["write_en"] = ? hi["out"];
    );
    b.extend_group(incr_idx, assigns);
    b.group_done(incr_idx, PortRef::cell(idx, "done"), Guard::True)?;

    let finish = b.add_group("finish");
    let assigns = build_assignments!(b;
        answer["addr0"] = ? addr_zero["out"];
        answer["in"] = ? tracker["sum"];
        answer["write_en"] = ? hi["out"];
    );
    b.extend_group(finish, assigns);
    b.group_done(finish, PortRef::cell(answer, "write_done"), Guard::True)?;

    let push_total = push(tracker, PortRef::cell(total, "out"));
    b.set_control(Control::seq(vec![
        Control::enable(read_count),
        Control::while_(
            PortRef::cell(idx_lt, "out"),
            Some(in_range),
            Control::seq(vec![
                Control::enable(read_value),
                // A new group starts: push the finished one.
                Control::if_(
                    PortRef::cell(markers, "out"),
                    None,
                    Control::seq(vec![push_total.clone(), Control::enable(reset_total)]),
                    Control::empty(),
                ),
                Control::enable(add_value),
                Control::enable(incr_idx),
            ]),
        ),
        push_total,
        Control::enable(finish),
    ]));

    ctx.add_component(top_k)?;
    ctx.add_component(main)?;
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_are_marked() {
        let mems = inputs("1000\n2000\n\n4000\n").unwrap();
        assert_eq!(mems[0].data[..4], [1000, 2000, 4000, 0]);
        assert_eq!(mems[1].data[..4], [1, 0, 1, 0]);
        assert_eq!(mems[2].data, [3]);
        assert_eq!(inputs("12x\n").unwrap_err().kind(), "invalid-file");
    }
}
