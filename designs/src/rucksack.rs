//! Sum of the priorities of the item shared by both compartments of every
//! rucksack.
//!
//! Items are 6-bit priorities strung together in `contents`; `lengths` holds
//! the size of one compartment of each rucksack and `rucksacks` the number of
//! rucksacks. Per rucksack, the items of the first compartment are marked in
//! a membership filter and the items of the second are checked against it.
use crate::{
    MemoryInit,
    filter::{FILTER, FilterConfig, FilterMode, build_filter, invoke_filter},
    mem::build_mem,
    padded,
};
use accel_ir::{
    Builder, Component, Context, Control, Guard, PortRef, build_assignments,
    structure,
};
use accel_utils::{AccelResult, Error, bits_for_value, bits_needed_for};

pub const MAX_CONTENTS: u64 = 16384;
pub const MAX_RUCKSACKS: u64 = 512;
pub const ITEM_WIDTH: u64 = 6;
pub const LENGTH_WIDTH: u64 = 8;
pub const SCORE_WIDTH: u64 = 32;

/// Priority of an item: `a` to `z` are 1 to 26, `A` to `Z` are 27 to 52.
pub fn priority(item: char) -> Option<u64> {
    match item {
        'a'..='z' => Some(item as u64 - 'a' as u64 + 1),
        'A'..='Z' => Some(item as u64 - 'A' as u64 + 27),
        _ => None,
    }
}

/// Encode one rucksack per line.
pub fn inputs(text: &str) -> AccelResult<Vec<MemoryInit>> {
    let mut contents = vec![];
    let mut lengths = vec![];
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.len() % 2 != 0 {
            return Err(Error::invalid_file(format!(
                "rucksack `{line}` has compartments of different sizes"
            )));
        }
        for c in line.chars() {
            let p = priority(c).ok_or_else(|| {
                Error::invalid_file(format!("`{c}` is not an item"))
            })?;
            contents.push(p);
        }
        let length = line.len() as u64 / 2;
        if length >= 1 << LENGTH_WIDTH {
            return Err(Error::capacity(format!(
                "compartments hold at most {} items",
                (1 << LENGTH_WIDTH) - 1
            )));
        }
        lengths.push(length);
    }
    let rucksacks = lengths.len() as u64;
    Ok(vec![
        MemoryInit::new("contents", padded(contents, MAX_CONTENTS)?, ITEM_WIDTH),
        MemoryInit::new("lengths", padded(lengths, MAX_RUCKSACKS)?, LENGTH_WIDTH),
        MemoryInit::new("rucksacks", vec![rucksacks], bits_for_value(MAX_RUCKSACKS)),
        MemoryInit::new("answer", vec![0], SCORE_WIDTH),
    ])
}

pub fn build() -> AccelResult<Context> {
    let mut ctx = Context::new("main");
    let filter_def = build_filter(
        &ctx.lib,
        &FilterConfig {
            width: ITEM_WIDTH,
            shared_markers: false,
        },
    )?;
    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &ctx.lib);
    // The rucksack counter must reach MAX_RUCKSACKS itself.
    let rucksack_width = bits_for_value(MAX_RUCKSACKS);
    let contents_width = bits_needed_for(MAX_CONTENTS);

    let contents = build_mem(&mut b, "contents", ITEM_WIDTH, MAX_CONTENTS, true, false)?;
    let lengths = build_mem(&mut b, "lengths", LENGTH_WIDTH, MAX_RUCKSACKS, true, false)?;
    let rucksacks = build_mem(&mut b, "rucksacks", rucksack_width, 1, true, false)?;
    let answer = build_mem(&mut b, "answer", SCORE_WIDTH, 1, true, false)?;
    let filter = b.add_component(FILTER, filter_def.name, filter_def.signature());

    structure!(b;
        let rucksacks_reg = prim std_reg(rucksack_width);
        let rucksack_idx = prim std_reg(rucksack_width);
        let rucksack_add = prim std_add(rucksack_width);
        let rucksack_lt = prim std_lt(rucksack_width);
        let rucksack_addr = prim std_slice(rucksack_width, bits_needed_for(MAX_RUCKSACKS));
        let items = prim std_reg(LENGTH_WIDTH);
        let item_idx = prim std_reg(LENGTH_WIDTH);
        let item_add = prim std_add(LENGTH_WIDTH);
        let item_lt = prim std_lt(LENGTH_WIDTH);
        let global_item_idx = prim std_reg(contents_width);
        let global_item_add = prim std_add(contents_width);
        let item = prim std_reg(ITEM_WIDTH);
        let accum = prim std_reg(SCORE_WIDTH);
        let accum_add = prim std_add(SCORE_WIDTH);
        let pad = prim std_pad(ITEM_WIDTH, SCORE_WIDTH);
        let hi = constant(1, 1);
        let addr_zero = constant(0, 1);
        let rucksack_one = constant(1, rucksack_width);
        let item_zero = constant(0, LENGTH_WIDTH);
        let item_one = constant(1, LENGTH_WIDTH);
        let global_one = constant(1, contents_width);
    );

    let init_rucksack = b.add_group("init_rucksack");
    let read_done = Guard::port(PortRef::cell(rucksacks, "read_done"));
    let assigns = build_assignments!(b;
        rucksacks["read_en"] = ? hi["out"];
        rucksacks["addr0"] = ? addr_zero["out"];
        rucksacks_reg["write_en"] = read_done ? hi["out"];
        rucksacks_reg["in"] = ? rucksacks["out"];
    );
    b.extend_group(init_rucksack, assigns);
    b.group_done(init_rucksack, PortRef::cell(rucksacks_reg, "done"), Guard::True)?;

    let incr_rucksack = b.add_group("incr_rucksack");
    let assigns = build_assignments!(b;
        rucksack_add["left"] = ? rucksack_idx["out"];
        rucksack_add["right"] = ? rucksack_one["out"];
        rucksack_idx["write_en"] = ? hi["out"];
        rucksack_idx["in"] = ? rucksack_add["out"];
    );
    b.extend_group(incr_rucksack, assigns);
    b.group_done(incr_rucksack, PortRef::cell(rucksack_idx, "done"), Guard::True)?;

    let check_rucksack = b.add_comb_group("check_rucksack");
    let assigns = build_assignments!(b;
        rucksack_lt["left"] = ? rucksack_idx["out"];
        rucksack_lt["right"] = ? rucksacks_reg["out"];
    );
    b.extend_comb_group(check_rucksack, assigns);

    let init_items = b.add_group("init_items");
    let read_done = Guard::port(PortRef::cell(lengths, "read_done"));
    let assigns = build_assignments!(b;
        rucksack_addr["in"] = ? rucksack_idx["out"];
        lengths["read_en"] = ? hi["out"];
        lengths["addr0"] = ? rucksack_addr["out"];
        items["write_en"] = read_done ? hi["out"];
        items["in"] = ? lengths["out"];
    );
    b.extend_group(init_items, assigns);
    b.group_done(init_items, PortRef::cell(items, "done"), Guard::True)?;

    let reset_item = b.add_group("reset_item");
    let assigns = build_assignments!(b;
        item_idx["write_en"] = ? hi["out"];
        item_idx["in"] = ? item_zero["out"];
    );
    b.extend_group(reset_item, assigns);
    b.group_done(reset_item, PortRef::cell(item_idx, "done"), Guard::True)?;

    let incr_item = b.add_group("incr_item");
    let assigns = build_assignments!(b;
        item_add["left"] = ? item_idx["out"];
        item_add["right"] = ? item_one["out"];
        item_idx["write_en"] = ? hi["out"];
        item_idx["in"] = ? item_add["out"];
    );
    b.extend_group(incr_item, assigns);
    b.group_done(incr_item, PortRef::cell(item_idx, "done"), Guard::True)?;

    let check_item = b.add_comb_group("check_item");
    let assigns = build_assignments!(b;
        item_lt["left"] = ? item_idx["out"];
        item_lt["right"] = ? items["out"];
    );
    b.extend_comb_group(check_item, assigns);

    // Position in `contents`, across rucksacks.
    let incr_global_item = b.add_group("incr_global_item");
    let assigns = build_assignments!(b;
        global_item_add["left"] = ? global_item_idx["out"];
        global_item_add["right"] = ? global_one["out"];
        global_item_idx["write_en"] = ? hi["out"];
        global_item_idx["in"] = ? global_item_add["out"];
    );
    b.extend_group(incr_global_item, assigns);
    b.group_done(incr_global_item, PortRef::cell(global_item_idx, "done"), Guard::True)?;

    let load_item = b.add_group("load_item");
    let read_done = Guard::port(PortRef::cell(contents, "read_done"));
    let assigns = build_assignments!(b;
        contents["read_en"] = ? hi["out"];
        contents["addr0"] = ? global_item_idx["out"];
        item["write_en"] = read_done ? hi["out"];
        item["in"] = ? contents["out"];
    );
    b.extend_group(load_item, assigns);
    b.group_done(load_item, PortRef::cell(item, "done"), Guard::True)?;

    let accum_priority = b.add_group("accum_priority");
    let assigns = build_assignments!(b;
        pad["in"] = ? item["out"];
        accum_add["left"] = ? accum["out"];
        accum_add["right"] = ? pad["out"];
        accum["write_en"] = ? hi["out"];
        accum["in"] = ? accum_add["out"];
    );
    b.extend_group(accum_priority, assigns);
    b.group_done(accum_priority, PortRef::cell(accum, "done"), Guard::True)?;

    let finish = b.add_group("finish");
    let assigns = build_assignments!(b;
        answer["write_en"] = ? hi["out"];
        answer["addr0"] = ? addr_zero["out"];
        answer["in"] = ? accum["out"];
    );
    b.extend_group(finish, assigns);
    b.group_done(finish, PortRef::cell(answer, "write_done"), Guard::True)?;

    let value = PortRef::cell(item, "out");
    let clear = invoke_filter(&mut b, filter, FilterMode::Clear, value, None)?;
    let set = invoke_filter(&mut b, filter, FilterMode::Set, value, None)?;
    let check = invoke_filter(&mut b, filter, FilterMode::Check, value, None)?;
    let next_item = Control::par(vec![
        Control::enable(incr_item),
        Control::enable(incr_global_item),
    ]);

    b.set_control(Control::seq(vec![
        Control::enable(init_rucksack),
        Control::while_(
            PortRef::cell(rucksack_lt, "out"),
            Some(check_rucksack),
            Control::seq(vec![
                clear.clone(),
                Control::par(vec![Control::enable(init_items), Control::enable(reset_item)]),
                // First compartment.
                Control::while_(
                    PortRef::cell(item_lt, "out"),
                    Some(check_item),
                    Control::seq(vec![Control::enable(load_item), set, next_item.clone()]),
                ),
                // Second compartment. A repeated item only counts once.
                Control::enable(reset_item),
                Control::while_(
                    PortRef::cell(item_lt, "out"),
                    Some(check_item),
                    Control::seq(vec![
                        Control::enable(load_item),
                        check,
                        Control::if_(
                            PortRef::cell(filter, "present"),
                            None,
                            Control::seq(vec![Control::enable(accum_priority), clear]),
                            Control::empty(),
                        ),
                        next_item,
                    ]),
                ),
                Control::enable(incr_rucksack),
            ]),
        ),
        Control::enable(finish),
    ]));

    ctx.add_component(filter_def)?;
    ctx.add_component(main)?;
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities() {
        assert_eq!(priority('a'), Some(1));
        assert_eq!(priority('z'), Some(26));
        assert_eq!(priority('A'), Some(27));
        assert_eq!(priority('Z'), Some(52));
        assert_eq!(priority('?'), None);
    }

    #[test]
    fn uneven_rucksack_rejected() {
        let err = inputs("abc\n").unwrap_err();
        assert_eq!(err.kind(), "invalid-file");
    }
}
