//! Total score of a rock-paper-scissors strategy guide.
//!
//! Moves are 2-bit numbers in the external memories `them` and `us`;
//! `count` holds the number of rounds. Every round is scored by the `scorer`
//! component, which looks up the score of our shape and the score of the
//! outcome in two tables, and the total ends up in `answer`.
use crate::{
    MemoryInit,
    mem::{build_lut, build_mem},
    padded,
};
use accel_ir::{
    Builder, Component, Context, Control, Guard, Id, LibrarySignatures, PortDef,
    PortRef, build_assignments, structure,
};
use accel_utils::{AccelResult, Error, bits_for_value, bits_needed_for};

pub const WIDTH: u64 = 32;
pub const MAX_SIZE: u64 = 4096;

pub const ROCK: u64 = 0;
pub const PAPER: u64 = 1;
pub const SCISSORS: u64 = 2;

/// `(ours, theirs)` pairs where we win.
const WINS: [(u64, u64); 3] = [(ROCK, SCISSORS), (PAPER, ROCK), (SCISSORS, PAPER)];
const SHAPE_SCORE: [u64; 3] = [1, 2, 3];
const LOSE_SCORE: u64 = 0;
const DRAW_SCORE: u64 = 3;
const WIN_SCORE: u64 = 6;

/// Outcome scores indexed by the concatenation `(them << 2) | us`.
pub fn outcome_table() -> Vec<u64> {
    let mut table = vec![0; 16];
    for them in [ROCK, PAPER, SCISSORS] {
        for us in [ROCK, PAPER, SCISSORS] {
            table[((them << 2) | us) as usize] = if us == them {
                DRAW_SCORE
            } else if WINS.contains(&(us, them)) {
                WIN_SCORE
            } else {
                LOSE_SCORE
            };
        }
    }
    table
}

/// Score of one round as computed by the `scorer` component.
pub fn round_score(them: u64, us: u64) -> u64 {
    SHAPE_SCORE[us as usize] + outcome_table()[((them << 2) | us) as usize]
}

/// Encode one round per line: their move (`A`, `B`, `C`) then ours (`X`,
/// `Y`, `Z`), both meaning rock, paper, scissors.
pub fn inputs(text: &str) -> AccelResult<Vec<MemoryInit>> {
    let mut them = vec![];
    let mut us = vec![];
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (a, b) = match line.split_whitespace().collect::<Vec<_>>()[..] {
            ["A", b] => (ROCK, b),
            ["B", b] => (PAPER, b),
            ["C", b] => (SCISSORS, b),
            _ => return Err(Error::invalid_file(format!("bad round `{line}`"))),
        };
        let b = match b {
            "X" => ROCK,
            "Y" => PAPER,
            "Z" => SCISSORS,
            _ => return Err(Error::invalid_file(format!("bad move `{b}`"))),
        };
        them.push(a);
        us.push(b);
    }
    let count = them.len() as u64;
    Ok(vec![
        MemoryInit::new("them", padded(them, MAX_SIZE)?, 2),
        MemoryInit::new("us", padded(us, MAX_SIZE)?, 2),
        MemoryInit::new("count", vec![count], bits_for_value(MAX_SIZE)),
        MemoryInit::new("answer", vec![0], WIDTH),
    ])
}

/// The `scorer` component: inputs `them` and `us`, output `score`.
fn build_scorer(lib: &LibrarySignatures) -> AccelResult<Component> {
    let mut scorer = Component::new(
        "scorer",
        vec![
            PortDef::input("them", 2),
            PortDef::input("us", 2),
            PortDef::output("score", WIDTH),
        ],
    );
    let mut b = Builder::new(&mut scorer, lib);
    structure!(b;
        let shape_score = prim std_reg(WIDTH);
        let outcome_score = prim std_reg(WIDTH);
        let cat = prim std_cat(2, 2, 4);
        let add = prim std_add(WIDTH);
        let hi = constant(1, 1);
    );

    let get_shape_score = b.add_group("get_shape_score");
    let shape_lut = build_lut(
        &mut b,
        "shape_score",
        &SHAPE_SCORE,
        WIDTH,
        PortRef::this("us"),
        Some(get_shape_score),
    )?;
    let assigns = build_assignments!(b;
        shape_score["write_en"] = ? hi["out"];
        shape_score["in"] = ? shape_lut["out"];
    );
    b.extend_group(get_shape_score, assigns);
    b.group_done(get_shape_score, PortRef::cell(shape_score, "done"), Guard::True)?;

    // The table is indexed by both moves side by side.
    let get_outcome_score = b.add_group("get_outcome_score");
    let outcome_lut = build_lut(
        &mut b,
        "outcome_score",
        &outcome_table(),
        WIDTH,
        PortRef::cell(cat, "out"),
        Some(get_outcome_score),
    )?;
    let assigns = build_assignments!(b;
        cat["left"] = ? this["them"];
        cat["right"] = ? this["us"];
        outcome_score["write_en"] = ? hi["out"];
        outcome_score["in"] = ? outcome_lut["out"];
    );
    b.extend_group(get_outcome_score, assigns);
    b.group_done(get_outcome_score, PortRef::cell(outcome_score, "done"), Guard::True)?;

    let assigns = build_assignments!(b;
        add["left"] = ? shape_score["out"];
        add["right"] = ? outcome_score["out"];
        this["score"] = ? add["out"];
    );
    b.add_continuous_assignments(assigns);

    b.set_control(Control::par(vec![
        Control::enable(get_shape_score),
        Control::enable(get_outcome_score),
    ]));
    Ok(scorer)
}

pub fn build() -> AccelResult<Context> {
    let mut ctx = Context::new("main");
    let scorer_def = build_scorer(&ctx.lib)?;
    let mut main = Component::new("main", vec![]);
    let mut b = Builder::new(&mut main, &ctx.lib);
    let idx_width = bits_for_value(MAX_SIZE);
    let addr_width = bits_needed_for(MAX_SIZE);

    let them = build_mem(&mut b, "them", 2, MAX_SIZE, true, false)?;
    let us = build_mem(&mut b, "us", 2, MAX_SIZE, true, false)?;
    let count = build_mem(&mut b, "count", idx_width, 1, true, false)?;
    let answer = build_mem(&mut b, "answer", WIDTH, 1, true, false)?;
    let scorer = b.add_component("scorer", scorer_def.name, scorer_def.signature());

    structure!(b;
        let count_reg = prim std_reg(idx_width);
        let idx = prim std_reg(idx_width);
        let idx_add = prim std_add(idx_width);
        let idx_lt = prim std_lt(idx_width);
        let addr = prim std_slice(idx_width, addr_width);
        let accum = prim std_reg(WIDTH);
        let accum_add = prim std_add(WIDTH);
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

    // Load a pair of moves.
    let get_a_move = b.add_group("get_a_move");
    let assigns = build_assignments!(b;
        addr["in"] = ? idx["out"];
        them["addr0"] = ? addr["out"];
        them["read_en"] = ? hi["out"];
        us["addr0"] = ? addr["out"];
        us["read_en"] = ? hi["out"];
    );
    b.extend_group(get_a_move, assigns);
    let both_read = Guard::port(PortRef::cell(them, "read_done"))
        & Guard::port(PortRef::cell(us, "read_done"));
    b.group_done(get_a_move, PortRef::cell(hi, "out"), both_read)?;

    let store_score = b.add_group("store_score");
    let assigns = build_assignments!(b;
        accum_add["left"] = ? accum["out"];
        accum_add["right"] = ? scorer["score"];
        accum["in"] = ? accum_add["out"];
        accum["write_en"] = ? hi["out"];
    );
    b.extend_group(store_score, assigns);
    b.group_done(store_score, PortRef::cell(accum, "done"), Guard::True)?;

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
        answer["in"] = ? accum["out"];
        answer["write_en"] = ? hi["out"];
    );
    b.extend_group(finish, assigns);
    b.group_done(finish, PortRef::cell(answer, "write_done"), Guard::True)?;

    b.set_control(Control::seq(vec![
        Control::enable(read_count),
        Control::while_(
            PortRef::cell(idx_lt, "out"),
            Some(in_range),
            Control::seq(vec![
                Control::enable(get_a_move),
                Control::invoke(
                    scorer,
                    vec![
                        (Id::from("them"), PortRef::cell(them, "out")),
                        (Id::from("us"), PortRef::cell(us, "out")),
                    ],
                ),
                Control::enable(store_score),
                Control::enable(incr_idx),
            ]),
        ),
        Control::enable(finish),
    ]));

    ctx.add_component(scorer_def)?;
    ctx.add_component(main)?;
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_scores() {
        let table = outcome_table();
        assert_eq!(table[((ROCK << 2) | PAPER) as usize], WIN_SCORE);
        assert_eq!(table[((PAPER << 2) | ROCK) as usize], LOSE_SCORE);
        assert_eq!(table[((SCISSORS << 2) | SCISSORS) as usize], DRAW_SCORE);
        assert_eq!(round_score(ROCK, PAPER), 8);
        assert_eq!(round_score(PAPER, ROCK), 1);
        assert_eq!(round_score(SCISSORS, SCISSORS), 6);
    }
}
