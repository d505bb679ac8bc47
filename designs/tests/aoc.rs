use accel_designs::{DESIGNS, MemoryInit, build_design, design_inputs, rps};
use accel_sim::{MemoryData, SimConfig, Simulator};

const CALORIES: &str = "\
1000
2000
3000

4000

5000
6000

7000
8000
9000

10000
";

const STRATEGY: &str = "\
A Y
B X
C Z
";

const RUCKSACKS: &str = "\
vJrwpWtwJgWrhcsFMMfFFhFp
jqHRNqRjqzjGDLGLrsFMfFZSrLrFZsSL
PmmdzqPrVvPwwTWBwg
wMqvLMZHhHMvwLHjbvcjnnSBnvTQFn
ttgJtRGJQctTZtZT
CrZsJsPPZsGzwwsLwLmpwMDw
";

fn data(mems: Vec<MemoryInit>) -> MemoryData {
    let mut data = MemoryData::new();
    for mem in mems {
        data.insert(mem.name, mem.data, mem.width as u32);
    }
    data
}

/// Run the design `name` on the puzzle text and return `answer`.
fn solve(name: &str, text: &str) -> u64 {
    let ctx = build_design(name).unwrap();
    let mut sim =
        Simulator::new(&ctx, SimConfig::builder().max_cycles(1_000_000).build()).unwrap();
    sim.load_data(&data(design_inputs(name, text).unwrap()))
        .unwrap();
    sim.run().unwrap();
    sim.memory("answer").unwrap()[0]
}

#[test]
fn calories_example() {
    assert_eq!(solve("calories", CALORIES), 45000);
}

#[test]
fn calories_with_fewer_groups_than_slots() {
    assert_eq!(solve("calories", "3\n4\n\n5\n"), 12);
}

#[test]
fn rps_example() {
    assert_eq!(solve("rps", STRATEGY), 15);
}

#[test]
fn rps_matches_round_scores() {
    let moves = [("A", "X"), ("B", "Z"), ("C", "Y"), ("C", "X"), ("A", "Z")];
    let text = moves
        .iter()
        .map(|(a, b)| format!("{a} {b}"))
        .collect::<Vec<_>>()
        .join("\n");
    let code = |m: &str| match m {
        "A" | "X" => rps::ROCK,
        "B" | "Y" => rps::PAPER,
        _ => rps::SCISSORS,
    };
    let expected: u64 = moves
        .iter()
        .map(|(a, b)| rps::round_score(code(a), code(b)))
        .sum();
    assert_eq!(solve("rps", &text), expected);
}

#[test]
fn rucksack_example() {
    assert_eq!(solve("rucksack", RUCKSACKS), 157);
}

#[test]
fn repeated_shared_item_counts_once() {
    // `a` appears twice in the second compartment.
    assert_eq!(solve("rucksack", "abcaad\n"), 1);
}

#[test]
fn empty_inputs_answer_zero() {
    for name in DESIGNS.into_iter().filter(|n| *n != "topk") {
        assert_eq!(solve(name, ""), 0, "{name}");
    }
}

#[test]
fn dump_holds_the_answer() {
    let ctx = build_design("rps").unwrap();
    let mut sim = Simulator::new(&ctx, SimConfig::default()).unwrap();
    sim.load_data(&data(design_inputs("rps", STRATEGY).unwrap()))
        .unwrap();
    sim.run().unwrap();
    let dump = sim.dump_memories(false);
    assert_eq!(dump.get("answer").unwrap().data, [15]);
    assert!(dump.get("scorer.shape_score").is_none());
}
