use accel_ir::{
    Builder, Component, Guard, LibrarySignatures, PortComp, PortDef, PortRef,
};
use accel_opt::analysis::GuardExclusion;
use proptest::prelude::*;

/// Inputs `a` and `b` are 2 bits wide and `c` is a single bit. Every constant
/// those ports can be compared against is pre-built.
fn component() -> (Component, Vec<PortRef>, Vec<PortRef>) {
    let lib = LibrarySignatures::default();
    let mut comp = Component::new(
        "main",
        vec![
            PortDef::input("a", 2),
            PortDef::input("b", 2),
            PortDef::input("c", 1),
        ],
    );
    let mut b = Builder::new(&mut comp, &lib);
    let wide = (0..4).map(|v| b.constant(v, 2).unwrap()).collect();
    let narrow = (0..2).map(|v| b.constant(v, 1).unwrap()).collect();
    (comp, wide, narrow)
}

fn op() -> impl Strategy<Value = PortComp> {
    prop_oneof![
        Just(PortComp::Eq),
        Just(PortComp::Neq),
        Just(PortComp::Lt),
        Just(PortComp::Gt),
        Just(PortComp::Leq),
        Just(PortComp::Geq),
    ]
}

fn guard(wide: Vec<PortRef>, depth: u32) -> impl Strategy<Value = Guard> {
    let a = PortRef::this("a");
    let b = PortRef::this("b");
    let leaf = prop_oneof![
        Just(Guard::True),
        Just(Guard::port(PortRef::this("c"))),
        (op(), 0..4_usize).prop_map(move |(op, k)| Guard::comp(op, a, wide[k])),
        op().prop_map(move |op| Guard::comp(op, a, b)),
    ];
    leaf.prop_recursive(depth, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l & r),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| l | r),
            inner.prop_map(|g| !g),
        ]
    })
}

/// Evaluate `g` with `a`, `b` and `c` bound to concrete values.
fn holds(comp: &Component, g: &Guard, a: u64, b: u64, c: u64) -> bool {
    let read = |port: &PortRef| match comp.constant_value(port) {
        Some((val, _)) => val,
        None => match port.port.as_str() {
            "a" => a,
            "b" => b,
            "c" => c,
            _ => 0,
        },
    };
    g.eval(&read)
}

proptest! {
    #[test]
    fn exclusion_is_sound(
        (g1, g2) in {
            let (_, wide, _) = component();
            (guard(wide.clone(), 3), guard(wide, 3))
        }
    ) {
        let (comp, _, _) = component();
        let prover = GuardExclusion::new(&comp);
        if prover.exclusive(&g1, &g2) {
            for a in 0..4 {
                for b in 0..4 {
                    for c in 0..2 {
                        prop_assert!(
                            !(holds(&comp, &g1, a, b, c) && holds(&comp, &g2, a, b, c)),
                            "a={a} b={b} c={c}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn guard_excludes_its_negation(g in {
        let (_, wide, _) = component();
        guard(wide, 2)
    }) {
        let (comp, _, _) = component();
        let prover = GuardExclusion::new(&comp);
        prop_assert!(prover.exclusive(&g, &!g.clone()));
    }
}
