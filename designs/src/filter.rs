//! A membership filter over `width`-bit values, backed by a bitmap memory
//! with one 1-bit entry per possible value.
//!
//! Each invocation requests one mode through the mutually exclusive `set`
//! and `clear` inputs; with neither raised the invocation is a check whose
//! answer is latched on the `present` output.
//!
//! Clearing walks every address with a counter one bit wider than the
//! address, so the bound `2^width` is representable and the loop is a plain
//! less-than test.
use crate::mem::build_mem;
use accel_ir::{
    Builder, CellIdx, Component, Control, Guard, LibrarySignatures, PortDef,
    PortRef, build_assignments, structure,
};
use accel_utils::{AccelResult, Error, Id};

/// Name of the filter component.
pub const FILTER: &str = "filter";

/// Widest value the filter accepts. The bitmap has `2^width` entries.
pub const MAX_FILTER_WIDTH: u64 = 20;

#[derive(Debug, Clone, Copy)]
pub struct FilterConfig {
    /// Width of the values.
    pub width: u64,
    /// The bitmap is a by-reference cell lent by every invoke instead of a
    /// memory owned by the filter.
    pub shared_markers: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            width: 6,
            shared_markers: false,
        }
    }
}

/// The request an invocation makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Latch whether the value has been marked on `present`.
    Check,
    /// Mark the value.
    Set,
    /// Unmark every value and lower `present`.
    Clear,
}

/// Build the `filter` component: inputs `value`, `set` and `clear`, output
/// `present`. The bitmap is the cell `markers`.
pub fn build_filter(lib: &LibrarySignatures, config: &FilterConfig) -> AccelResult<Component> {
    let w = config.width;
    if w == 0 || w > MAX_FILTER_WIDTH {
        return Err(Error::capacity(format!(
            "filter values must be between 1 and {MAX_FILTER_WIDTH} bits, got {w}"
        )));
    }
    let size = 1_u64 << w;
    let mut comp = Component::new(
        FILTER,
        vec![
            PortDef::input("value", w),
            PortDef::input("set", 1),
            PortDef::input("clear", 1),
            PortDef::output("present", 1),
        ],
    );
    comp.add_exclusive_inputs(vec!["set", "clear"]);
    let mut b = Builder::new(&mut comp, lib);

    let markers = build_mem(&mut b, "markers", 1, size, false, config.shared_markers)?;
    structure!(b;
        let present_reg = prim std_reg(1);
        let idx = prim std_reg(w + 1);
        let idx_lt = prim std_lt(w + 1);
        let idx_add = prim std_add(w + 1);
        let addr = prim std_slice(w + 1, w);
        let bound = constant(size, w + 1);
        let idx_zero = constant(0, w + 1);
        let idx_one = constant(1, w + 1);
        let hi = constant(1, 1);
        let lo = constant(0, 1);
    );

    let assigns = build_assignments!(b;
        this["present"] = ? present_reg["out"];
    );
    b.add_continuous_assignments(assigns);

    // Latch the marker once the read completes.
    let check_marker = b.add_group("check_marker");
    let read_done = Guard::port(PortRef::cell(markers, "read_done"));
    let assigns = build_assignments!(b;
        markers["read_en"] = ? hi["out"];
        markers["addr0"] = ? this["value"];
        present_reg["write_en"] = read_done ? hi["out"];
        present_reg["in"] = ? markers["out"];
    );
    b.extend_group(check_marker, assigns);
    b.group_done(check_marker, PortRef::cell(present_reg, "done"), Guard::True)?;

    let set_marker = b.add_group("set_marker");
    let assigns = build_assignments!(b;
        markers["write_en"] = ? hi["out"];
        markers["addr0"] = ? this["value"];
        markers["in"] = ? hi["out"];
    );
    b.extend_group(set_marker, assigns);
    b.group_done(set_marker, PortRef::cell(markers, "write_done"), Guard::True)?;

    // The clearing loop.
    let init_idx = b.add_group("init_idx");
    let assigns = build_assignments!(b;
        idx["in"] = ? idx_zero["out"];
        idx["write_en"] = ? hi["out"];
    );
    b.extend_group(init_idx, assigns);
    b.group_done(init_idx, PortRef::cell(idx, "done"), Guard::True)?;

    let in_range = b.add_comb_group("in_range");
    let assigns = build_assignments!(b;
        idx_lt["left"] = ? idx["out"];
        idx_lt["right"] = ? bound["out"];
    );
    b.extend_comb_group(in_range, assigns);

    let clear_marker = b.add_group("clear_marker");
    let assigns = build_assignments!(b;
        addr["in"] = ? idx["out"];
        markers["addr0"] = ? addr["out"];
        markers["in"] = ? lo["out"];
        markers["write_en"] = ? hi["out"];
    );
    b.extend_group(clear_marker, assigns);
    b.group_done(clear_marker, PortRef::cell(markers, "write_done"), Guard::True)?;

    let incr_idx = b.add_group("incr_idx");
    let assigns = build_assignments!(b;
        idx_add["left"] = ? idx["out"];
        idx_add["right"] = ? idx_one["out"];
        idx["in"] = ? idx_add["out"];
        idx["write_en"] = ? hi["out"];
    );
    b.extend_group(incr_idx, assigns);
    b.group_done(incr_idx, PortRef::cell(idx, "done"), Guard::True)?;

    let reset_present = b.add_group("reset_present");
    let assigns = build_assignments!(b;
        present_reg["in"] = ? lo["out"];
        present_reg["write_en"] = ? hi["out"];
    );
    b.extend_group(reset_present, assigns);
    b.group_done(reset_present, PortRef::cell(present_reg, "done"), Guard::True)?;

    let clear = Control::seq(vec![
        Control::enable(init_idx),
        Control::while_(
            PortRef::cell(idx_lt, "out"),
            Some(in_range),
            Control::seq(vec![Control::enable(clear_marker), Control::enable(incr_idx)]),
        ),
        Control::enable(reset_present),
    ]);
    b.set_control(Control::if_(
        PortRef::this("set"),
        None,
        Control::enable(set_marker),
        Control::if_(
            PortRef::this("clear"),
            None,
            clear,
            Control::enable(check_marker),
        ),
    ));
    log::debug!("{FILTER}: built for {w}-bit values");
    Ok(comp)
}

/// Control that invokes the filter instance `cell` in `mode` with `value`.
/// The mode inputs are bound to constants so the legality checks can see
/// that only one is requested. A filter built with shared markers must be
/// lent the memory `markers`.
pub fn invoke_filter(
    b: &mut Builder,
    cell: CellIdx,
    mode: FilterMode,
    value: PortRef,
    markers: Option<CellIdx>,
) -> AccelResult<Control> {
    let set = b.constant((mode == FilterMode::Set) as u64, 1)?;
    let clear = b.constant((mode == FilterMode::Clear) as u64, 1)?;
    let mut invoke = Control::invoke(
        cell,
        vec![
            (Id::from("value"), value),
            (Id::from("set"), set),
            (Id::from("clear"), clear),
        ],
    );
    if let Some(markers) = markers {
        invoke = invoke.with_ref_cells(vec![(Id::from("markers"), markers)]);
    }
    Ok(invoke)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accel_ir::Context;
    use accel_opt::passes::WellFormed;

    #[test]
    fn filter_is_well_formed() {
        let mut ctx = Context::new(FILTER);
        let comp = build_filter(&ctx.lib, &FilterConfig::default()).unwrap();
        assert_eq!(
            comp.exclusive_set("set".into()).unwrap(),
            &[Id::from("set"), Id::from("clear")]
        );
        let markers = comp.find_cell("markers").unwrap();
        assert_eq!(comp.cells[markers].get_parameter("SIZE"), Some(64));
        ctx.add_component(comp).unwrap();
        WellFormed::validate(&ctx).unwrap();
    }

    #[test]
    fn width_limits() {
        let lib = LibrarySignatures::default();
        for width in [0, MAX_FILTER_WIDTH + 1] {
            let config = FilterConfig {
                width,
                shared_markers: false,
            };
            assert_eq!(build_filter(&lib, &config).unwrap_err().kind(), "capacity");
        }
    }
}
