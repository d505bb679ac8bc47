/// Add primitives and constants to the component and `let`-bind their
/// indices. Errors from the builder are propagated with `?`.
/// Example:
/// ```
/// # use accel_ir::{structure, Builder, Component, LibrarySignatures};
/// # fn main() -> accel_utils::AccelResult<()> {
/// # let lib = LibrarySignatures::default();
/// # let mut comp = Component::new("main", vec![]);
/// # let mut builder = Builder::new(&mut comp, &lib);
/// structure!(builder;
///     let signal_on = constant(1, 32); // Define 32-bit constant 1.
///     let fsm_reg = prim std_reg(32);  // Define 32-bit register.
/// );
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! structure {
    ($builder:expr;) => { };

    ($builder:expr;
     let $var:ident = prim $comp:ident( $($n:expr),* ); $($tail:tt)*) => {
        let $var = $builder.add_primitive(
            stringify!($var),
            stringify!($comp),
            &[$($n),*]
        )?;
        $crate::structure!($builder; $($tail)*)
    };

    ($builder:expr;
     let $var:ident = constant($v:expr, $w:expr); $($tail:tt)*) => {
        let $var = $builder.add_constant($v, $w)?;
        $crate::structure!($builder; $($tail)*)
    }
}

/// Build guarded assignment statements and return a vector containing them.
/// Ports are written `cell["port"]`, or `this["port"]` for the signature of
/// the component. Guards are `clone`d.
/// ```
/// # use accel_ir::{build_assignments, structure, Builder, Component, Guard, LibrarySignatures, PortRef};
/// # fn main() -> accel_utils::AccelResult<()> {
/// # let lib = LibrarySignatures::default();
/// # let mut comp = Component::new("main", vec![]);
/// # let mut builder = Builder::new(&mut comp, &lib);
/// structure!(builder;
///     let on = constant(1, 1);
///     let r = prim std_reg(1);
/// );
/// let guard = Guard::port(PortRef::cell(r, "out"));
/// let assigns = build_assignments!(builder;
///     r["write_en"] = ? on["out"]; // no guard
///     r["in"] = guard ? on["out"];
/// );
/// assert_eq!(assigns.len(), 2);
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! build_assignments {
    (@port this[$port:expr]) => {
        $crate::PortRef::this($port)
    };
    (@port $node:ident[$port:expr]) => {
        $crate::PortRef::cell($node, $port)
    };
    (@guard) => {
        $crate::Guard::True
    };
    (@guard $guard:ident) => {
        $guard.clone()
    };

    ($builder:expr;
     $($dst_node:ident[$dst_port:expr] =
         $($guard:ident)? ?
         $src_node:ident[$src_port:expr];)*) => {
        vec![$(
            $builder.build_assignment(
                $crate::build_assignments!(@port $dst_node[$dst_port]),
                $crate::build_assignments!(@port $src_node[$src_port]),
                $crate::build_assignments!(@guard $($guard)?),
            )?
        ),*]
    };
}
