macro_rules! ports {
    ($base:expr; $( $port:ident : $offset:expr ),+ ) => {
        $(let $port: $crate::flatten::structures::GlobalPortIdx = (accel_idx::IndexRef::index($base) + $offset).into();)+
    }
}

/// Declare a list of ports for the primitive with their offsets given relative
/// to the cell's base port. A vertical bar is used to separate the input and
/// output ports.
///
/// ## NOTE: These must follow the order of the library signature.
///
/// ```text
/// // declare LEFT, RIGHT as input ports and OUT as output port
/// declare_ports![ LEFT: 0, RIGHT: 1 | OUT: 2 ];
/// ```
macro_rules! declare_ports {
    ($( $input_port:ident : $input_offset:literal ),+ $(,)? |  $( $output_port:ident : $output_offset:literal ),+ $(,)? ) => {
        $(
            #[allow(non_upper_case_globals)]
            const $input_port: usize = $input_offset; // this is a usize because it encodes the position of the port!
        )+

        $(
            #[allow(non_upper_case_globals)]
            const $output_port: usize = $output_offset; // this is a usize because it encodes the position of the port!
        )+
    }
}

pub(crate) use declare_ports;
pub(crate) use ports;

macro_rules! comb_primitive {
    ($name:ident$([$($param:ident),+])?
        ( $($port:ident [$port_idx:expr]),+ )
        ->
        ($out_port:ident [$out_port_idx:expr])
        $execute:block) => {
        #[derive(Clone, Debug)]
        #[allow(non_snake_case)]
        pub struct $name {
            $($($param: u32,)+)?
            base_port: $crate::flatten::structures::GlobalPortIdx
        }

        impl $name {
            $crate::flatten::primitives::macros::declare_ports![$($port: $port_idx),+ | $out_port: $out_port_idx];

            #[allow(non_snake_case)]
            pub fn new(
                base_port: $crate::flatten::structures::GlobalPortIdx,
                $($($param: u32,)+)?
            ) -> Self {
                Self {
                    base_port,
                    $($($param,)+)?
                }
            }
        }

        impl $crate::flatten::primitives::Primitive for $name {
            fn exec_comb(
                &self,
                port_map: &mut $crate::flatten::structures::PortMap,
            ) -> $crate::flatten::primitives::prim_trait::UpdateStatus {
                $crate::flatten::primitives::macros::ports![&self.base_port;
                    $($port: Self::$port,)+
                    $out_port: Self::$out_port
                ];

                #[allow(non_snake_case)]
                let exec_func = |$($($param: u32,)+)? $($port: &baa::BitVecValue),+| -> baa::BitVecValue {
                    $execute
                };

                let output = exec_func(
                    $($(self.$param,)*)?
                    $(port_map.value($port),)+
                );
                port_map.write_value($out_port, &output)
            }

            fn is_combinational(&self) -> bool {
                true
            }

            fn clone_boxed(&self) -> Box<dyn $crate::flatten::primitives::Primitive> {
                Box::new(self.clone())
            }
        }
    };
}

pub(crate) use comb_primitive;
