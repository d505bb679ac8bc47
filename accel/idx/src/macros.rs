#[macro_export]
/// Implements [`IndexRef`](crate::IndexRef) for a tuple struct wrapping a
/// [`u32`], along with a conversion from `usize`.
macro_rules! impl_index {
    ($struct_name: ident) => {
        impl $crate::IndexRef for $struct_name {
            fn index(&self) -> usize {
                self.0 as usize
            }

            fn new(input: usize) -> Self {
                Self(input as u32)
            }
        }

        impl From<usize> for $struct_name {
            fn from(input: usize) -> Self {
                $crate::IndexRef::new(input)
            }
        }
    };
}
