//! Signatures of the primitive cells a design can instantiate.
use crate::{Direction, PortDef};
use accel_utils::{AccelResult, Error, Id};
use linked_hash_map::LinkedHashMap;
use smallvec::SmallVec;

/// Widest port the construction model accepts.
pub const MAX_WIDTH: u64 = 64;

/// Width of a port on a primitive definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Width {
    /// The width is a constant.
    Const { value: u64 },
    /// The width is a parameter of the primitive.
    Param { value: Id },
}

impl From<u64> for Width {
    fn from(value: u64) -> Self {
        Width::Const { value }
    }
}

impl From<&str> for Width {
    fn from(value: &str) -> Self {
        Width::Param {
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Width {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Width::Const { value } => write!(f, "{value}"),
            Width::Param { value } => write!(f, "{value}"),
        }
    }
}

/// A port on a primitive definition, before parameters are bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimPort {
    pub name: Id,
    pub width: Width,
    pub direction: Direction,
}

/// Representation of a primitive.
#[derive(Debug, Clone)]
pub struct Primitive {
    /// Name of this primitive.
    pub name: Id,
    /// Parameters for this primitive.
    pub params: Vec<Id>,
    /// The input/output signature for this primitive.
    pub signature: Vec<PrimPort>,
    /// True iff this is a combinational primitive
    pub is_comb: bool,
    /// `(size, index width)` parameter pair for memories: the index width
    /// must be able to address every entry.
    pub index_params: Option<(Id, Id)>,
}

impl Primitive {
    fn new(name: &str, params: &[&str], is_comb: bool) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| Id::from(*p)).collect(),
            signature: vec![],
            is_comb,
            index_params: None,
        }
    }

    fn input<W: Into<Width>>(mut self, name: &str, width: W) -> Self {
        self.signature.push(PrimPort {
            name: name.into(),
            width: width.into(),
            direction: Direction::Input,
        });
        self
    }

    fn output<W: Into<Width>>(mut self, name: &str, width: W) -> Self {
        self.signature.push(PrimPort {
            name: name.into(),
            width: width.into(),
            direction: Direction::Output,
        });
        self
    }

    fn indexed_by(mut self, size: &str, idx: &str) -> Self {
        self.index_params = Some((size.into(), idx.into()));
        self
    }

    /// Bind the parameters and return the binding together with the
    /// resolved port definitions.
    pub fn resolve(
        &self,
        parameters: &[u64],
    ) -> AccelResult<(SmallVec<[(Id, u64); 4]>, Vec<PortDef>)> {
        if self.params.len() != parameters.len() {
            return Err(Error::malformed_structure(format!(
                "Invalid parameter binding for primitive `{}`. Requires {} parameters but provided with {}.",
                self.name,
                self.params.len(),
                parameters.len()
            )));
        }
        let bindings: SmallVec<[(Id, u64); 4]> = self
            .params
            .iter()
            .copied()
            .zip(parameters.iter().copied())
            .collect();
        let lookup = |param: Id| {
            bindings
                .iter()
                .find(|(k, _)| *k == param)
                .map(|(_, v)| *v)
                .ok_or_else(|| {
                    Error::undefined(param, format!("parameter of {}", self.name))
                })
        };

        if let Some((size, idx)) = self.index_params {
            let (size, idx) = (lookup(size)?, lookup(idx)?);
            if size == 0 {
                return Err(Error::capacity(format!(
                    "{} must hold at least one entry",
                    self.name
                )));
            }
            if idx < 64 && (1_u64 << idx) < size {
                return Err(Error::capacity(format!(
                    "{idx}-bit index cannot address {size} entries of {}",
                    self.name
                )));
            }
        }

        let ports = self
            .signature
            .iter()
            .map(|pd| {
                let width = match &pd.width {
                    Width::Const { value } => *value,
                    Width::Param { value } => lookup(*value)?,
                };
                if width == 0 || width > MAX_WIDTH {
                    return Err(Error::capacity(format!(
                        "port `{}' of {} has width {width}, widths must be between 1 and {MAX_WIDTH}",
                        pd.name, self.name
                    )));
                }
                Ok(PortDef::new(pd.name, width, pd.direction))
            })
            .collect::<AccelResult<Vec<_>>>()?;
        Ok((bindings, ports))
    }
}

/// A representation of all the primitive definitions found while building a
/// design.
#[derive(Debug, Clone)]
pub struct LibrarySignatures {
    prims: LinkedHashMap<Id, Primitive>,
}

impl LibrarySignatures {
    /// A library without any primitive definitions.
    pub fn empty() -> Self {
        Self {
            prims: LinkedHashMap::new(),
        }
    }

    pub fn add(&mut self, prim: Primitive) {
        self.prims.insert(prim.name, prim);
    }

    /// Return the [Primitive] associated with the given name if defined, otherwise return None.
    pub fn find_primitive<S>(&self, name: S) -> Option<&Primitive>
    where
        S: Into<Id>,
    {
        self.prims.get(&name.into())
    }

    /// Return the [Primitive] associated to this Id.
    pub fn get_primitive<S>(&self, name: S) -> AccelResult<&Primitive>
    where
        S: Into<Id>,
    {
        let name = name.into();
        self.prims
            .get(&name)
            .ok_or_else(|| Error::undefined(name, "primitive"))
    }

    /// Iterate over all the primitives in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Primitive> {
        self.prims.values()
    }
}

impl Default for LibrarySignatures {
    /// The standard library of registers, memories and combinational
    /// operators.
    fn default() -> Self {
        let mut lib = Self::empty();

        lib.add(
            Primitive::new("std_reg", &["WIDTH"], false)
                .input("in", "WIDTH")
                .input("write_en", 1)
                .output("out", "WIDTH")
                .output("done", 1),
        );
        lib.add(
            Primitive::new("seq_mem_d1", &["WIDTH", "SIZE", "IDX_SIZE"], false)
                .input("addr0", "IDX_SIZE")
                .input("in", "WIDTH")
                .input("read_en", 1)
                .input("write_en", 1)
                .output("out", "WIDTH")
                .output("read_done", 1)
                .output("write_done", 1)
                .indexed_by("SIZE", "IDX_SIZE"),
        );

        lib.add(
            Primitive::new("std_wire", &["WIDTH"], true)
                .input("in", "WIDTH")
                .output("out", "WIDTH"),
        );
        lib.add(
            Primitive::new("std_not", &["WIDTH"], true)
                .input("in", "WIDTH")
                .output("out", "WIDTH"),
        );
        for binop in ["std_add", "std_sub", "std_and", "std_or"] {
            lib.add(
                Primitive::new(binop, &["WIDTH"], true)
                    .input("left", "WIDTH")
                    .input("right", "WIDTH")
                    .output("out", "WIDTH"),
            );
        }
        for cmp in [
            "std_lt", "std_gt", "std_eq", "std_neq", "std_le", "std_ge",
            "std_slt", "std_sgt",
        ] {
            lib.add(
                Primitive::new(cmp, &["WIDTH"], true)
                    .input("left", "WIDTH")
                    .input("right", "WIDTH")
                    .output("out", 1),
            );
        }
        for resize in ["std_pad", "std_slice"] {
            lib.add(
                Primitive::new(resize, &["IN_WIDTH", "OUT_WIDTH"], true)
                    .input("in", "IN_WIDTH")
                    .output("out", "OUT_WIDTH"),
            );
        }
        lib.add(
            Primitive::new(
                "std_cat",
                &["LEFT_WIDTH", "RIGHT_WIDTH", "OUT_WIDTH"],
                true,
            )
            .input("left", "LEFT_WIDTH")
            .input("right", "RIGHT_WIDTH")
            .output("out", "OUT_WIDTH"),
        );

        lib
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_memory() {
        let lib = LibrarySignatures::default();
        let mem = lib.get_primitive("seq_mem_d1").unwrap();
        let (binding, ports) = mem.resolve(&[32, 16, 4]).unwrap();
        assert_eq!(binding.len(), 3);
        let addr = ports.iter().find(|p| p.name == "addr0").unwrap();
        assert_eq!(addr.width, 4);
        assert_eq!(addr.direction, Direction::Input);
    }

    #[test]
    fn narrow_index_is_a_capacity_error() {
        let lib = LibrarySignatures::default();
        let mem = lib.get_primitive("seq_mem_d1").unwrap();
        let err = mem.resolve(&[32, 17, 4]).unwrap_err();
        assert_eq!(err.kind(), "capacity");
    }

    #[test]
    fn wide_ports_rejected() {
        let lib = LibrarySignatures::default();
        let reg = lib.get_primitive("std_reg").unwrap();
        assert_eq!(reg.resolve(&[65]).unwrap_err().kind(), "capacity");
        assert_eq!(
            reg.resolve(&[8, 8]).unwrap_err().kind(),
            "malformed-structure"
        );
        assert!(lib.get_primitive("std_mult").is_err());
    }
}
