use super::{
    Primitive,
    macros::{declare_ports, ports},
};
use crate::{
    errors::{SimError, SimResult},
    flatten::structures::{GlobalPortIdx, PortMap},
};
use baa::{BitVecOps, BitVecValue, WidthInt};

#[derive(Clone, Debug)]
pub struct StdReg {
    base_port: GlobalPortIdx,
    value: BitVecValue,
    done_is_high: bool,
}

impl StdReg {
    declare_ports![IN: 0, WRITE_EN: 1, | OUT: 2, DONE: 3];

    pub fn new(base_port: GlobalPortIdx, width: WidthInt) -> Self {
        Self {
            base_port,
            value: BitVecValue::zero(width),
            done_is_high: false,
        }
    }

    pub fn value(&self) -> &BitVecValue {
        &self.value
    }
}

impl Primitive for StdReg {
    fn exec_cycle(&mut self, port_map: &PortMap) -> SimResult<()> {
        ports![&self.base_port;
            input: Self::IN,
            write_en: Self::WRITE_EN
        ];

        self.done_is_high = port_map.read_bool(write_en);
        if self.done_is_high {
            self.value = port_map.value(input).clone();
        }
        Ok(())
    }

    fn drive_state(&self, port_map: &mut PortMap) {
        ports![&self.base_port; out: Self::OUT, done: Self::DONE];
        port_map.write_value(out, &self.value);
        port_map.write_bool(done, self.done_is_high);
    }

    fn is_combinational(&self) -> bool {
        false
    }

    fn clone_boxed(&self) -> Box<dyn Primitive> {
        Box::new(self.clone())
    }

    fn as_register(&self) -> Option<&StdReg> {
        Some(self)
    }
}

/// A one-dimensional memory with a single port. Reads and writes take effect
/// at the clock edge; `out` holds the last value read.
#[derive(Clone, Debug)]
pub struct SeqMemD1 {
    base_port: GlobalPortIdx,
    name: String,
    width: WidthInt,
    data: Vec<BitVecValue>,
    out: BitVecValue,
    read_done: bool,
    write_done: bool,
    /// Number of writes each address has received since the start of the
    /// simulation.
    write_counts: Vec<u64>,
}

impl SeqMemD1 {
    declare_ports![ADDR0: 0, IN: 1, READ_EN: 2, WRITE_EN: 3, | OUT: 4, READ_DONE: 5, WRITE_DONE: 6];

    pub fn new<S: ToString>(
        base_port: GlobalPortIdx,
        name: S,
        width: WidthInt,
        size: usize,
    ) -> Self {
        Self {
            base_port,
            name: name.to_string(),
            width,
            data: vec![BitVecValue::zero(width); size],
            out: BitVecValue::zero(width),
            read_done: false,
            write_done: false,
            write_counts: vec![0; size],
        }
    }

    pub fn width(&self) -> WidthInt {
        self.width
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn contents(&self) -> Vec<u64> {
        self.data
            .iter()
            .map(|v| v.to_u64().unwrap_or_default())
            .collect()
    }

    pub fn write_counts(&self) -> &[u64] {
        &self.write_counts
    }

    /// Overwrite the contents starting at address zero. The remaining
    /// entries are zeroed.
    pub fn load(&mut self, values: &[u64]) -> SimResult<()> {
        if values.len() > self.size() {
            return Err(SimError::IncorrectMemorySize {
                memory: self.name.clone(),
                size: self.size(),
                given: values.len(),
            }
            .into());
        }
        for (idx, slot) in self.data.iter_mut().enumerate() {
            let val = values.get(idx).copied().unwrap_or_default();
            if accel_utils::math::bits_for_value(val) > self.width as u64 {
                return Err(SimError::ValueOutOfRange {
                    memory: self.name.clone(),
                    value: val,
                    width: self.width as u64,
                }
                .into());
            }
            *slot = BitVecValue::from_u64(val, self.width);
        }
        Ok(())
    }

    fn address(&self, port_map: &PortMap, addr: GlobalPortIdx) -> SimResult<usize> {
        let idx = port_map.read(addr);
        if idx as usize >= self.size() {
            return Err(SimError::InvalidMemoryAccess {
                memory: self.name.clone(),
                addr: idx,
                size: self.size(),
            }
            .into());
        }
        Ok(idx as usize)
    }
}

impl Primitive for SeqMemD1 {
    fn exec_cycle(&mut self, port_map: &PortMap) -> SimResult<()> {
        ports![&self.base_port;
            addr0: Self::ADDR0,
            input: Self::IN,
            read_en: Self::READ_EN,
            write_en: Self::WRITE_EN
        ];

        self.read_done = port_map.read_bool(read_en);
        self.write_done = port_map.read_bool(write_en);
        if self.read_done {
            // reads observe the contents before this edge's write
            let idx = self.address(port_map, addr0)?;
            self.out = self.data[idx].clone();
        }
        if self.write_done {
            let idx = self.address(port_map, addr0)?;
            self.data[idx] = port_map.value(input).clone();
            self.write_counts[idx] += 1;
        }
        Ok(())
    }

    fn drive_state(&self, port_map: &mut PortMap) {
        ports![&self.base_port;
            out: Self::OUT,
            read_done: Self::READ_DONE,
            write_done: Self::WRITE_DONE
        ];
        port_map.write_value(out, &self.out);
        port_map.write_bool(read_done, self.read_done);
        port_map.write_bool(write_done, self.write_done);
    }

    fn is_combinational(&self) -> bool {
        false
    }

    fn clone_boxed(&self) -> Box<dyn Primitive> {
        Box::new(self.clone())
    }

    fn as_memory(&self) -> Option<&SeqMemD1> {
        Some(self)
    }

    fn as_memory_mut(&mut self) -> Option<&mut SeqMemD1> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> (PortMap, SeqMemD1) {
        let mut map = PortMap::new();
        let base = map.push(2);
        for w in [8, 1, 1, 8, 1, 1] {
            map.push(w);
        }
        (map, SeqMemD1::new(base, "mem", 8, 4))
    }

    #[test]
    fn register_done_follows_write() {
        let mut map = PortMap::new();
        let base = map.push(8);
        for w in [1, 8, 1] {
            map.push(w);
        }
        let mut reg = StdReg::new(base, 8);
        ports![&base; input: 0, write_en: 1, out: 2, done: 3];
        map.write(input, 42);
        map.write(write_en, 1);
        reg.exec_cycle(&map).unwrap();
        map.clear();
        reg.drive_state(&mut map);
        assert_eq!(map.read(out), 42);
        assert!(map.read_bool(done));

        reg.exec_cycle(&map).unwrap();
        map.clear();
        reg.drive_state(&mut map);
        assert_eq!(map.read(out), 42);
        assert!(!map.read_bool(done));
    }

    #[test]
    fn memory_read_write() {
        let (mut map, mut mem) = memory();
        mem.load(&[1, 2]).unwrap();
        assert_eq!(mem.contents(), vec![1, 2, 0, 0]);
        ports![&mem.base_port; addr0: 0, input: 1, read_en: 2, write_en: 3, out: 4, read_done: 5, write_done: 6];

        map.write(addr0, 1);
        map.write(read_en, 1);
        mem.exec_cycle(&map).unwrap();
        mem.drive_state(&mut map);
        assert_eq!(map.read(out), 2);
        assert!(map.read_bool(read_done));
        assert!(!map.read_bool(write_done));

        map.clear();
        map.write(addr0, 3);
        map.write(input, 7);
        map.write(write_en, 1);
        mem.exec_cycle(&map).unwrap();
        mem.drive_state(&mut map);
        assert!(map.read_bool(write_done));
        assert!(!map.read_bool(read_done));
        // the latched read value is kept
        assert_eq!(map.read(out), 2);
        assert_eq!(mem.contents(), vec![1, 2, 0, 7]);
        assert_eq!(mem.write_counts(), &[0, 0, 0, 1]);
    }

    #[test]
    fn bad_data_rejected() {
        let (_, mut mem) = memory();
        let err = mem.load(&[0; 5]).unwrap_err();
        assert!(matches!(*err, SimError::IncorrectMemorySize { given: 5, .. }));
        let err = mem.load(&[256]).unwrap_err();
        assert!(matches!(*err, SimError::ValueOutOfRange { value: 256, .. }));
    }
}
