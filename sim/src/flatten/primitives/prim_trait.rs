use super::stateful::{SeqMemD1, StdReg};
use crate::{errors::SimResult, flatten::structures::PortMap};

/// An enum used to denote whether or not committed updates changed the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Unchanged,
    Changed,
}

impl From<bool> for UpdateStatus {
    fn from(value: bool) -> Self {
        if value {
            Self::Changed
        } else {
            Self::Unchanged
        }
    }
}

impl UpdateStatus {
    #[inline]
    /// If the status is unchanged and other is changed, updates the status of
    /// self to changed, otherwise does nothing
    pub fn update(&mut self, other: Self) {
        if !self.as_bool() && other.as_bool() {
            *self = UpdateStatus::Changed;
        }
    }

    #[inline]
    /// Returns `true` if the update status is [`Changed`][].
    ///
    /// [`Changed`]: UpdateStatus::Changed
    #[must_use]
    pub fn as_bool(&self) -> bool {
        matches!(self, Self::Changed)
    }
}

impl std::ops::BitOr for UpdateStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        if self.as_bool() || rhs.as_bool() {
            UpdateStatus::Changed
        } else {
            UpdateStatus::Unchanged
        }
    }
}

impl std::ops::BitOrAssign for UpdateStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        self.update(rhs)
    }
}

pub trait Primitive {
    /// Recompute the outputs from the current value of the inputs.
    fn exec_comb(&self, _port_map: &mut PortMap) -> UpdateStatus {
        UpdateStatus::Unchanged
    }

    /// The clock edge: commit writes using the settled inputs.
    fn exec_cycle(&mut self, _port_map: &PortMap) -> SimResult<()> {
        Ok(())
    }

    /// Drive the outputs that come from internal state. Called at the start
    /// of every cycle after all ports are cleared.
    fn drive_state(&self, _port_map: &mut PortMap) {}

    /// Returns `true` if this primitive has no internal state
    fn is_combinational(&self) -> bool;

    fn clone_boxed(&self) -> Box<dyn Primitive>;

    fn as_register(&self) -> Option<&StdReg> {
        None
    }

    fn as_memory(&self) -> Option<&SeqMemD1> {
        None
    }

    fn as_memory_mut(&mut self) -> Option<&mut SeqMemD1> {
        None
    }
}
