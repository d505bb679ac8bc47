use bon::Builder;

// this can be a copy type because it's just a couple of flags
#[derive(Debug, Default, Clone, Copy, Builder)]
/// Configuration struct which controls simulation behavior
pub struct SimConfig {
    /// give up with [`crate::SimError::Stalled`] after this many cycles
    pub max_cycles: Option<u64>,
    /// simulate without running the legality checks first
    #[builder(default)]
    pub skip_verification: bool,
}
