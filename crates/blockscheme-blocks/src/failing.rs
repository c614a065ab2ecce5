use ahash::AHashMap;
use blockscheme_core::{BlockHook, BlockState, Exclusivity, InputPort, OutputPort};

/// A block that can be configured to fail its `start`, `stop`, or
/// `update` call on demand. Used by the policy and update-driver tests
/// to exercise `StartFailed`/`StopFailed`/`BlockUpdateFailure` without
/// relying on a real, fallible block implementation.
pub struct FailingBlock {
    input: InputPort,
    exclusivity: AHashMap<String, Exclusivity>,
    state: BlockState,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub fail_update: bool,
}

impl FailingBlock {
    pub fn new() -> Self {
        Self {
            input: "in".into(),
            exclusivity: AHashMap::default(),
            state: BlockState::Configured,
            fail_start: false,
            fail_stop: false,
            fail_update: false,
        }
    }
}

impl Default for FailingBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockHook for FailingBlock {
    fn period(&self) -> f64 {
        0.0
    }

    fn input_ports(&self) -> Vec<InputPort> {
        vec![self.input.clone()]
    }

    fn output_ports(&self) -> Vec<OutputPort> {
        Vec::new()
    }

    fn set_input_exclusivity(&mut self, port: &InputPort, mode: Exclusivity) {
        self.exclusivity.insert(port.0.clone(), mode);
    }

    fn get_input_exclusivity(&self, port: &InputPort) -> Exclusivity {
        self.exclusivity.get(&port.0).copied().unwrap_or_default()
    }

    fn state(&self) -> BlockState {
        self.state
    }

    fn start(&mut self) -> bool {
        if self.fail_start {
            return false;
        }
        self.state = BlockState::Running;
        true
    }

    fn stop(&mut self) -> bool {
        if self.fail_stop {
            return false;
        }
        self.state = BlockState::Configured;
        true
    }

    fn update(&mut self, _t: f64) -> bool {
        !self.fail_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fails_start_on_demand() {
        let mut b = FailingBlock::new();
        b.fail_start = true;
        assert!(!b.start());
        assert_eq!(b.state(), BlockState::Configured);
    }

    #[test]
    fn fails_update_on_demand() {
        let mut b = FailingBlock::new();
        b.start();
        b.fail_update = true;
        assert!(!b.update(0.0));
    }
}
