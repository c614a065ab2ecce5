use ahash::AHashMap;
use blockscheme_core::{BlockHook, BlockState, Exclusivity, InputPort, OutputPort};

/// A block with no inputs and one output that counts the number of
/// ticks it has been updated while running. Useful for asserting that
/// the update driver visits a block exactly once per tick and in the
/// expected relative order.
pub struct CounterBlock {
    output: OutputPort,
    exclusivity: AHashMap<String, Exclusivity>,
    state: BlockState,
    ticks: u64,
}

impl CounterBlock {
    pub fn new() -> Self {
        Self {
            output: "count".into(),
            exclusivity: AHashMap::default(),
            state: BlockState::Configured,
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl Default for CounterBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockHook for CounterBlock {
    fn period(&self) -> f64 {
        0.0
    }

    fn input_ports(&self) -> Vec<InputPort> {
        Vec::new()
    }

    fn output_ports(&self) -> Vec<OutputPort> {
        vec![self.output.clone()]
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
        self.state = BlockState::Running;
        true
    }

    fn stop(&mut self) -> bool {
        self.state = BlockState::Configured;
        true
    }

    fn init(&mut self, _t: f64) {
        self.ticks = 0;
    }

    fn update(&mut self, _t: f64) -> bool {
        self.ticks += 1;
        true
    }
}
