use ahash::AHashMap;
use blockscheme_core::{BlockHook, BlockState, Exclusivity, InputPort, OutputPort};

/// A block with one input and one output, used as the minimal fixture
/// for wiring tests: its `update` always succeeds and does nothing
/// observable, analogous to `firewheel_graph::basic_nodes::DummyAudioNode`.
pub struct PassthroughBlock {
    input: InputPort,
    output: OutputPort,
    exclusivity: AHashMap<String, Exclusivity>,
    state: BlockState,
}

impl PassthroughBlock {
    pub fn new() -> Self {
        Self {
            input: "in".into(),
            output: "out".into(),
            exclusivity: AHashMap::default(),
            state: BlockState::Configured,
        }
    }
}

impl Default for PassthroughBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockHook for PassthroughBlock {
    fn period(&self) -> f64 {
        0.0
    }

    fn input_ports(&self) -> Vec<InputPort> {
        vec![self.input.clone()]
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

    fn update(&mut self, _t: f64) -> bool {
        true
    }
}
