use std::fmt;

/// The name of an input port on a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputPort(pub String);

impl From<&str> for InputPort {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for InputPort {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for InputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The name of an output port on a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputPort(pub String);

impl From<&str> for OutputPort {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OutputPort {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for OutputPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The exclusivity mode of an input port.
///
/// An `Exclusive` input induces a conflict between any two blocks that
/// both write to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exclusivity {
    #[default]
    Unrestricted,
    Exclusive,
}

/// The run state of a block, as observed through its hook.
///
/// Any state other than `Configured` or `Running` is treated by the
/// enable/disable policy as "not enabled" (`Other`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Configured,
    Running,
    Other,
}

/// The name of a block-local callback registered for one phase of a
/// block's own internal update cycle (read-hardware, compute-estimation,
/// compute-control, write-hardware). The scheme only stores these names;
/// invoking them is the block's own responsibility inside `update`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HookOp(pub Option<String>);

impl From<&str> for HookOp {
    fn from(value: &str) -> Self {
        Self(Some(value.to_string()))
    }
}

/// The uniform interface the scheme requires of every block.
///
/// This is the crate's stand-in for the host component framework's
/// lifecycle contract: everything the scheme needs to know about a
/// block — its ports, its run state, and how to tick it — goes through
/// this trait.
pub trait BlockHook: 'static {
    /// Nominal execution period, in seconds. Informational only; the
    /// scheme does not schedule blocks by period.
    fn period(&self) -> f64;

    /// The block's input ports, in the order the block wants them
    /// reported. The scheme treats this as authoritative for port
    /// existence checks in `connect`/`disconnect`.
    fn input_ports(&self) -> Vec<InputPort>;

    /// The block's output ports.
    fn output_ports(&self) -> Vec<OutputPort>;

    /// Tag an output port with an opaque layer used by external wiring
    /// code. The scheme does not interpret this value.
    #[allow(unused_variables)]
    fn set_output_layer(&mut self, port: &OutputPort, layer: i32) {}

    /// Read back a previously set output layer.
    #[allow(unused_variables)]
    fn get_output_layer(&self, port: &OutputPort) -> Option<i32> {
        None
    }

    /// List every output port currently tagged with `layer`.
    #[allow(unused_variables)]
    fn ports_on_layer(&self, layer: i32) -> Vec<OutputPort> {
        Vec::new()
    }

    /// Set the exclusivity mode of an input port.
    fn set_input_exclusivity(&mut self, port: &InputPort, mode: Exclusivity);

    /// Read the exclusivity mode of an input port. Ports the block did
    /// not declare default to `Unrestricted`.
    fn get_input_exclusivity(&self, port: &InputPort) -> Exclusivity;

    /// Name the block-local callback to invoke during the
    /// read-hardware phase of this block's own `update`.
    #[allow(unused_variables)]
    fn set_read_hw_hook(&mut self, op: HookOp) {}

    /// Name the block-local callback to invoke during the
    /// compute-estimation phase.
    #[allow(unused_variables)]
    fn set_compute_estimation_hook(&mut self, op: HookOp) {}

    /// Name the block-local callback to invoke during the
    /// compute-control phase.
    #[allow(unused_variables)]
    fn set_compute_control_hook(&mut self, op: HookOp) {}

    /// Name the block-local callback to invoke during the
    /// write-hardware phase.
    #[allow(unused_variables)]
    fn set_write_hw_hook(&mut self, op: HookOp) {}

    /// The block's current run state, as observed by the enable/disable
    /// policy.
    fn state(&self) -> BlockState;

    /// Transition the block to the running state. Returning `false`
    /// aborts the enable operation with `StartFailed`.
    fn start(&mut self) -> bool;

    /// Transition the block out of the running state. Returning
    /// `false` aborts the disable operation with `StopFailed`.
    fn stop(&mut self) -> bool;

    /// Called once, with the scheme's current time, the moment the
    /// block transitions into the running state.
    #[allow(unused_variables)]
    fn init(&mut self, t: f64) {}

    /// Called once per tick while the block is running. Returning
    /// `false` signals a `BlockUpdateFailure` for this tick; the
    /// update driver logs it and continues with the remaining blocks.
    fn update(&mut self, t: f64) -> bool;
}
