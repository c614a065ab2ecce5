//! The public entry point: `Scheme` ties the graph model, conflict
//! analysis, group registry, latching, and the enable/disable/switch
//! policy together behind the operations a host embeds between ticks.
//!
//! Grounded on `conman::Scheme` (the original C++ scheme this crate
//! reimplements) for the latching and enable/disable/switch policy
//! bodies, and on `firewheel_graph::AudioGraph` for the
//! config/capacity/logging conventions (`SchemeConfig` mirrors
//! `AudioGraphConfig`).

use ahash::AHashSet;
use blockscheme_core::{BlockHook, BlockState, InputPort, OutputPort};

use crate::compiler;
use crate::conflict::ConflictGraph;
use crate::error::SchemeError;
use crate::graph::{BlockId, Graph};
use crate::groups::GroupRegistry;
use crate::{cycles, MAX_CYCLE_SEARCH_VERTICES_DEFAULT};

/// Construction-time tuning for a [`Scheme`], mirroring the role of
/// `firewheel_graph::AudioGraphConfig` in `AudioGraph::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeConfig {
    pub initial_block_capacity: usize,
    pub initial_edge_capacity: usize,
    /// Above this many blocks, cycle enumeration (`get_flow_cycles`,
    /// `get_execution_cycles`, `min_latch_count`/`max_latch_count`)
    /// only searches starting from the first this-many blocks in
    /// insertion order and logs a warning that the result may be
    /// incomplete. Topological sort and `executable()` are unaffected;
    /// they run Kahn's algorithm, which is always linear.
    pub cycle_search_vertex_cap: usize,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            initial_block_capacity: 64,
            initial_edge_capacity: 256,
            cycle_search_vertex_cap: MAX_CYCLE_SEARCH_VERTICES_DEFAULT,
        }
    }
}

/// The outcome of one `Scheme::update` tick: which blocks (if any)
/// failed their `update` call. Failures do not abort the tick; the
/// driver logs each one and keeps going (C8).
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub failed_blocks: Vec<String>,
}

impl UpdateReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed_blocks.is_empty()
    }
}

/// The graph-management and scheduling subsystem described by this
/// crate. Single-threaded, `&mut self` throughout, with no internal
/// locking or async: a host is expected to own one `Scheme` and call
/// into it between ticks, the same way it owns and drives an
/// `AudioGraph`.
pub struct Scheme {
    graph: Graph,
    rcg: ConflictGraph,
    groups: GroupRegistry,
    order: Vec<BlockId>,
    cycle_search_vertex_cap: usize,
    last_update_time: f64,
}

impl Scheme {
    pub fn new(config: SchemeConfig) -> Self {
        Self {
            graph: Graph::new(config.initial_block_capacity, config.initial_edge_capacity),
            rcg: ConflictGraph::new(),
            groups: GroupRegistry::new(),
            order: Vec::new(),
            cycle_search_vertex_cap: config.cycle_search_vertex_cap,
            last_update_time: 0.0,
        }
    }

    fn resolve_block(&self, name: &str) -> Result<BlockId, SchemeError> {
        self.graph
            .id_for_name(name)
            .ok_or_else(|| SchemeError::NotInScheme(name.to_string()))
    }

    fn is_block(&self, name: &str) -> bool {
        self.graph.contains_name(name)
    }

    fn recompute_order(&mut self) -> Result<(), SchemeError> {
        self.order = compiler::sort_topologically(&self.graph)?;
        Ok(())
    }

    // ---- C1/C2: blocks -------------------------------------------------

    /// Register a new block under `name`. Fails with `NameCollision` if
    /// `name` is already taken by a block or a group.
    pub fn add_block(&mut self, name: &str, hook: Box<dyn BlockHook>) -> Result<BlockId, SchemeError> {
        if self.is_block(name) || self.groups.has_group(name) {
            return Err(SchemeError::NameCollision(name.to_string()));
        }

        let id = self.graph.insert_block(name.to_string(), hook);
        self.rcg.recompute(&self.graph);
        // An isolated new vertex can never introduce a cycle.
        self.recompute_order()
            .expect("adding an isolated block cannot introduce a cycle");
        log::info!("added block \"{}\"", name);
        Ok(id)
    }

    /// Convenience form standing in for the host's "look this block up
    /// in its own registry, then add it" contract. Fails with
    /// `MissingHook` if `lookup` reports nothing under `name`.
    pub fn add_block_by_name(
        &mut self,
        name: &str,
        lookup: impl FnOnce(&str) -> Option<Box<dyn BlockHook>>,
    ) -> Result<BlockId, SchemeError> {
        let hook = lookup(name).ok_or_else(|| SchemeError::MissingHook(name.to_string()))?;
        self.add_block(name, hook)
    }

    pub fn remove_block(&mut self, name: &str) -> Result<(), SchemeError> {
        let id = self.resolve_block(name)?;
        self.graph.remove_block(id);
        self.rcg.remove_block(id);
        self.recompute_order()
            .expect("removing a block and its edges cannot introduce a cycle");
        log::info!("removed block \"{}\"", name);
        Ok(())
    }

    /// Every block name, in insertion order.
    pub fn get_blocks(&self) -> Vec<&str> {
        self.graph
            .blocks_in_insertion_order()
            .into_iter()
            .filter_map(|id| self.graph.block(id))
            .map(|b| b.name.as_str())
            .collect()
    }

    // ---- C3: topology maintenance ---------------------------------------

    /// `connect` never rejects a cycle-introducing edge: a cycle can be
    /// wired up freely and only becomes a scheduling problem once
    /// something tries to use the order (`executable()` reports it,
    /// `update` simply runs whatever order was last cached).
    /// `latch_connection` is the tool for resolving it. If the edge set
    /// changed, the cached order is recomputed and kept as the best
    /// available approximation even when the graph is no longer a DAG
    /// (`recompute_order` leaves the previous order in place on
    /// failure).
    pub fn connect(
        &mut self,
        src: &str,
        src_port: impl Into<OutputPort>,
        dst: &str,
        dst_port: impl Into<InputPort>,
    ) -> Result<(), SchemeError> {
        let src_id = self.resolve_block(src)?;
        let dst_id = self.resolve_block(dst)?;
        let src_port = src_port.into();
        let dst_port = dst_port.into();

        let (_, is_new) = self.graph.connect(src_id, src_port.clone(), dst_id, dst_port.clone())?;

        self.rcg.recompute(&self.graph);
        if is_new {
            if let Err(cycle) = self.recompute_order() {
                log::warn!(
                    "connect(\"{}\".{} -> \"{}\".{}) introduced a cycle: {}",
                    src,
                    src_port,
                    dst,
                    dst_port,
                    cycle
                );
            }
        }
        log::debug!("connected \"{}\".{} -> \"{}\".{}", src, src_port, dst, dst_port);
        Ok(())
    }

    pub fn disconnect(
        &mut self,
        src: &str,
        src_port: impl Into<OutputPort>,
        dst: &str,
        dst_port: impl Into<InputPort>,
    ) -> Result<(), SchemeError> {
        let src_id = self.resolve_block(src)?;
        let dst_id = self.resolve_block(dst)?;
        let src_port = src_port.into();
        let dst_port = dst_port.into();

        let changed = self.graph.disconnect(src_id, &src_port, dst_id, &dst_port);
        if changed {
            self.rcg.recompute(&self.graph);
            self.recompute_order()
                .expect("removing an edge cannot introduce a cycle");
            log::debug!("disconnected \"{}\".{} -> \"{}\".{}", src, src_port, dst, dst_port);
        }
        Ok(())
    }

    /// Bulk form: apply `connect` semantics for each tuple whose
    /// endpoints are current scheme vertices, skipping the rest, then
    /// recompute the order once at the end.
    pub fn sync_connections<'a, I>(&mut self, tuples: I) -> Result<(), SchemeError>
    where
        I: IntoIterator<Item = (&'a str, OutputPort, &'a str, InputPort)>,
    {
        let mut any_new = false;
        for (src, src_port, dst, dst_port) in tuples {
            let (Some(src_id), Some(dst_id)) =
                (self.graph.id_for_name(src), self.graph.id_for_name(dst))
            else {
                continue;
            };
            match self.graph.connect(src_id, src_port, dst_id, dst_port) {
                Ok((_, is_new)) => any_new |= is_new,
                Err(err) => log::warn!("sync_connections: skipping {} -> {}: {}", src, dst, err),
            }
        }

        self.rcg.recompute(&self.graph);
        if any_new {
            if let Err(err) = self.recompute_order() {
                log::warn!("sync_connections introduced a cycle: {}", err);
            }
        }
        Ok(())
    }

    // ---- C5: groups ------------------------------------------------------

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.has_group(name)
    }

    pub fn add_group(&mut self, name: &str) -> Result<(), SchemeError> {
        if self.is_block(name) {
            return Err(SchemeError::NameCollision(name.to_string()));
        }
        self.groups.add_group(name);
        Ok(())
    }

    pub fn set_group(&mut self, name: &str, members: &[&str]) -> Result<(), SchemeError> {
        if self.is_block(name) {
            return Err(SchemeError::NameCollision(name.to_string()));
        }
        for member in members {
            // `*member == name` covers a group naming itself among its
            // own members: the group is about to exist, so this is
            // resolvable even though it isn't registered yet. Expansion
            // breaks the resulting self-reference via its visited set.
            if *member != name && !self.is_block(member) && !self.groups.has_group(member) {
                return Err(SchemeError::UnknownMember {
                    group: name.to_string(),
                    member: member.to_string(),
                });
            }
        }
        self.groups
            .set_group(name, members.iter().map(|s| s.to_string()).collect());
        Ok(())
    }

    pub fn add_to_group(&mut self, name: &str, member: &str) -> Result<(), SchemeError> {
        if !self.is_block(member) && !self.groups.has_group(member) {
            return Err(SchemeError::UnknownMember {
                group: name.to_string(),
                member: member.to_string(),
            });
        }
        self.groups
            .add_to_group(name, member.to_string())
            .map(|_| ())
            .ok_or_else(|| SchemeError::UnknownName(name.to_string()))
    }

    pub fn remove_from_group(&mut self, name: &str, member: &str) {
        self.groups.remove_from_group(name, member);
    }

    pub fn disband_group(&mut self, name: &str) {
        self.groups.disband_group(name);
    }

    pub fn get_group_members(&self, name: &str) -> Result<AHashSet<String>, SchemeError> {
        self.groups.expand(name, &|n| self.is_block(n))
    }

    // ---- C6: latching ------------------------------------------------------

    /// Mark (or unmark) the single connection `source -> sink` as
    /// explicitly latched. Self-loops are implicitly latched and
    /// succeed without touching the graph.
    pub fn latch_connection(&mut self, source: &str, sink: &str, latch: bool) -> Result<bool, SchemeError> {
        if source == sink {
            return Ok(true);
        }
        let src_id = self.resolve_block(source)?;
        let dst_id = self.resolve_block(sink)?;

        let Some(changed) = self.graph.set_edge_latch(src_id, dst_id, latch) else {
            return Err(SchemeError::NoSuchEdge {
                edge_source: source.to_string(),
                sink: sink.to_string(),
            });
        };

        if changed && !latch {
            // Un-latching can reintroduce a cycle that was previously
            // broken by this latch; re-verify and roll back if so.
            if let Err(cycle) = compiler::sort_topologically(&self.graph) {
                self.graph.set_edge_latch(src_id, dst_id, true);
                return Err(SchemeError::CyclicSchedule(cycle));
            }
        }

        self.recompute_order()
            .expect("topology just verified acyclic");
        Ok(changed)
    }

    /// Non-strict convenience over `latch_connection`: on a missing
    /// edge, succeed silently instead of failing with `NoSuchEdge`.
    fn latch_connection_lenient(
        &mut self,
        source: &str,
        sink: &str,
        latch: bool,
        strict: bool,
    ) -> Result<bool, SchemeError> {
        match self.latch_connection(source, sink, latch) {
            Ok(changed) => Ok(changed),
            Err(SchemeError::NoSuchEdge { .. }) if !strict => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Set `latched_input` on every block `sink_spec` expands to (a
    /// block or group name), then re-derive every edge touching them.
    /// Un-latching can reintroduce a cycle that the latch was
    /// suppressing; if it does, every touched block's flag is restored
    /// and the operation fails with `CyclicSchedule`.
    pub fn latch_inputs(&mut self, sink_spec: &str, latch: bool) -> Result<(), SchemeError> {
        let members = self.get_group_members(sink_spec)?;
        let mut previous = Vec::with_capacity(members.len());
        for member in &members {
            let id = self.resolve_block(member)?;
            previous.push((id, self.graph.block(id).unwrap().latched_input));
            self.graph.set_block_latch(id, Some(latch), None);
        }

        if !latch {
            if let Err(cycle) = compiler::sort_topologically(&self.graph) {
                for (id, was) in previous {
                    self.graph.set_block_latch(id, Some(was), None);
                }
                return Err(SchemeError::CyclicSchedule(cycle));
            }
        }

        self.recompute_order()
            .expect("topology just verified acyclic");
        Ok(())
    }

    pub fn latch_outputs(&mut self, source_spec: &str, latch: bool) -> Result<(), SchemeError> {
        let members = self.get_group_members(source_spec)?;
        let mut previous = Vec::with_capacity(members.len());
        for member in &members {
            let id = self.resolve_block(member)?;
            previous.push((id, self.graph.block(id).unwrap().latched_output));
            self.graph.set_block_latch(id, None, Some(latch));
        }

        if !latch {
            if let Err(cycle) = compiler::sort_topologically(&self.graph) {
                for (id, was) in previous {
                    self.graph.set_block_latch(id, None, Some(was));
                }
                return Err(SchemeError::CyclicSchedule(cycle));
            }
        }

        self.recompute_order()
            .expect("topology just verified acyclic");
        Ok(())
    }

    /// Cartesian product of `latch_connection` over two group-or-block
    /// specs.
    pub fn latch(
        &mut self,
        sources: &str,
        sinks: &str,
        latch: bool,
        strict: bool,
    ) -> Result<bool, SchemeError> {
        let src_members = self.get_group_members(sources)?;
        let sink_members = self.get_group_members(sinks)?;

        let mut all_ok = true;
        for src in &src_members {
            for sink in &sink_members {
                match self.latch_connection_lenient(src, sink, latch, strict) {
                    Ok(_) => {}
                    Err(err) => {
                        all_ok = false;
                        if strict {
                            return Err(err);
                        }
                        log::warn!("latch(\"{}\" -> \"{}\"): {}", src, sink, err);
                    }
                }
            }
        }
        Ok(all_ok)
    }

    // ---- C7: enable/disable/switch -----------------------------------------

    fn running_conflicts(&self, id: BlockId) -> Vec<BlockId> {
        self.rcg
            .neighbors(id)
            .filter(|&n| {
                self.graph
                    .block(n)
                    .map(|b| b.hook.state() == BlockState::Running)
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn enable_block(&mut self, name: &str, force: bool) -> Result<bool, SchemeError> {
        if self.groups.has_group(name) {
            let members: Vec<String> = self.get_group_members(name)?.into_iter().collect();
            return self.enable_blocks(&members, true, force);
        }

        let id = self.resolve_block(name)?;
        let state = self.graph.block(id).unwrap().hook.state();
        if !matches!(state, BlockState::Configured | BlockState::Running) {
            return Err(SchemeError::NotConfigured(id));
        }
        if state == BlockState::Running {
            return Ok(true);
        }

        for conflict in self.running_conflicts(id) {
            if force {
                let conflict_name = self.graph.block(conflict).unwrap().name.clone();
                self.disable_block(&conflict_name)?;
            } else {
                return Err(SchemeError::Conflict(id));
            }
        }

        let block = self.graph.block_mut(id).unwrap();
        block.hook.init(self.last_update_time);
        if !block.hook.start() {
            return Err(SchemeError::StartFailed(id));
        }
        log::info!("enabled block \"{}\"", name);
        Ok(true)
    }

    pub fn disable_block(&mut self, name: &str) -> Result<bool, SchemeError> {
        if self.groups.has_group(name) {
            let members: Vec<String> = self.get_group_members(name)?.into_iter().collect();
            return self.disable_blocks(&members, true);
        }

        let id = self.resolve_block(name)?;
        let block = self.graph.block_mut(id).unwrap();
        if block.hook.state() != BlockState::Running {
            return Ok(true);
        }
        if !block.hook.stop() {
            return Err(SchemeError::StopFailed(id));
        }
        log::info!("disabled block \"{}\"", name);
        Ok(true)
    }

    pub fn enable_blocks(&mut self, names: &[String], strict: bool, force: bool) -> Result<bool, SchemeError> {
        if !force {
            for name in names {
                let id = self.resolve_block(name)?;
                if !self.running_conflicts(id).is_empty() {
                    return Err(SchemeError::Conflict(id));
                }
            }
        }

        let mut success = true;
        for name in names {
            match self.enable_block(name, force) {
                Ok(ok) => success &= ok,
                Err(err) => {
                    if strict {
                        return Err(err);
                    }
                    success = false;
                    log::warn!("enable_blocks: \"{}\": {}", name, err);
                }
            }
        }
        Ok(success)
    }

    pub fn disable_blocks(&mut self, names: &[String], strict: bool) -> Result<bool, SchemeError> {
        let mut success = true;
        for name in names {
            match self.disable_block(name) {
                Ok(ok) => success &= ok,
                Err(err) => {
                    if strict {
                        return Err(err);
                    }
                    success = false;
                    log::warn!("disable_blocks: \"{}\": {}", name, err);
                }
            }
        }
        Ok(success)
    }

    fn disable_all(&mut self, strict: bool) -> Result<bool, SchemeError> {
        let names: Vec<String> = self.get_blocks().into_iter().map(String::from).collect();
        self.disable_blocks(&names, strict)
    }

    /// Disable `disable_list`, then enable `enable_list`. Both phases
    /// run to completion even if the first fails; the result is the
    /// logical AND of both, using `&` rather than `&&` so the enable
    /// phase is never short-circuited away.
    pub fn switch_blocks(
        &mut self,
        disable_list: &[String],
        enable_list: &[String],
        strict: bool,
        force: bool,
    ) -> Result<bool, SchemeError> {
        let disabled = self.disable_blocks(disable_list, strict)?;
        let enabled = self.enable_blocks(enable_list, strict, force)?;
        Ok(disabled & enabled)
    }

    pub fn set_enabled_blocks(&mut self, names: &[String], strict: bool) -> Result<bool, SchemeError> {
        let disabled = self.disable_all(strict)?;
        let enabled = self.enable_blocks(names, strict, false)?;
        Ok(disabled & enabled)
    }

    // ---- C8: update driver -------------------------------------------------

    pub fn update(&mut self, now: f64) -> UpdateReport {
        let _period = now - self.last_update_time;
        self.last_update_time = now;

        let mut report = UpdateReport::default();
        for &id in &self.order {
            let Some(block) = self.graph.block_mut(id) else {
                continue;
            };
            if block.hook.state() != BlockState::Running {
                continue;
            }
            if !block.hook.update(now) {
                log::error!("block \"{}\" failed its update at t={}", block.name, now);
                report.failed_blocks.push(block.name.clone());
            }
        }
        report
    }

    // ---- C9: introspection ---------------------------------------------

    pub fn executable(&self) -> bool {
        !compiler::has_cycle(&self.graph)
    }

    pub fn get_flow_cycles(&self) -> Vec<Vec<String>> {
        let result = cycles::get_flow_cycles(&self.graph, self.cycle_search_vertex_cap);
        if result.truncated {
            log::warn!(
                "get_flow_cycles: search capped at {} vertices, result may be incomplete",
                self.cycle_search_vertex_cap
            );
        }
        self.names_of(result.cycles)
    }

    pub fn get_execution_cycles(&self) -> Vec<Vec<String>> {
        let result = cycles::get_execution_cycles(&self.graph, self.cycle_search_vertex_cap);
        if result.truncated {
            log::warn!(
                "get_execution_cycles: search capped at {} vertices, result may be incomplete",
                self.cycle_search_vertex_cap
            );
        }
        self.names_of(result.cycles)
    }

    fn names_of(&self, paths: Vec<Vec<BlockId>>) -> Vec<Vec<String>> {
        paths
            .into_iter()
            .map(|path| {
                path.into_iter()
                    .filter_map(|id| self.graph.block(id).map(|b| b.name.clone()))
                    .collect()
            })
            .collect()
    }

    pub fn latch_count(&self, path: &[&str]) -> usize {
        let ids: Vec<BlockId> = path
            .iter()
            .filter_map(|name| self.graph.id_for_name(name))
            .collect();
        if ids.len() != path.len() {
            return 0;
        }
        cycles::latch_count(&self.graph, &ids)
    }

    pub fn min_latch_count(&self) -> usize {
        cycles::latch_count_bounds(&self.graph, self.cycle_search_vertex_cap).0
    }

    pub fn max_latch_count(&self) -> usize {
        cycles::latch_count_bounds(&self.graph, self.cycle_search_vertex_cap).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap as StdAHashMap;
    use blockscheme_core::Exclusivity;

    struct StubHook {
        inputs: Vec<InputPort>,
        outputs: Vec<OutputPort>,
        exclusivity: StdAHashMap<String, Exclusivity>,
        state: BlockState,
        fail_stop: bool,
    }

    impl StubHook {
        fn new(inputs: &[&str], outputs: &[&str]) -> Self {
            Self {
                inputs: inputs.iter().map(|s| InputPort::from(*s)).collect(),
                outputs: outputs.iter().map(|s| OutputPort::from(*s)).collect(),
                exclusivity: StdAHashMap::default(),
                state: BlockState::Configured,
                fail_stop: false,
            }
        }
    }

    impl BlockHook for StubHook {
        fn period(&self) -> f64 {
            0.0
        }
        fn input_ports(&self) -> Vec<InputPort> {
            self.inputs.clone()
        }
        fn output_ports(&self) -> Vec<OutputPort> {
            self.outputs.clone()
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
            if self.fail_stop {
                return false;
            }
            self.state = BlockState::Configured;
            true
        }
        fn update(&mut self, _t: f64) -> bool {
            true
        }
    }

    fn hook(inputs: &[&str], outputs: &[&str]) -> Box<dyn BlockHook> {
        Box::new(StubHook::new(inputs, outputs))
    }

    #[test]
    fn empty_scheme_is_trivially_executable() {
        let s = Scheme::new(SchemeConfig::default());
        assert!(s.get_blocks().is_empty());
        assert!(s.executable());
        assert_eq!(s.latch_count(&[]), 0);
        assert_eq!(s.max_latch_count(), 0);
    }

    // MissingHook and NameCollision stand in for the original conman
    // scheme's "invalid block"/"not a peer" failure modes.
    #[test]
    fn add_block_rejects_missing_hook_and_name_collisions() {
        let mut s = Scheme::new(SchemeConfig::default());
        let err = s.add_block_by_name("ib1", |_| None).unwrap_err();
        assert!(matches!(err, SchemeError::MissingHook(_)));
        assert!(s.get_blocks().is_empty());

        s.add_block("vb1", hook(&[], &["out"])).unwrap();
        assert_eq!(s.get_blocks(), vec!["vb1"]);

        let collision = s.add_block("vb1", hook(&[], &["out"])).unwrap_err();
        assert!(matches!(collision, SchemeError::NameCollision(_)));

        s.add_block("vb2", hook(&[], &["out"])).unwrap();
        assert_eq!(s.get_blocks(), vec!["vb1", "vb2"]);
    }

    #[test]
    fn group_queries_on_nonexistent_group() {
        let mut s = Scheme::new(SchemeConfig::default());
        assert!(!s.has_group("fail"));
        assert!(s.get_group_members("fail").is_err());

        s.add_group("").unwrap();
        s.add_group("win").unwrap();
        s.add_group("win").unwrap(); // idempotent
    }

    #[test]
    fn nested_groups_expand_skipping_empty_and_self_referential_members() {
        let mut s = Scheme::new(SchemeConfig::default());
        s.add_block("vb1", hook(&[], &["out"])).unwrap();
        s.add_block("vb2", hook(&[], &["out"])).unwrap();
        s.add_block("vb3", hook(&[], &["out"])).unwrap();

        s.set_group("win1", &["vb1"]).unwrap();
        s.set_group("win2", &["vb2"]).unwrap();
        s.set_group("win3", &["vb3"]).unwrap();
        s.add_group("win4").unwrap();
        s.set_group("win123", &["win1", "win2", "win3", "win4", "win123"])
            .unwrap();

        let members = s.get_group_members("win123").unwrap();
        assert_eq!(members.len(), 3);
        for name in ["vb1", "vb2", "vb3"] {
            assert!(members.contains(name));
        }
    }

    #[test]
    fn exclusive_sink_conflict_resolved_by_force() {
        let mut s = Scheme::new(SchemeConfig::default());
        s.add_block("a", hook(&[], &["out"])).unwrap();
        s.add_block("b", hook(&[], &["out"])).unwrap();
        s.add_block("c", hook(&["in"], &[])).unwrap();

        s.connect("a", "out", "c", "in").unwrap();
        s.connect("b", "out", "c", "in").unwrap();
        // mark c's sink port exclusive directly through the hook, the
        // way a caller would configure a block before wiring it
        {
            let id = s.resolve_block("c").unwrap();
            s.graph
                .block_mut(id)
                .unwrap()
                .hook
                .set_input_exclusivity(&"in".into(), Exclusivity::Exclusive);
        }
        s.rcg.recompute(&s.graph);

        assert!(s.enable_block("a", false).unwrap());
        let err = s.enable_block("b", false).unwrap_err();
        assert!(matches!(err, SchemeError::Conflict(_)));
        assert_eq!(s.graph.block(s.resolve_block("a").unwrap()).unwrap().hook.state(), BlockState::Running);

        assert!(s.enable_block("b", true).unwrap());
        assert_eq!(
            s.graph.block(s.resolve_block("a").unwrap()).unwrap().hook.state(),
            BlockState::Configured
        );
    }

    #[test]
    fn latching_a_cycle_makes_it_executable() {
        let mut s = Scheme::new(SchemeConfig::default());
        let a = s.add_block("a", hook(&["in"], &["out"])).unwrap();
        let b = s.add_block("b", hook(&["in"], &["out"])).unwrap();
        s.connect("a", "out", "b", "in").unwrap();
        s.connect("b", "out", "a", "in").unwrap();
        assert!(!s.executable());

        assert!(s.latch_connection("b", "a", true).unwrap());
        assert!(s.executable());
        assert_eq!(s.order, vec![a, b]);
    }

    #[test]
    fn unlatching_a_connection_that_would_recreate_a_cycle_is_rejected() {
        let mut s = Scheme::new(SchemeConfig::default());
        s.add_block("a", hook(&["in"], &["out"])).unwrap();
        s.add_block("b", hook(&["in"], &["out"])).unwrap();
        s.connect("a", "out", "b", "in").unwrap();
        s.connect("b", "out", "a", "in").unwrap();
        s.latch_connection("b", "a", true).unwrap();
        assert!(s.executable());

        let err = s.latch_connection("b", "a", false).unwrap_err();
        assert!(matches!(err, SchemeError::CyclicSchedule(_)));
        // rolled back: still executable, the edge is still latched
        assert!(s.executable());
    }

    #[test]
    fn switch_blocks_uses_non_short_circuiting_and() {
        let mut s = Scheme::new(SchemeConfig::default());
        s.add_block("a", hook(&[], &[])).unwrap();
        let mut failing = StubHook::new(&[], &[]);
        failing.fail_stop = true;
        s.add_block("b", Box::new(failing)).unwrap();

        s.enable_block("a", false).unwrap();
        s.enable_block("b", false).unwrap();
        let result = s
            .switch_blocks(&["b".to_string()], &["a".to_string()], false, false)
            .unwrap();
        // disabling "b" fails to stop(), but "a" must still have been
        // re-enabled because disable/enable never short-circuit.
        assert!(!result);
        assert_eq!(
            s.graph.block(s.resolve_block("a").unwrap()).unwrap().hook.state(),
            BlockState::Running
        );
    }

    #[test]
    fn update_runs_in_esg_order_and_reports_failures() {
        let mut s = Scheme::new(SchemeConfig::default());
        s.add_block("a", hook(&[], &["out"])).unwrap();
        s.add_block("b", hook(&["in"], &[])).unwrap();
        s.connect("a", "out", "b", "in").unwrap();
        s.enable_block("a", false).unwrap();
        s.enable_block("b", false).unwrap();

        let report = s.update(1.0);
        assert!(report.all_succeeded());
    }
}
