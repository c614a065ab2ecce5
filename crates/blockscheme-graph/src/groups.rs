//! Named, possibly nested, sets of blocks used as addressing aliases.
//!
//! Grounded on `conman`'s `Scheme::getGroupMembers`/`addToGroup`/
//! `removeFromGroup`/`disbandGroup`, generalized to tolerate cyclic
//! group definitions (the original recurses unconditionally and would
//! loop forever on a cycle; this crate tracks a visited set instead).

use ahash::AHashSet;

use crate::error::SchemeError;

/// Storage for the group registry. `Scheme` owns one of these and is
/// responsible for checking block-name collisions before inserting,
/// since this type has no visibility into the block namespace.
#[derive(Default)]
pub struct GroupRegistry {
    groups: ahash::AHashMap<String, AHashSet<String>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Idempotently ensure a (possibly empty) group exists. No-op if
    /// the group is already present.
    pub fn add_group(&mut self, name: &str) {
        self.groups.entry(name.to_string()).or_default();
    }

    /// Replace a group's membership wholesale. The caller is
    /// responsible for validating that every member resolves to a
    /// known block or group name before calling this; on validation
    /// failure the group must be left untouched (`UnknownMember`).
    pub fn set_group(&mut self, name: &str, members: AHashSet<String>) {
        self.groups.insert(name.to_string(), members);
    }

    pub fn add_to_group(&mut self, name: &str, member: String) -> Option<bool> {
        let group = self.groups.get_mut(name)?;
        Some(group.insert(member))
    }

    pub fn remove_from_group(&mut self, name: &str, member: &str) -> bool {
        match self.groups.get_mut(name) {
            Some(group) => {
                group.remove(member);
                true
            }
            // Matches conman's disbandGroup/removeFromGroup: removing
            // from a group that does not exist is not an error.
            None => true,
        }
    }

    pub fn disband_group(&mut self, name: &str) {
        self.groups.remove(name);
    }

    pub fn raw_members(&self, name: &str) -> Option<&AHashSet<String>> {
        self.groups.get(name)
    }

    /// Recursively expand `name` into the set of concrete block names
    /// it denotes, per C5: a block name yields itself, a group name
    /// yields the union of its members' expansions, anything else is
    /// `UnknownName`. Already-visited group names short-circuit to an
    /// empty contribution rather than erroring, so cyclic group
    /// definitions terminate.
    pub fn expand<'a>(
        &self,
        name: &str,
        is_block: &impl Fn(&str) -> bool,
    ) -> Result<AHashSet<String>, SchemeError> {
        let mut visited = AHashSet::default();
        self.expand_inner(name, is_block, &mut visited)
    }

    fn expand_inner(
        &self,
        name: &str,
        is_block: &impl Fn(&str) -> bool,
        visited: &mut AHashSet<String>,
    ) -> Result<AHashSet<String>, SchemeError> {
        if is_block(name) {
            let mut set = AHashSet::default();
            set.insert(name.to_string());
            return Ok(set);
        }

        let Some(members) = self.groups.get(name) else {
            return Err(SchemeError::UnknownName(name.to_string()));
        };

        if !visited.insert(name.to_string()) {
            return Ok(AHashSet::default());
        }

        let mut out = AHashSet::default();
        for member in members {
            out.extend(self.expand_inner(member, is_block, visited)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_block<'a>(names: &'a [&'a str]) -> impl Fn(&str) -> bool + 'a {
        move |n| names.contains(&n)
    }

    #[test]
    fn expands_single_block() {
        let reg = GroupRegistry::new();
        let result = reg.expand("a", &is_block(&["a", "b"])).unwrap();
        assert_eq!(result, ["a".to_string()].into_iter().collect());
    }

    #[test]
    fn expands_nested_groups() {
        let mut reg = GroupRegistry::new();
        reg.set_group("inner", ["a".to_string(), "b".to_string()].into_iter().collect());
        reg.set_group("outer", ["inner".to_string(), "c".to_string()].into_iter().collect());

        let result = reg.expand("outer", &is_block(&["a", "b", "c"])).unwrap();
        assert_eq!(
            result,
            ["a", "b", "c"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn tolerates_cycles() {
        let mut reg = GroupRegistry::new();
        reg.set_group("g1", ["g2".to_string(), "a".to_string()].into_iter().collect());
        reg.set_group("g2", ["g1".to_string(), "b".to_string()].into_iter().collect());

        let result = reg.expand("g1", &is_block(&["a", "b"])).unwrap();
        assert_eq!(result, ["a", "b"].iter().map(|s| s.to_string()).collect());
    }

    #[test]
    fn unknown_name_errors() {
        let reg = GroupRegistry::new();
        assert!(matches!(
            reg.expand("nope", &is_block(&[])),
            Err(SchemeError::UnknownName(_))
        ));
    }

    #[test]
    fn empty_group_expands_to_empty_set() {
        let mut reg = GroupRegistry::new();
        reg.add_group("g");
        let result = reg.expand("g", &is_block(&[])).unwrap();
        assert!(result.is_empty());
    }
}
