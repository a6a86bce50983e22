//! Named LED groups and positional writes into the LED buffer

use log::warn;
use std::collections::{BTreeMap, HashMap};

use led_sens_types::GroupSpec;

use crate::error::{RenderError, Result};
use crate::frame::LedBuffer;

/// Value written to a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupValue<'a> {
    /// Same state for every LED of the group
    Bit(bool),
    /// One state per LED, in the group's index order
    Bits(&'a [bool]),
}

/// Group name to physical indices, validated against the LED count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedGroupRegistry {
    led_count: usize,
    groups: HashMap<String, Vec<usize>>,
}

impl LedGroupRegistry {
    /// Build the registry from layout group specs.
    ///
    /// Groups referencing an index outside `0..led_count` are dropped with a
    /// warning. Fallbacks are bound once here: a missing group name takes the
    /// indices of its first defined alternative.
    pub fn build(
        led_count: usize,
        specs: &BTreeMap<String, GroupSpec>,
        fallbacks: &BTreeMap<String, Vec<String>>,
    ) -> Self {
        let mut groups = HashMap::with_capacity(specs.len() + fallbacks.len());

        for (name, spec) in specs {
            let indices = spec.indices();
            if let Some(bad) = indices.iter().find(|i| **i >= led_count) {
                warn!(
                    "Group '{}' references LED {} but the layout has {} LEDs, ignoring group",
                    name, bad, led_count
                );
                continue;
            }
            groups.insert(name.clone(), indices);
        }

        for (name, alternatives) in fallbacks {
            if groups.contains_key(name) {
                continue;
            }
            match alternatives.iter().find_map(|alt| groups.get(alt).map(|idx| (alt, idx.clone()))) {
                Some((alt, indices)) => {
                    log::debug!("Group '{}' bound to fallback '{}'", name, alt);
                    groups.insert(name.clone(), indices);
                }
                None => warn!("Group '{}' has no defined fallback among {:?}", name, alternatives),
            }
        }

        Self { led_count, groups }
    }

    /// Registry from explicit index lists, mainly for tests
    pub fn from_groups<I, S>(led_count: usize, groups: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<usize>)>,
        S: Into<String>,
    {
        let specs = groups
            .into_iter()
            .map(|(name, indices)| (name.into(), GroupSpec::List(indices)))
            .collect();
        Self::build(led_count, &specs, &BTreeMap::new())
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Physical indices of a group in visual order
    pub fn resolve(&self, name: &str) -> Option<&[usize]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Write `value` into the group, `value[i]` going to `indices[i]`.
    ///
    /// Unknown groups are a `Lookup` error and a length mismatch is a
    /// `Config` error; the buffer is untouched in both cases.
    pub fn set(&self, buffer: &mut LedBuffer, name: &str, value: GroupValue<'_>) -> Result<()> {
        let indices = self
            .resolve(name)
            .ok_or_else(|| RenderError::lookup(format!("unknown LED group '{}'", name)))?;

        match value {
            GroupValue::Bit(lit) => {
                for index in indices {
                    buffer.set(*index, lit);
                }
            }
            GroupValue::Bits(bits) => {
                if bits.len() != indices.len() {
                    return Err(RenderError::config(format!(
                        "group '{}' has {} LEDs but {} values were written",
                        name,
                        indices.len(),
                        bits.len()
                    )));
                }
                for (index, lit) in indices.iter().zip(bits) {
                    buffer.set(*index, *lit);
                }
            }
        }
        Ok(())
    }
}

/// LED count implied by the highest index of any group
pub fn derived_led_count(specs: &BTreeMap<String, GroupSpec>) -> usize {
    specs
        .values()
        .flat_map(|spec| spec.indices())
        .max()
        .map_or(0, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use led_sens_types::{RangeKind, RangeSpec};

    fn specs() -> BTreeMap<String, GroupSpec> {
        let mut specs = BTreeMap::new();
        specs.insert("led".to_string(), GroupSpec::Index(3));
        specs.insert("pair".to_string(), GroupSpec::List(vec![5, 0]));
        specs.insert(
            "rev".to_string(),
            GroupSpec::Range(RangeSpec {
                kind: RangeKind::Reversed,
                start: 9,
                stop: 6,
            }),
        );
        specs
    }

    #[test]
    fn test_resolve_preserves_order() {
        let registry = LedGroupRegistry::build(10, &specs(), &BTreeMap::new());
        assert_eq!(registry.resolve("led"), Some(&[3][..]));
        assert_eq!(registry.resolve("pair"), Some(&[5, 0][..]));
        assert_eq!(registry.resolve("rev"), Some(&[9, 8, 7][..]));
        assert_eq!(registry.resolve("missing"), None);
    }

    #[test]
    fn test_out_of_range_group_rejected() {
        let registry = LedGroupRegistry::build(8, &specs(), &BTreeMap::new());
        assert!(registry.contains("pair"));
        assert!(!registry.contains("rev"));
    }

    #[test]
    fn test_positional_and_broadcast_writes() {
        let registry = LedGroupRegistry::build(10, &specs(), &BTreeMap::new());
        let mut buffer = LedBuffer::new(10);

        registry
            .set(&mut buffer, "rev", GroupValue::Bits(&[true, false, true]))
            .unwrap();
        assert!(buffer.get(9));
        assert!(!buffer.get(8));
        assert!(buffer.get(7));

        registry.set(&mut buffer, "pair", GroupValue::Bit(true)).unwrap();
        assert!(buffer.get(5) && buffer.get(0));
        assert_eq!(buffer.lit_count(), 4);
    }

    #[test]
    fn test_bad_writes_leave_buffer_untouched() {
        let registry = LedGroupRegistry::build(10, &specs(), &BTreeMap::new());
        let mut buffer = LedBuffer::new(10);

        assert!(matches!(
            registry.set(&mut buffer, "nope", GroupValue::Bit(true)),
            Err(RenderError::Lookup(_))
        ));
        assert!(matches!(
            registry.set(&mut buffer, "pair", GroupValue::Bits(&[true])),
            Err(RenderError::Config(_))
        ));
        assert_eq!(buffer.lit_count(), 0);
    }

    #[test]
    fn test_fallbacks_resolved_at_build() {
        let mut fallbacks = BTreeMap::new();
        fallbacks.insert(
            "cpu_usage".to_string(),
            vec!["usage".to_string(), "pair".to_string()],
        );
        fallbacks.insert("led".to_string(), vec!["pair".to_string()]);
        let registry = LedGroupRegistry::build(10, &specs(), &fallbacks);

        assert_eq!(registry.resolve("cpu_usage"), Some(&[5, 0][..]));
        // defined groups are never overridden
        assert_eq!(registry.resolve("led"), Some(&[3][..]));
    }

    #[test]
    fn test_derived_led_count() {
        assert_eq!(derived_led_count(&specs()), 10);
        assert_eq!(derived_led_count(&BTreeMap::new()), 0);
    }
}
