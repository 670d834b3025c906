//! Array-input slot maintenance: a pure helper shared by the (external)
//! editor and the Input Resolver. Array ports always expose exactly one
//! trailing empty slot; see the array invariant in the testable
//! properties.

use crate::schema::{HandleRemap, PortDefinition, WorkflowEdge};

fn slot_name(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Replace every `array=true` port with its first slot, `name[0]`.
pub fn expand(inputs: &[PortDefinition]) -> Vec<PortDefinition> {
    inputs
        .iter()
        .map(|port| {
            if !port.array {
                return port.clone();
            }
            let mut slot = port.clone();
            slot.name = slot_name(&port.name, 0);
            slot.array = false;
            slot.array_parent = Some(port.name.clone());
            slot.array_index = Some(0);
            slot
        })
        .collect()
}

/// If the handle just connected is the highest-index slot of its array,
/// append a fresh empty trailing slot.
pub fn on_connect(inputs: &[PortDefinition], connected_handle: &str) -> Vec<PortDefinition> {
    let Some(connected) = inputs.iter().find(|p| p.name == connected_handle) else {
        return inputs.to_vec();
    };
    let Some(parent) = connected.array_parent.clone() else {
        return inputs.to_vec();
    };
    let highest = inputs
        .iter()
        .filter(|p| p.array_parent.as_deref() == Some(parent.as_str()))
        .filter_map(|p| p.array_index)
        .max()
        .unwrap_or(0);
    let connected_index = connected.array_index.unwrap_or(0);
    if connected_index != highest {
        return inputs.to_vec();
    }

    let mut next = inputs.to_vec();
    let mut new_slot = connected.clone();
    new_slot.name = slot_name(&parent, highest + 1);
    new_slot.array_index = Some(highest + 1);
    next.push(new_slot);
    next
}

/// Renumber connected slots of every array port contiguously from 0,
/// preserving order, append exactly one trailing empty slot, and return a
/// map of old handle id to new handle id (`input:<old>` -> `input:<new>`)
/// for the caller to apply to edges.
pub fn cleanup(inputs: &[PortDefinition], edges: &[WorkflowEdge]) -> (Vec<PortDefinition>, HandleRemap) {
    let connected_names: std::collections::HashSet<String> = edges
        .iter()
        .filter_map(|e| e.target_handle.as_deref())
        .filter_map(|h| h.strip_prefix("input:"))
        .map(|s| s.to_string())
        .collect();

    let mut result = Vec::new();
    let mut remap = HandleRemap::new();

    let mut parents: Vec<String> = inputs
        .iter()
        .filter_map(|p| p.array_parent.clone())
        .collect();
    parents.sort();
    parents.dedup();

    let non_array: Vec<PortDefinition> = inputs.iter().filter(|p| p.array_parent.is_none()).cloned().collect();
    result.extend(non_array);

    for parent in parents {
        let mut slots: Vec<&PortDefinition> = inputs
            .iter()
            .filter(|p| p.array_parent.as_deref() == Some(parent.as_str()))
            .collect();
        slots.sort_by_key(|p| p.array_index.unwrap_or(0));

        let connected: Vec<&PortDefinition> = slots
            .iter()
            .filter(|p| connected_names.contains(&p.name))
            .copied()
            .collect();

        for (new_index, old) in connected.iter().enumerate() {
            let new_name = slot_name(&parent, new_index);
            if old.name != new_name {
                remap.insert(format!("input:{}", old.name), format!("input:{new_name}"));
            }
            let mut slot = (*old).clone();
            slot.name = new_name;
            slot.array_index = Some(new_index);
            result.push(slot);
        }

        let trailing_index = connected.len();
        let template = slots.first().copied().cloned().unwrap_or_else(|| PortDefinition::new(&parent, crate::schema::ValueType::Any));
        let mut trailing = template;
        trailing.name = slot_name(&parent, trailing_index);
        trailing.array_parent = Some(parent.clone());
        trailing.array_index = Some(trailing_index);
        trailing.required = false;
        trailing.default = None;
        result.push(trailing);
    }

    (result, remap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueType;

    fn array_port(name: &str) -> PortDefinition {
        let mut p = PortDefinition::new(name, ValueType::String);
        p.array = true;
        p
    }

    fn edge_to(handle: &str) -> WorkflowEdge {
        WorkflowEdge {
            id: format!("e-{handle}"),
            source: "src".into(),
            target: "tgt".into(),
            source_handle: Some("output:value".into()),
            target_handle: Some(format!("input:{handle}")),
        }
    }

    #[test]
    fn expand_creates_single_zero_slot() {
        let expanded = expand(&[array_port("values")]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].name, "values[0]");
        assert_eq!(expanded[0].array_parent.as_deref(), Some("values"));
        assert_eq!(expanded[0].array_index, Some(0));
    }

    #[test]
    fn on_connect_appends_slot_only_when_highest_connected() {
        let expanded = expand(&[array_port("values")]);
        let after = on_connect(&expanded, "values[0]");
        assert_eq!(after.len(), 2);
        assert_eq!(after[1].name, "values[1]");

        // connecting a non-highest slot does not append again
        let after2 = on_connect(&after, "values[0]");
        assert_eq!(after2.len(), 2);
    }

    #[test]
    fn cleanup_renumbers_and_preserves_trailing_invariant() {
        let mut inputs = expand(&[array_port("values")]);
        inputs = on_connect(&inputs, "values[0]");
        inputs = on_connect(&inputs, "values[1]");
        // now slots [0,1,2]; connect 0 and 1, leave edge on 0 only after removing edge on... simulate: edges on [0] and [1]
        let edges = vec![edge_to("values[0]"), edge_to("values[1]")];
        let (after, _remap) = cleanup(&inputs, &edges);
        let parent_slots: Vec<_> = after.iter().filter(|p| p.array_parent.as_deref() == Some("values")).collect();
        let connected = parent_slots.iter().filter(|p| edges.iter().any(|e| e.target_handle == Some(format!("input:{}", p.name)))).count();
        assert_eq!(connected + 1, parent_slots.len());
    }

    #[test]
    fn cleanup_remaps_edge_after_removing_earlier_connection() {
        let mut inputs = expand(&[array_port("values")]);
        inputs = on_connect(&inputs, "values[0]");
        inputs = on_connect(&inputs, "values[1]");
        // edge originally on slot 1 only (slot 0's edge was removed)
        let edges = vec![edge_to("values[1]")];
        let (after, remap) = cleanup(&inputs, &edges);
        assert_eq!(remap.get("input:values[1]"), Some(&"input:values[0]".to_string()));
        let parent_slots: Vec<_> = after.iter().filter(|p| p.array_parent.as_deref() == Some("values")).collect();
        assert_eq!(parent_slots.len(), 2);
        assert!(parent_slots.iter().any(|p| p.name == "values[0]"));
        assert!(parent_slots.iter().any(|p| p.name == "values[1]"));
        assert!(!parent_slots.iter().any(|p| p.name == "values[2]"));
    }

    #[test]
    fn cleanup_is_idempotent() {
        let inputs = expand(&[array_port("values")]);
        let edges: Vec<WorkflowEdge> = vec![];
        let (once, _) = cleanup(&inputs, &edges);
        let (twice, _) = cleanup(&once, &edges);
        assert_eq!(once.len(), twice.len());
        assert_eq!(once[0].name, twice[0].name);
    }
}
