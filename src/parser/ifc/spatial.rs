//! Level assignment from the spatial tree.

use std::collections::HashMap;

use super::engine::SpatialNode;
use super::schema::STOREY;

/// Element id to level name, plus how many storeys the tree holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreyMap {
    pub levels: HashMap<u64, String>,
    pub storey_count: usize,
}

impl StoreyMap {
    #[must_use]
    pub fn level_of(&self, express_id: u64) -> Option<&str> {
        self.levels.get(&express_id).map(String::as_str)
    }
}

/// Walks the tree in pre-order. A storey becomes the level of itself and
/// every descendant until a nested storey takes over.
#[must_use]
pub fn assign_storeys(root: &SpatialNode) -> StoreyMap {
    let mut map = StoreyMap::default();
    let mut stack: Vec<(&SpatialNode, Option<String>)> = vec![(root, None)];

    while let Some((node, inherited)) = stack.pop() {
        let current = if node.type_code == STOREY {
            map.storey_count += 1;
            Some(
                node.name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("Storey-{}", node.express_id)),
            )
        } else {
            inherited
        };

        if let Some(level) = &current {
            map.levels.insert(node.express_id, level.clone());
        }

        // Reverse so children pop in document order.
        for child in node.children.iter().rev() {
            stack.push((child, current.clone()));
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64, code: &str, name: Option<&str>, children: Vec<SpatialNode>) -> SpatialNode {
        SpatialNode {
            express_id: id,
            type_code: code.to_string(),
            name: name.map(str::to_string),
            children,
        }
    }

    #[test]
    fn storey_name_reaches_grandchildren() {
        let tree = node(
            1,
            "IFCPROJECT",
            None,
            vec![node(
                2,
                "IFCBUILDING",
                None,
                vec![node(
                    3,
                    STOREY,
                    Some("Level 1"),
                    vec![node(
                        4,
                        "IFCSTAIR",
                        None,
                        vec![node(5, "IFCSTAIRFLIGHT", None, vec![])],
                    )],
                )],
            )],
        );
        let map = assign_storeys(&tree);
        assert_eq!(map.level_of(4), Some("Level 1"));
        assert_eq!(map.level_of(5), Some("Level 1"));
        assert_eq!(map.level_of(2), None);
        assert_eq!(map.storey_count, 1);
    }

    #[test]
    fn nested_storey_overrides_only_its_subtree() {
        let tree = node(
            10,
            STOREY,
            Some("Ground"),
            vec![
                node(11, STOREY, None, vec![node(12, "IFCWALL", None, vec![])]),
                node(13, "IFCSLAB", None, vec![]),
            ],
        );
        let map = assign_storeys(&tree);
        assert_eq!(map.level_of(12), Some("Storey-11"));
        assert_eq!(map.level_of(13), Some("Ground"));
        assert_eq!(map.storey_count, 2);
    }
}
