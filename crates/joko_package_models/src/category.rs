use serde::{Deserialize, Serialize};

use crate::attributes::CommonAttributes;

/// Index of a node inside its [`CategoryTree`]. Stable for the lifetime of the tree.
pub type CategoryId = usize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// lowercase, unique among siblings
    pub relative_category_name: String,
    pub display_name: String,
    /// Only what was authored on this category, ancestors are merged on lookup.
    pub props: CommonAttributes,
    pub enabled: bool,
    pub parent: Option<CategoryId>,
    pub children: Vec<CategoryId>,
}

/// Category hierarchy of one pack stored as an arena.
/// Nodes are never removed, the whole tree is rebuilt on reload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryTree {
    nodes: Vec<Category>,
    roots: Vec<CategoryId>,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').map(str::trim).filter(|s| !s.is_empty())
}

impl CategoryTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(id)
    }
    pub fn get_mut(&mut self, id: CategoryId) -> Option<&mut Category> {
        self.nodes.get_mut(id)
    }

    fn siblings(&self, parent: Option<CategoryId>) -> &[CategoryId] {
        match parent {
            Some(parent) => &self.nodes[parent].children,
            None => &self.roots,
        }
    }

    fn find_child(&self, parent: Option<CategoryId>, name: &str) -> Option<CategoryId> {
        let name = name.to_lowercase();
        self.siblings(parent)
            .iter()
            .copied()
            .find(|&id| self.nodes[id].relative_category_name == name)
    }

    /// Nodes matched by the leading segments of `path`, root first.
    /// Stops at the first segment without a match.
    fn matched_chain(&self, path: &str) -> (Vec<CategoryId>, bool) {
        let mut chain = Vec::new();
        let mut parent = None;
        for segment in segments(path) {
            match self.find_child(parent, segment) {
                Some(id) => {
                    chain.push(id);
                    parent = Some(id);
                }
                None => return (chain, false),
            }
        }
        (chain, true)
    }

    /// Case insensitive lookup of a dotted path. `None` if any segment is missing.
    pub fn find(&self, path: &str) -> Option<CategoryId> {
        match self.matched_chain(path) {
            (chain, true) => chain.last().copied(),
            _ => None,
        }
    }

    /// Like [`Self::find`] but creates the missing nodes.
    /// A created node takes the segment as its name and display name and is enabled.
    /// Returns `None` only for a path without any segment.
    pub fn find_or_create(&mut self, path: &str) -> Option<CategoryId> {
        let mut parent = None;
        for segment in segments(path) {
            let id = match self.find_child(parent, segment) {
                Some(id) => id,
                None => self.insert(parent, segment),
            };
            parent = Some(id);
        }
        parent
    }

    /// Returns the child of `parent` named `name` and whether it had to be created.
    pub fn find_or_create_child(
        &mut self,
        parent: Option<CategoryId>,
        name: &str,
    ) -> (CategoryId, bool) {
        match self.find_child(parent, name) {
            Some(id) => (id, false),
            None => (self.insert(parent, name), true),
        }
    }

    fn insert(&mut self, parent: Option<CategoryId>, segment: &str) -> CategoryId {
        let id = self.nodes.len();
        self.nodes.push(Category {
            relative_category_name: segment.to_lowercase(),
            display_name: segment.to_string(),
            props: CommonAttributes::default(),
            enabled: true,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// False as soon as a matched node along the path is disabled.
    /// Segments that do not exist in the tree are considered enabled.
    pub fn is_enabled(&self, path: &str) -> bool {
        let (chain, _) = self.matched_chain(path);
        chain.iter().all(|&id| self.nodes[id].enabled)
    }

    /// Returns false when the path is unknown.
    pub fn set_enabled(&mut self, path: &str, enabled: bool) -> bool {
        match self.find(path) {
            Some(id) => {
                self.nodes[id].enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Effective attributes of `path`: the deepest matched node wins, each ancestor fills what is still unset.
    pub fn resolve(&self, path: &str) -> CommonAttributes {
        let (chain, _) = self.matched_chain(path);
        let mut attrs = CommonAttributes::default();
        for &id in chain.iter().rev() {
            attrs.inherit_if_attr_none(&self.nodes[id].props);
        }
        attrs
    }

    /// Effective attributes of an existing node, ancestors included.
    pub fn resolve_id(&self, id: CategoryId) -> CommonAttributes {
        let mut attrs = CommonAttributes::default();
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            attrs.inherit_if_attr_none(&node.props);
            current = node.parent;
        }
        attrs
    }

    pub fn full_category_name(&self, id: CategoryId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(id) = current {
            let Some(node) = self.nodes.get(id) else {
                break;
            };
            names.push(node.relative_category_name.as_str());
            current = node.parent;
        }
        names.reverse();
        names.join(".")
    }

    /// Depth first walk yielding `(full dotted name, node)`, parents before children.
    pub fn walk(&self) -> Vec<(String, &Category)> {
        let mut result = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(String, CategoryId)> = self
            .roots
            .iter()
            .rev()
            .map(|&id| (self.nodes[id].relative_category_name.clone(), id))
            .collect();
        while let Some((name, id)) = stack.pop() {
            let node = &self.nodes[id];
            for &child in node.children.iter().rev() {
                stack.push((
                    format!("{}.{}", name, self.nodes[child].relative_category_name),
                    child,
                ));
            }
            result.push((name, node));
        }
        result
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::{fixture, rstest};
    use similar_asserts::assert_eq;

    #[fixture]
    fn tree() -> CategoryTree {
        let mut tree = CategoryTree::default();
        let a = tree.find_or_create("a").unwrap();
        tree.get_mut(a).unwrap().props.set_icon_size(Some(3.0));
        tree.get_mut(a).unwrap().props.set_alpha(Some(0.2));
        let b = tree.find_or_create("a.b").unwrap();
        tree.get_mut(b).unwrap().props.set_fade_far(Some(100.0));
        tree.get_mut(b).unwrap().props.set_alpha(Some(0.5));
        let c = tree.find_or_create("a.b.c").unwrap();
        tree.get_mut(c).unwrap().props.set_height_offset(Some(4.0));
        tree
    }

    #[rstest]
    fn find_is_case_insensitive(tree: CategoryTree) {
        assert_eq!(tree.find("A.B.c"), tree.find("a.b.c"));
        assert!(tree.find("a.b.c").is_some());
        assert_eq!(tree.find("a.x"), None);
        assert_eq!(tree.find(""), None);
    }

    #[rstest]
    fn find_or_create_reuses_and_creates(mut tree: CategoryTree) {
        let before = tree.len();
        let existing = tree.find("a.b").unwrap();
        assert_eq!(tree.find_or_create("A.b"), Some(existing));
        assert_eq!(tree.len(), before);

        let created = tree.find_or_create("a.b.NewLeaf").unwrap();
        assert_eq!(tree.len(), before + 1);
        let node = tree.get(created).unwrap();
        assert_eq!(node.relative_category_name, "newleaf");
        assert_eq!(node.display_name, "NewLeaf");
        assert_eq!(tree.full_category_name(created), "a.b.newleaf");
    }

    #[rstest]
    fn resolve_takes_closest_ancestor(tree: CategoryTree) {
        let attrs = tree.resolve("a.b.c");
        assert_eq!(attrs.icon_size(), 3.0);
        assert_eq!(attrs.fade_far(), 100.0);
        assert_eq!(attrs.alpha(), 0.5);
        assert_eq!(attrs.height_offset(), 4.0);
        let c = tree.find("a.b.c").unwrap();
        assert_eq!(tree.resolve_id(c), attrs);
    }

    #[rstest]
    fn enabled_state(mut tree: CategoryTree) {
        assert!(tree.is_enabled("a.b.c"));
        assert!(tree.is_enabled("unknown.path"));
        assert!(tree.set_enabled("a.b", false));
        assert!(!tree.is_enabled("a.b.c"));
        assert!(!tree.is_enabled("a.b"));
        assert!(tree.is_enabled("a"));
        // a disabled known ancestor still hides unknown children
        assert!(!tree.is_enabled("a.b.unknown"));
        assert!(!tree.set_enabled("nope", false));
    }

    #[rstest]
    fn walk_lists_parents_first(tree: CategoryTree) {
        let names: Vec<String> = tree.walk().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "a.b", "a.b.c"]);
    }
}
