//! Radix tree node.
//!
//! Each node owns one path segment. Children are split by kind so lookup
//! can try them in priority order: static, then parameter, then catch-all.

use crate::method_router::MethodRouter;
use crate::params::Params;

/// Kind of path segment a node represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal segment such as `users` or `relationships`
    Static,
    /// Named parameter such as `{id}`
    Param(String),
    /// Catch-all tail such as `*path`
    Wildcard(String),
}

/// A node in the radix tree.
///
/// Nodes at the end of a registered pattern carry a [`MethodRouter`].
#[derive(Debug, Clone)]
pub struct Node<H> {
    /// Segment text as written in the pattern
    pub segment: String,

    /// Segment kind
    pub kind: SegmentKind,

    /// Handlers for routes ending at this node
    pub methods: Option<MethodRouter<H>>,

    /// Static children, sorted by segment for binary search
    pub static_children: Vec<Node<H>>,

    /// Parameter child (at most one per node)
    pub param_child: Option<Box<Node<H>>>,

    /// Catch-all child (at most one per node, always a leaf)
    pub wildcard_child: Option<Box<Node<H>>>,
}

impl<H> Node<H> {
    fn with_kind(segment: String, kind: SegmentKind) -> Self {
        Self {
            segment,
            kind,
            methods: None,
            static_children: Vec::new(),
            param_child: None,
            wildcard_child: None,
        }
    }

    /// Creates the root node.
    #[must_use]
    pub fn root() -> Self {
        Self::with_kind(String::new(), SegmentKind::Static)
    }

    /// Inserts a pattern into the tree, merging with any handlers already
    /// registered at the same node.
    pub fn insert(&mut self, pattern: &str, methods: MethodRouter<H>) {
        let parsed = Self::parse_pattern(pattern);
        self.insert_segments(&parsed, methods);
    }

    /// Parses a pattern into typed segments.
    ///
    /// A `*name` segment is only a catch-all in last position; anywhere
    /// else it is taken literally.
    fn parse_pattern(pattern: &str) -> Vec<(String, SegmentKind)> {
        let raw: Vec<&str> = crate::segments(pattern).collect();
        let last = raw.len().saturating_sub(1);
        raw.iter()
            .enumerate()
            .map(|(i, s)| {
                if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    ((*s).to_string(), SegmentKind::Param(name.to_string()))
                } else if let Some(name) = s.strip_prefix('*').filter(|_| i == last) {
                    ((*s).to_string(), SegmentKind::Wildcard(name.to_string()))
                } else {
                    ((*s).to_string(), SegmentKind::Static)
                }
            })
            .collect()
    }

    fn insert_segments(&mut self, segments: &[(String, SegmentKind)], methods: MethodRouter<H>) {
        let Some(((segment, kind), remaining)) = segments.split_first() else {
            match &mut self.methods {
                Some(existing) => existing.merge(methods),
                None => self.methods = Some(methods),
            }
            return;
        };

        match kind {
            SegmentKind::Static => {
                match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(i) => self.static_children[i].insert_segments(remaining, methods),
                    Err(i) => {
                        let mut child = Self::with_kind(segment.clone(), SegmentKind::Static);
                        child.insert_segments(remaining, methods);
                        self.static_children.insert(i, child);
                    }
                }
            }
            SegmentKind::Param(_) => {
                // The first registered parameter name owns the slot.
                self.param_child
                    .get_or_insert_with(|| Box::new(Self::with_kind(segment.clone(), kind.clone())))
                    .insert_segments(remaining, methods);
            }
            SegmentKind::Wildcard(_) => {
                self.wildcard_child
                    .get_or_insert_with(|| Box::new(Self::with_kind(segment.clone(), kind.clone())))
                    .insert_segments(&[], methods);
            }
        }
    }

    /// Matches a request path against the tree.
    ///
    /// Returns the method table of the matched node and the captured
    /// parameters.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<H>, Params)> {
        let segments: Vec<&str> = crate::segments(path).collect();
        let mut params = Params::new();
        self.match_segments(&segments, &mut params)
            .map(|methods| (methods, params))
    }

    fn match_segments<'a>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
    ) -> Option<&'a MethodRouter<H>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.methods.as_ref();
        };

        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.match_segments(remaining, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), *segment);
                if let Some(found) = child.match_segments(remaining, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        if let Some(child) = &self.wildcard_child {
            if let SegmentKind::Wildcard(name) = &child.kind {
                params.push(name.clone(), segments.join("/"));
                return child.methods.as_ref();
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Node<H>> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn get(handler: &'static str) -> MethodRouter<&'static str> {
        MethodRouter::with(&Method::GET, handler)
    }

    #[test]
    fn test_parse_pattern_kinds() {
        let parsed = Node::<()>::parse_pattern("/api/users/{id}/*rest");
        assert_eq!(parsed[0], ("api".to_string(), SegmentKind::Static));
        assert_eq!(
            parsed[2],
            ("{id}".to_string(), SegmentKind::Param("id".to_string()))
        );
        assert_eq!(
            parsed[3],
            ("*rest".to_string(), SegmentKind::Wildcard("rest".to_string()))
        );
    }

    #[test]
    fn test_star_in_middle_is_literal() {
        let parsed = Node::<()>::parse_pattern("/a/*b/c");
        assert_eq!(parsed[1], ("*b".to_string(), SegmentKind::Static));
    }

    #[test]
    fn test_static_children_stay_sorted() {
        let mut root = Node::root();
        root.insert("/users", get("users"));
        root.insert("/chocolates", get("chocolates"));
        root.insert("/orders", get("orders"));

        let names: Vec<_> = root
            .static_children
            .iter()
            .map(|c| c.segment.as_str())
            .collect();
        assert_eq!(names, vec!["chocolates", "orders", "users"]);
    }

    #[test]
    fn test_match_param() {
        let mut root = Node::root();
        root.insert("/api/users/{id}", get("findOne"));

        let (methods, params) = root.match_path("/api/users/42").expect("route");
        assert_eq!(methods.get(&Method::GET), Some(&"findOne"));
        assert_eq!(params.get("id"), Some("42"));
    }

    #[test]
    fn test_static_beats_param() {
        let mut root = Node::root();
        root.insert("/api/users/{id}", get("findOne"));
        root.insert("/api/users/me", get("me"));

        let (methods, params) = root.match_path("/api/users/me").expect("route");
        assert_eq!(methods.get(&Method::GET), Some(&"me"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_backtracking_drops_stale_params() {
        let mut root = Node::root();
        // The parameter branch dead-ends for `/x/y/z`, the wildcard catches it.
        root.insert("/x/{a}/only", get("param"));
        root.insert("/x/*rest", get("wild"));

        let (methods, params) = root.match_path("/x/y/z").expect("route");
        assert_eq!(methods.get(&Method::GET), Some(&"wild"));
        assert_eq!(params.get("a"), None);
        assert_eq!(params.get("rest"), Some("y/z"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_merge_at_same_node() {
        let mut root = Node::root();
        root.insert("/api/users", get("findAll"));
        root.insert("/api/users", MethodRouter::with(&Method::POST, "create"));

        let (methods, _) = root.match_path("/api/users").expect("route");
        assert_eq!(methods.allowed_methods(), vec![Method::GET, Method::POST]);
    }

    #[test]
    fn test_no_match() {
        let mut root = Node::root();
        root.insert("/api/users", get("findAll"));
        assert!(root.match_path("/api/chocolates").is_none());
        assert!(root.match_path("/api").is_none());
    }
}
