use select::node::Node;
use select::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recursive, serializable description of where an element lives in the page.
///
/// Rendered to a CSS selector for the WebDriver backend and matched directly
/// against parsed nodes for the snapshot backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "spec")]
pub enum Locator {
    /// Matches an HTML tag name (e.g., "td", "a")
    Tag(String),

    /// Matches a CSS class (e.g., "bookalike")
    Class(String),

    /// Matches an HTML ID (e.g., "infiniteStatus")
    Id(String),

    /// Matches if ALL sub-locators match the same node
    And(Vec<Locator>),

    /// .ancestor .descendant
    Descendant {
        ancestor: Box<Locator>,
        descendant: Box<Locator>,
    },

    /// .parent > .child
    Child {
        parent: Box<Locator>,
        child: Box<Locator>,
    },
}

impl Locator {
    pub fn tag(name: &str) -> Self {
        Locator::Tag(name.to_string())
    }

    pub fn class(name: &str) -> Self {
        Locator::Class(name.to_string())
    }

    pub fn id(name: &str) -> Self {
        Locator::Id(name.to_string())
    }

    /// `tag.class1.class2...`
    pub fn tag_with_classes(tag: &str, classes: &[&str]) -> Self {
        let mut parts = vec![Locator::tag(tag)];
        parts.extend(classes.iter().map(|c| Locator::class(c)));
        Locator::And(parts)
    }

    pub fn descendant(self, descendant: Locator) -> Self {
        Locator::Descendant {
            ancestor: Box::new(self),
            descendant: Box::new(descendant),
        }
    }

    pub fn child(self, child: Locator) -> Self {
        Locator::Child {
            parent: Box::new(self),
            child: Box::new(child),
        }
    }

    /// Converts the structured locator into a standard CSS selector string.
    pub fn to_css_string(&self) -> String {
        match self {
            Locator::Tag(tag) => tag.clone(),
            Locator::Class(cls) => format!(".{}", cls),
            Locator::Id(id) => format!("#{}", id),
            Locator::And(locators) => locators
                .iter()
                .map(|l| l.to_css_string())
                .collect::<Vec<_>>()
                .join(""),
            Locator::Descendant {
                ancestor,
                descendant,
            } => {
                format!(
                    "{} {}",
                    ancestor.to_css_string(),
                    descendant.to_css_string()
                )
            }
            Locator::Child { parent, child } => {
                format!("{} > {}", parent.to_css_string(), child.to_css_string())
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_string())
    }
}

impl Locator {
    /// Matches `node`, looking at ancestors only up to and including `scope`.
    ///
    /// With `scope` unset every ancestor up to the document root is eligible.
    pub fn matches_within(&self, node: &Node, scope: Option<usize>) -> bool {
        match self {
            Locator::Tag(tag) => node.name() == Some(tag),
            Locator::Class(cls) => node
                .attr("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == cls)),
            Locator::Id(id) => node.attr("id") == Some(id),
            Locator::And(locators) => locators.iter().all(|l| l.matches_within(node, scope)),
            Locator::Descendant {
                ancestor,
                descendant,
            } => {
                if !descendant.matches_within(node, scope) {
                    return false;
                }
                let mut current = scoped_parent(node, scope);
                while let Some(parent) = current {
                    if ancestor.matches_within(&parent, scope) {
                        return true;
                    }
                    current = scoped_parent(&parent, scope);
                }
                false
            }
            Locator::Child { parent, child } => {
                child.matches_within(node, scope)
                    && scoped_parent(node, scope).is_some_and(|p| parent.matches_within(&p, scope))
            }
        }
    }

    /// Predicate for searches below `root` that never match through
    /// ancestors outside it.
    pub fn within(&self, root: &Node) -> Scoped<'_> {
        Scoped {
            locator: self,
            root: root.index(),
        }
    }
}

fn scoped_parent<'a>(node: &Node<'a>, scope: Option<usize>) -> Option<Node<'a>> {
    if scope == Some(node.index()) {
        return None;
    }
    node.parent()
}

/// A locator bound to the subtree of one node.
#[derive(Debug, Clone, Copy)]
pub struct Scoped<'a> {
    locator: &'a Locator,
    root: usize,
}

impl Predicate for Scoped<'_> {
    fn matches(&self, node: &Node) -> bool {
        self.locator.matches_within(node, Some(self.root))
    }
}

impl Predicate for Locator {
    fn matches(&self, node: &Node) -> bool {
        self.matches_within(node, None)
    }
}

impl Predicate for &Locator {
    fn matches(&self, node: &Node) -> bool {
        (*self).matches_within(node, None)
    }
}
