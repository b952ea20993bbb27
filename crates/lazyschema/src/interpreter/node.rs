//! Property-style access to one mapping of a [`Tree`].

use serde_json::Value;

use crate::interpreter::tree::{Tree, absolute, absolute_for_write};
use crate::interpreter::{EvalError, GetOptions, SetError};
use crate::types::Path;

/// A [`Tree`] bound to one path.
///
/// Every path a node accepts is relative to the node and may climb out of it
/// with `^`. Reads and writes go through the same tree, so a value set
/// through one node is visible through every other.
///
/// # Example
///
/// ```
/// use lazyschema::{Field, Tree};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let tree = Tree::from_json(json!({
///     "user": { "name": "Ada", ".greet": "Hi ${name}" }
/// }))
/// .unwrap();
/// let user = tree.node("user").unwrap();
///
/// assert_eq!(user.field("name"), Field::Value(json!("Ada")));
/// assert_eq!(user.field("greet"), Field::Unset);
/// assert_eq!(user.get("greet").await.unwrap(), Some(json!("Hi Ada")));
/// assert_eq!(user.field("greet"), Field::Value(json!("Hi Ada")));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Node {
    tree: Tree,
    path: Path,
}

/// The state of one property as seen through a [`Node`].
#[derive(Debug, Clone)]
pub enum Field {
    /// A static value, or an expression result that is already memoized.
    Value(Value),
    /// A nested mapping.
    Node(Node),
    /// An expression not evaluated under the current context yet.
    Unset,
    Absent,
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Value(a), Field::Value(b)) => a == b,
            (Field::Node(a), Field::Node(b)) => a.path == b.path,
            (Field::Unset, Field::Unset) | (Field::Absent, Field::Absent) => true,
            _ => false,
        }
    }
}

impl Node {
    pub(crate) fn new(tree: Tree, path: Path) -> Self {
        Self { tree, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Node bound to a path relative to this one.
    pub fn node(&self, path: &str) -> Result<Node, EvalError> {
        Ok(Node::new(self.tree.clone(), absolute(&self.path, path)?))
    }

    /// The property `name` without evaluating anything.
    ///
    /// Unknown names, including the method names `get`, `set` and friends,
    /// read as [`Field::Absent`] unless the document really holds them.
    pub fn field(&self, name: &str) -> Field {
        match absolute(&self.path, name) {
            Ok(path) => self.tree.field_at(&path),
            Err(_) => Field::Absent,
        }
    }

    pub async fn get(&self, path: &str) -> Result<Option<Value>, EvalError> {
        self.get_with(path, GetOptions::default()).await
    }

    pub async fn get_with(
        &self,
        path: &str,
        options: GetOptions,
    ) -> Result<Option<Value>, EvalError> {
        let path = absolute(&self.path, path)?;
        self.tree.get_at(path, options).await
    }

    /// Evaluate the whole mapping this node is bound to.
    pub async fn value(&self) -> Result<Option<Value>, EvalError> {
        self.tree.get_at(self.path.clone(), GetOptions::default()).await
    }

    pub async fn has(&self, path: &str) -> Result<bool, EvalError> {
        let path = absolute(&self.path, path)?;
        self.tree.has_at(path).await
    }

    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), SetError> {
        let path = absolute_for_write(&self.path, path)?;
        self.tree.set_at(&path, value.into())
    }

    pub fn delete(&self, path: &str) -> Result<bool, SetError> {
        let path = absolute_for_write(&self.path, path)?;
        self.tree.delete_at(&path)
    }

    /// Empty the mapping this node is bound to.
    pub fn clear(&self) -> Result<(), SetError> {
        self.tree.clear_at(&self.path)
    }

    /// Base names of this node's mapping.
    pub fn keys(&self) -> Vec<String> {
        self.tree.keys_at(&self.path)
    }
}
