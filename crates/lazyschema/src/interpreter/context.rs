//! Evaluation stack for tracking state during recursive evaluation.

use std::collections::BTreeSet;

use crate::interpreter::EvalError;
use crate::types::Path;

/// One expression currently being evaluated.
#[derive(Debug)]
pub(crate) struct Frame {
    /// Concrete path of the expression key.
    pub path: Path,
    /// Logical paths read so far, including those of nested expressions.
    pub deps: BTreeSet<Path>,
    /// Cleared when the error hook substitutes a value anywhere below.
    pub cacheable: bool,
}

/// Stack of in-flight evaluations for one top-level `get`.
///
/// The stack tracks:
/// - Paths under evaluation, for cycle detection
/// - Depth, bounded by the configured maximum
/// - The dependency set each frame accumulates as it reads the document
///
/// Nested references share the stack of the call that started the chain.
#[derive(Debug)]
pub(crate) struct EvalStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl EvalStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    /// Check if a path is already being evaluated.
    pub fn contains(&self, path: &Path) -> bool {
        self.frames.iter().any(|frame| &frame.path == path)
    }

    /// Enter the evaluation of `path`.
    ///
    /// Fails if `path` is already on the stack or if entering it would
    /// exceed the depth limit.
    pub fn push(&mut self, path: &Path) -> Result<(), EvalError> {
        if self.contains(path) {
            let mut chain: Vec<String> = self
                .frames
                .iter()
                .skip_while(|frame| &frame.path != path)
                .map(|frame| frame.path.to_string())
                .collect();
            chain.push(path.to_string());
            return Err(EvalError::CycleDetected { chain });
        }
        if self.frames.len() >= self.max_depth {
            return Err(EvalError::DepthExceeded {
                limit: self.max_depth,
                path: path.to_string(),
            });
        }
        let mut deps = BTreeSet::new();
        deps.insert(path.logical());
        self.frames.push(Frame {
            path: path.clone(),
            deps,
            cacheable: true,
        });
        Ok(())
    }

    /// Leave the innermost evaluation, folding what it read into its parent.
    pub fn pop(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        if let Some(parent) = self.frames.last_mut() {
            parent.deps.extend(frame.deps.iter().cloned());
            parent.cacheable &= frame.cacheable;
        }
        Some(frame)
    }

    /// Record that the innermost evaluation read `path`.
    pub fn record(&mut self, path: Path) {
        if let Some(frame) = self.frames.last_mut() {
            frame.deps.insert(path);
        }
    }

    /// Record a cached result's dependencies as read by the innermost frame.
    pub fn absorb<'a>(&mut self, deps: impl IntoIterator<Item = &'a Path>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.deps.extend(deps.into_iter().cloned());
        }
    }

    /// Mark every in-flight evaluation as not cacheable.
    pub fn taint(&mut self) {
        for frame in &mut self.frames {
            frame.cacheable = false;
        }
    }

    /// Get current evaluation depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Paths currently being evaluated, outermost first.
    pub fn chain(&self) -> Vec<String> {
        self.frames.iter().map(|f| f.path.to_string()).collect()
    }
}
