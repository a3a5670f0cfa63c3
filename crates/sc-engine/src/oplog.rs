use std::fmt;

use sc_core::ItemId;
use serde::Serialize;

use crate::host::ObjectHandle;

/// How a created object came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatePath {
    /// The owning module's `create_item` returned it.
    Module,
    /// Instantiated from the template's prefab.
    Prefab,
    /// Instantiated from a user asset by the built-in fallback handler.
    UserAsset,
    /// Empty placeholder standing in for an unresolved template or asset.
    Placeholder,
}

impl fmt::Display for CreatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Module => "module",
            Self::Prefab => "prefab",
            Self::UserAsset => "user asset",
            Self::Placeholder => "placeholder",
        };
        f.write_str(label)
    }
}

/// What kind of scene operation was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SceneOpKind {
    /// An object was destroyed.
    Removed {
        /// Whether a module's `remove_item` ran first.
        custom: bool,
    },
    /// An object was created.
    Created {
        /// Creation path that produced it.
        path: CreatePath,
    },
    /// An existing object was updated.
    Updated {
        /// Whether a module's `update_item` reported handling it.
        custom: bool,
    },
    /// The item could not be materialized.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

/// One applied reconciliation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneOp {
    /// Item the operation applies to.
    pub item: ItemId,
    /// Object handle involved, if any.
    pub handle: Option<ObjectHandle>,
    /// The operation.
    #[serde(flatten)]
    pub kind: SceneOpKind,
}

impl SceneOp {
    /// Create a new operation record.
    pub fn new(item: ItemId, handle: Option<ObjectHandle>, kind: SceneOpKind) -> Self {
        Self { item, handle, kind }
    }
}

/// Accumulates applied operations in order.
#[derive(Debug, Default)]
pub struct OpLog {
    ops: Vec<SceneOp>,
    max_ops: usize,
}

impl OpLog {
    /// Create a new log with the given maximum capacity (0 = unlimited).
    pub fn new(max_ops: usize) -> Self {
        Self {
            ops: Vec::new(),
            max_ops,
        }
    }

    /// Append an operation, dropping the oldest ones past capacity.
    pub fn push(&mut self, op: SceneOp) {
        self.ops.push(op);
        if self.max_ops > 0 && self.ops.len() > self.max_ops {
            let drain_count = self.ops.len() - self.max_ops;
            self.ops.drain(..drain_count);
        }
    }

    /// All recorded operations, oldest first.
    pub fn ops(&self) -> &[SceneOp] {
        &self.ops
    }

    /// Operations for one item.
    pub fn for_item(&self, item: &ItemId) -> Vec<&SceneOp> {
        self.ops.iter().filter(|op| &op.item == item).collect()
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Return `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Take the recorded operations, leaving the log empty.
    pub fn take(&mut self) -> Vec<SceneOp> {
        std::mem::take(&mut self.ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(item: &str, n: u64) -> SceneOp {
        SceneOp::new(
            item.into(),
            Some(ObjectHandle(n)),
            SceneOpKind::Created {
                path: CreatePath::Prefab,
            },
        )
    }

    #[test]
    fn op_log_push_and_query() {
        let mut log = OpLog::new(0);
        log.push(created("i1", 1));
        log.push(SceneOp::new("i2".into(), None, SceneOpKind::Skipped { reason: "no module".into() }));
        log.push(SceneOp::new("i1".into(), Some(ObjectHandle(1)), SceneOpKind::Updated { custom: false }));
        assert_eq!(log.len(), 3);
        assert_eq!(log.for_item(&"i1".into()).len(), 2);
        assert_eq!(log.for_item(&"i3".into()).len(), 0);
    }

    #[test]
    fn op_log_max_ops_trims_oldest() {
        let mut log = OpLog::new(2);
        for n in 0..5 {
            log.push(created(&format!("i{n}"), n));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.ops()[0].item.as_str(), "i3");
        assert_eq!(log.ops()[1].item.as_str(), "i4");
    }

    #[test]
    fn op_log_take_empties() {
        let mut log = OpLog::new(0);
        log.push(created("i1", 1));
        let ops = log.take();
        assert_eq!(ops.len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn op_serializes_flat() {
        let json = serde_json::to_value(created("i1", 7)).unwrap();
        assert_eq!(json["item"], "i1");
        assert_eq!(json["handle"], 7);
        assert_eq!(json["op"], "created");
        assert_eq!(json["path"], "prefab");
    }
}
