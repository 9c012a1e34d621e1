use glam::Mat4;
use placement::{ObjectId, SceneGraph};
use std::collections::BTreeSet;

/// Scene graph stand-in that only tracks membership
#[derive(Debug, Default)]
pub struct LoggingScene {
    nodes: BTreeSet<ObjectId>,
}

impl LoggingScene {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}

impl SceneGraph for LoggingScene {
    fn attach(&mut self, object: ObjectId, transform: Mat4) {
        tracing::info!(object = %object, position = ?transform.w_axis.truncate(), "attached to scene");
        self.nodes.insert(object);
    }

    fn detach(&mut self, object: ObjectId) {
        tracing::info!(object = %object, "detached from scene");
        self.nodes.remove(&object);
    }
}
