/// One inbound task as received off the wire: the 3-part frame set
/// `[task_id, container_id, payload]` resolved into a value.
///
/// Owned exclusively by the runtime for a single loop iteration and
/// dropped after the matching result is sent. The payload is opaque
/// here; only the codec interprets it.
#[derive(Debug, Clone)]
pub struct TaskEnvelope {
    task_id: String,
    container_id: String,
    payload: Vec<u8>,
}

impl TaskEnvelope {
    pub fn new(
        task_id: impl Into<String>,
        container_id: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            container_id: container_id.into(),
            payload,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
