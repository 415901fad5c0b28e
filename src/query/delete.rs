/// A delete the user has asked for but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    id: String,
}

impl DeleteRequest {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn confirm(self) -> ConfirmedDelete {
        ConfirmedDelete { id: self.id }
    }
}

/// Proof of confirmation; the only thing a resource delete accepts.
#[derive(Debug, PartialEq, Eq)]
pub struct ConfirmedDelete {
    id: String,
}

impl ConfirmedDelete {
    pub fn id(&self) -> &str {
        &self.id
    }
}
