use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::envelope::RequestDraft;
use crate::error::DomainError;
use crate::normalize::{normalize, Normalized, ResponseKind};
use crate::requester::Requester;

#[derive(Clone)]
pub(crate) struct BaseApi {
    requester: Arc<Requester>,
}

impl BaseApi {
    pub(crate) fn new(requester: Arc<Requester>) -> Self {
        Self { requester }
    }

    pub(crate) fn app_id(&self) -> &str {
        self.requester.app_id()
    }

    pub(crate) fn requester(&self) -> &Requester {
        &self.requester
    }

    /// One round trip for `kind`'s operation, normalized for `kind`.
    pub(crate) async fn send<T: Serialize + Sync>(
        &self,
        kind: ResponseKind,
        body: &T,
    ) -> Result<Normalized, DomainError> {
        let draft = RequestDraft::from_body(kind.operation(), body)?;
        let data: Option<Value> = self.requester.send_api_request(draft).await?;
        Ok(normalize(kind, data))
    }
}
