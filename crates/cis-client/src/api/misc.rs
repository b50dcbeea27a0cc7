use chrono::NaiveDateTime;

use super::BaseApi;
use crate::ids;

#[derive(Clone)]
pub struct MiscApi {
    base: BaseApi,
}

impl MiscApi {
    pub(crate) fn new(base: BaseApi) -> Self {
        Self { base }
    }

    /// A fresh `orderNO` for this vending client.
    pub fn generate_order_no(&self) -> String {
        ids::order_no(self.base.app_id())
    }

    pub fn generate_order_no_at(&self, now: NaiveDateTime) -> String {
        ids::order_no_at(now, self.base.app_id(), &mut rand::thread_rng())
    }
}
