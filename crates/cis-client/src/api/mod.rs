//! Public operation groups. All three share one [`Requester`](crate::requester::Requester).

mod base;
mod misc;
mod power;
mod reconciler;

pub use misc::MiscApi;
pub use power::PowerApi;
pub use reconciler::{ReconcilerApi, UploadReceipt};

pub(crate) use base::BaseApi;
