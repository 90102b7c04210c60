//! Attachment collection

mod provider;
mod static_data;

pub use provider::AttachmentProvider;
pub use static_data::StaticAttachments;
